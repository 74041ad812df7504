// Application layer: gRPC use cases over the controller

pub mod grpc_service;
pub mod mappers;

pub use grpc_service::GrpcModelSolverService;
