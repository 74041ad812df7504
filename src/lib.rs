// Domain layer: model IR, results, errors and the backend contract
pub mod domain;

// Solver adapters: concrete implementations of SolverService
pub mod solver;

// Solve orchestration: time budget, cancellation, validation
pub mod controller;

pub mod config;

// Model import (MPS)
pub mod io;

#[cfg(any(feature = "server", feature = "cli"))]
pub mod telemetry;

// Application layer: gRPC use cases
#[cfg(feature = "server")]
pub mod application;

// Infrastructure layer: External concerns (gRPC, server)
#[cfg(feature = "server")]
pub mod infrastructure;

// Re-export commonly used types
pub use config::SolveOptions;
pub use controller::{solve_model, ControllerState, SolveController};
pub use domain::{
    Bounds, ConstraintType, LinearExpr, Model, OptError, OptimizationType, Result,
    SolutionStatus, SolveResult, SolverBackend, SolverService, VariableHandle, VariableType,
};
pub use io::{parse_mps, read_mps_file};
pub use solver::{BranchAndBoundSolver, SolverFactory};

#[cfg(feature = "server")]
pub use application::GrpcModelSolverService;

#[cfg(feature = "server")]
pub use infrastructure::{start_server, ServerConfig};
