// Domain module: model IR, results and the backend contract

pub mod error;
pub mod expr;
pub mod extract;
pub mod models;
pub mod pretty;
pub mod solution;
pub mod solver_service;
pub mod tree;
pub mod value_objects;

pub use error::*;
pub use expr::*;
pub use extract::*;
pub use models::*;
pub use solution::*;
pub use solver_service::*;
pub use tree::*;
pub use value_objects::*;
