// Infrastructure layer: transport and process lifecycle

pub mod server;

pub use server::{start_server, start_server_with_shutdown, ServerConfig};
