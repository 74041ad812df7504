// Infrastructure: Server setup and configuration
// Single Responsibility: Manage server lifecycle and configuration

use std::future::Future;
use std::net::SocketAddr;

use tonic::transport::Server;
use tracing::info;

use crate::application::mappers::optbridge::model_solver_server::ModelSolverServer;
use crate::application::GrpcModelSolverService;
use crate::config::{AppConfig, SolveOptions};
use crate::solver::SolverFactory;

pub struct ServerConfig {
    pub address: SocketAddr,
    pub defaults: SolveOptions,
}

impl ServerConfig {
    pub fn new(address: SocketAddr, defaults: SolveOptions) -> Self {
        Self { address, defaults }
    }
}

impl From<AppConfig> for ServerConfig {
    fn from(config: AppConfig) -> Self {
        Self::new(config.server.addr, config.solve)
    }
}

/// Serve until ctrl-c
pub async fn start_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    start_server_with_shutdown(config, async {
        tokio::signal::ctrl_c().await.ok();
        info!(component = "server", "shutdown requested");
    })
    .await
}

/// Serve until `shutdown` resolves
pub async fn start_server_with_shutdown(
    config: ServerConfig,
    shutdown: impl Future<Output = ()>,
) -> Result<(), Box<dyn std::error::Error>> {
    let backends: Vec<String> = SolverFactory::available_backends()
        .iter()
        .map(ToString::to_string)
        .collect();
    info!(
        component = "server",
        address = %config.address,
        default_backend = %config.defaults.backend,
        backends = ?backends,
        "optbridge gRPC server listening"
    );

    let service = GrpcModelSolverService::new(config.defaults);
    Server::builder()
        .add_service(ModelSolverServer::new(service))
        .serve_with_shutdown(config.address, shutdown)
        .await?;

    info!(component = "server", "server stopped");
    Ok(())
}
