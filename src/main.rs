use optbridge::config::AppConfig;
use optbridge::telemetry::init_tracing;
use optbridge::{start_server, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing("info");

    // Environment (and .env) configuration
    let config = AppConfig::from_env()?;

    start_server(ServerConfig::from(config)).await?;

    Ok(())
}
