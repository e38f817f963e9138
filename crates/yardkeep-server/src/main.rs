//! Yardkeep Server Binary

use tracing_subscriber::EnvFilter;

use yardkeep_server::{serve, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    serve(ServerConfig::from_env()).await
}
