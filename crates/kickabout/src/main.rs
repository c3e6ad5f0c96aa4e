use kickabout::KickaboutServerBuilder;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr = std::env::var("KICKABOUT_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let server = KickaboutServerBuilder::new().bind(&addr).build().await?;
    tracing::info!(%addr, "listening");
    server.run().await?;
    Ok(())
}
