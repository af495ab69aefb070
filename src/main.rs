use tracing_subscriber::{EnvFilter, fmt};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    let config = personas::config::ServiceConfig::from_env()?;
    info!(
        target: "personas",
        "personas starting: RUST_LOG='{}', http_port={}, backend={}, bucket='{}', key='{}'",
        rust_log, config.http_port, config.backend.as_str(), config.bucket, config.key
    );

    personas::server::run(config).await
}
