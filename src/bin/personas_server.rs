//!
//! personas server binary
//! -----------------------
//! Command-line entry point for the personas HTTP service. Configuration comes
//! from `PERSONAS_*` environment variables; flags given on the command line
//! override them.

use anyhow::Result;
use std::env;

use personas::config::{has_flag, ServiceConfig, USAGE};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber with env filter if provided
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    let args: Vec<String> = env::args().collect();

    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("{}", USAGE);
        return Ok(());
    }

    // CLI arguments override environment
    let config = ServiceConfig::from_env()?.apply_args(&args)?;

    println!(
        "personas starting: http={}:{}, backend={}, dataset={}",
        config.bind_addr, config.http_port, config.backend.as_str(), config.location()
    );
    tracing::info!(
        "Using port: http={}, backend={}, bucket='{}', key='{}'",
        config.http_port, config.backend.as_str(), config.bucket, config.key
    );
    personas::server::run(config).await
}
