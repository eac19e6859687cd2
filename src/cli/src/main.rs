//! ca-initializer entry point.

use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use ca_init_cli::{build_config, issue, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing; RUST_LOG wins over --log-level
    let default_level = LevelFilter::from_level(cli.log_level.into());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let result = match build_config(&cli) {
        Ok(config) => issue(&config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(outcome) => tracing::info!("{}", outcome.message()),
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    }
}
