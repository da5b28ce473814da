//! Punchgate — edge attendance gateway binary.

use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use punchgate_core::config::{AppConfig, LoggingConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let env = std::env::var("PUNCHGATE_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("punchgate: cannot load configuration for '{env}': {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.logging);
    info!(env = %env, version = env!("CARGO_PKG_VERSION"), "Starting punchgate");
    config.warn_insecure_defaults();

    let pool = match punchgate_database::open(&config.database).await {
        Ok(pool) => pool,
        Err(e) => {
            error!(error = %e, "Database bootstrap failed");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = punchgate_api::app::run_server(config, pool).await {
        error!(error = %e, "Gateway exited with an error");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// RUST_LOG wins over the configured level; the format falls back to a
/// compact human layout when json is not requested.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}
