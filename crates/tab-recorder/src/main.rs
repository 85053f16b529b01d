//! Tab-Recorder: coordinator daemon for browser tab recording sessions.

mod app;
mod config;
mod error;
mod server;
#[cfg(test)]
mod tests;

pub(crate) use {
    app::App,
    error::{AppError, Result as AppResult},
};

use crate::config::{Config, DEFAULT_LOG_FILTER};

use tracing::error;
use tracing_subscriber::EnvFilter;

/// Application entry point.
fn main() {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(DEFAULT_LOG_FILTER);
            error!("Failed to load config: {:?}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging.filter);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {:?}", e);
            std::process::exit(1);
        }
    };

    let app = App { config };
    if let Err(e) = rt.block_on(app.run()) {
        error!(error = ?e, "App error");
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins over the configured filter.
fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
