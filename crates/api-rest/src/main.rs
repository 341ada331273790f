//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own.
//!
//! ## Intended use
//! Useful for development and debugging. The workspace's main `opd-run` binary serves the same
//! router and additionally loads a `.env` file.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use opd_core::config::{bootstrap_admin_from_env_value, data_dir_from_env_value};
use opd_core::{ClinicService, CoreConfig, SystemClock};

/// Main entry point for the OPD REST API server
///
/// # Environment Variables
/// - `OPD_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `OPD_DATA_DIR`: Snapshot directory (default: "clinic_data"; `:memory:` disables persistence)
/// - `OPD_BOOTSTRAP_ADMIN`: Principal granted the admin role at startup (optional)
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration is invalid or the snapshot cannot be loaded,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("opd_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("OPD_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = CoreConfig::new(
        data_dir_from_env_value(std::env::var("OPD_DATA_DIR").ok()),
        bootstrap_admin_from_env_value(std::env::var("OPD_BOOTSTRAP_ADMIN").ok())?,
    )?;
    let service = ClinicService::open(&cfg, Arc::new(SystemClock))?;

    tracing::info!("-- Starting OPD REST API on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, api_rest::router(service)).await?;

    Ok(())
}
