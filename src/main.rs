use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use opd_core::config::{bootstrap_admin_from_env_value, data_dir_from_env_value};
use opd_core::{ClinicService, CoreConfig, SystemClock};

/// Main entry point for the OPD records service
///
/// Loads `.env`, resolves configuration once, opens the clinic store and serves the REST API
/// until Ctrl-C.
///
/// # Environment Variables
/// - `OPD_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `OPD_DATA_DIR`: Snapshot directory (default: "clinic_data"; `:memory:` disables persistence)
/// - `OPD_BOOTSTRAP_ADMIN`: Principal granted the admin role at startup (optional)
///
/// # Returns
/// * `Ok(())` - If the server starts and shuts down cleanly
/// * `Err(anyhow::Error)` - If configuration, snapshot loading or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("opd_run=info".parse()?)
                .add_directive("opd_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("OPD_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = CoreConfig::new(
        data_dir_from_env_value(std::env::var("OPD_DATA_DIR").ok()),
        bootstrap_admin_from_env_value(std::env::var("OPD_BOOTSTRAP_ADMIN").ok())?,
    )?;
    match cfg.data_dir() {
        Some(dir) => tracing::info!("++ Clinic data directory: {}", dir.display()),
        None => tracing::warn!("++ Running without persistence, data is lost on exit"),
    }

    let service = ClinicService::open(&cfg, Arc::new(SystemClock))?;

    tracing::info!("++ Starting OPD REST on {}", rest_addr);

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, api_rest::router(service))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("-- Shutting down OPD REST");
        })
        .await?;

    Ok(())
}
