//! # Sentry Controller
//!
//! A Kubernetes controller that reconciles declared Sentry state against the
//! Sentry API.
//!
//! ## Overview
//!
//! The controller watches three custom resource kinds and converges the
//! Sentry organization it manages toward what they declare:
//!
//! 1. **Team** - a team in the managed organization
//! 2. **Project** - a project under a referenced `Team`
//! 3. **ClientKey** - a client key under a referenced `Project`, with the
//!    key's DSN credential triple projected into an owned `Secret`
//!
//! Creation is recorded in each object's status, so every upstream entity is
//! adopted exactly once; deletion is gated by a finalizer until upstream
//! cleanup has succeeded. Prometheus metrics and health probes are served
//! over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! sentry-controller \
//!     --organization my-org \
//!     --api-token "$SENTRY_API_TOKEN"
//! ```

use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use sentry_controller::cli::Settings;
use sentry_controller::server::{start_server, ServerState};
use sentry_controller::{controller, observability};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sentry_controller=info".into()),
        )
        .init();

    info!("Starting Sentry Controller");

    observability::metrics::register_metrics().context("failed to register metrics")?;

    // HTTP server for metrics and probes
    let server_state = Arc::new(ServerState::default());
    let server_state_clone = Arc::clone(&server_state);
    let metrics_port = settings.metrics_port;
    tokio::spawn(async move {
        if let Err(e) = start_server(metrics_port, server_state_clone).await {
            error!("HTTP server error: {e}");
        }
    });

    server_state.is_ready.store(true, Ordering::Relaxed);

    controller::run(&settings).await?;

    server_state.is_ready.store(false, Ordering::Relaxed);
    info!("Controller stopped");

    Ok(())
}
