//! # Lifeline Runtime
//!
//! Demo binary: builds an [`AppContainer`] from the environment, runs the
//! login and cart-total flows, and prints what happened.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from the environment
//! 2. Initialize logging and Prometheus metrics
//! 3. Build the container with both metrics recorders
//! 4. Run the scenarios
//! 5. Finish remaining scopes and print the metrics

use anyhow::{ensure, Context, Result};
use serde::Serialize;
use tracing::info;

use lifeline_runtime::scenarios::{cart, login};
use lifeline_runtime::{AppContainer, RuntimeConfig};
use lifeline_telemetry::init_telemetry;
use shared_types::MetricsSnapshot;

#[derive(Serialize)]
struct RunSummary {
    config: RuntimeConfig,
    login: login::LoginOutcome,
    cart: cart::CartOutcome,
    metrics: MetricsSnapshot,
}

fn main() -> Result<()> {
    let config = RuntimeConfig::from_env().context("Failed to load runtime configuration")?;
    let telemetry =
        init_telemetry(config.telemetry.clone()).context("Failed to initialize telemetry")?;

    let app = AppContainer::with_recorder(config.clone(), Some(telemetry.recorder()));

    let login = login::run(&app).context("Login scenario failed")?;
    ensure!(
        login.received == ["bob"],
        "login subscriber saw {:?}, expected only \"bob\"",
        login.received
    );

    let cart = cart::run(&app).context("Cart scenario failed")?;
    ensure!(
        cart.replayed_on_subscribe == [5],
        "cart-total replay was {:?}, expected [5]",
        cart.replayed_on_subscribe
    );
    ensure!(cart.evicted, "cart entry outlived its owners");

    app.shutdown();

    let summary = RunSummary {
        config,
        login,
        cart,
        metrics: app.metrics(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).context("Failed to encode run summary")?
    );

    if telemetry.config().metrics_enabled {
        info!("Prometheus metrics:\n{}", lifeline_telemetry::encode_metrics()?);
    }

    Ok(())
}
