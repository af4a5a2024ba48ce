//! Ratekeeper keeper binary
//!
//! Loads a scenario, then polls `update` for every configured token on a
//! timer. Updates that are not yet due are cheap no-ops; failed updates are
//! retried on the next round.

mod config;
mod scenario;

use std::time::Duration;

use anyhow::Result;
use ratekeeper_common::{RATE_DECIMALS, VERSION};
use ratekeeper_controller::{Address, SharedRateController, UpdateOutcome};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::KeeperConfig;
use crate::scenario::Scenario;

#[tokio::main]
async fn main() -> Result<()> {
    let config = KeeperConfig::load()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.controller.log_filter));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    info!("Starting Ratekeeper keeper v{}", VERSION);
    info!("Loaded configuration: {:?}", config);

    let json = tokio::fs::read_to_string(&config.scenario_path).await?;
    let scenario = Scenario::from_json(&json)?;
    let controller = SharedRateController::new(scenario.build(config.controller.clone())?);
    info!(
        tokens = scenario.tokens.len(),
        keeper = %scenario.keeper,
        "Scenario loaded"
    );

    let mut interval = tokio::time::interval(Duration::from_secs(config.poll_interval_secs));
    let mut rounds: u64 = 0;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                poll_round(&controller, scenario.keeper);
                rounds += 1;
                if config.ticks > 0 && rounds >= config.ticks {
                    info!(rounds, "Polling rounds complete");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
        }
    }

    let recent = controller.with(|c| c.recent_events(16));
    for event in recent.iter().rev() {
        debug!(event = %event.to_json(), "Recent event");
    }

    Ok(())
}

/// One pass over every configured token
fn poll_round(controller: &SharedRateController, keeper: Address) {
    let tokens = controller.with(|c| c.tokens());

    for token in tokens {
        if !controller.needs_update(token) {
            continue;
        }

        match controller.update(keeper, token) {
            Ok(UpdateOutcome::Updated(observation)) => {
                info!(
                    %token,
                    rate = %display_percent(observation.rate),
                    target = %display_percent(observation.target),
                    "Rate updated"
                );
            }
            Ok(UpdateOutcome::NotDue { next_update_at }) => {
                debug!(%token, next_update_at, "Not due");
            }
            Ok(UpdateOutcome::InputUnavailable) => {
                warn!(%token, "PID input unavailable, retrying next round");
            }
            Err(e) => {
                warn!(%token, error = %e, "Update failed, retrying next round");
            }
        }
    }
}

/// Render a 1e18-scaled rate as a percentage
fn display_percent(rate: u128) -> String {
    i128::try_from(rate)
        .ok()
        .and_then(|r| Decimal::try_from_i128_with_scale(r, RATE_DECIMALS).ok())
        .and_then(|d| d.checked_mul(Decimal::ONE_HUNDRED))
        .map(|d| format!("{}%", d.normalize()))
        .unwrap_or_else(|| rate.to_string())
}
