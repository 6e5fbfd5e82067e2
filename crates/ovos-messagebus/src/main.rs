//! # OVOS Message Bus
//!
//! Runs the websocket message bus until SIGINT or SIGTERM.
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging (`OVOS_BUS_LOG_LEVEL`, `OVOS_BUS_JSON_LOGS`)
//! 2. Load configuration (defaults, config file, environment)
//! 3. Validate configuration and bind the listener
//! 4. Serve until a shutdown signal, then close every client

use anyhow::{Context, Result};
use ovos_bus_core::HubStatsSnapshot;
use ovos_bus_server::{BusConfig, MessageBusService, VERSION};
use ovos_bus_telemetry::{init_logging, TelemetryConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = TelemetryConfig::from_env();
    let _guard = init_logging(&telemetry).context("failed to initialize logging")?;

    info!(version = VERSION, "Starting OVOS message bus");

    let config = BusConfig::load();
    info!(
        endpoint = %config.endpoint(),
        max_msg_size_mib = config.max_msg_size,
        channel_capacity = config.channel_capacity,
        "Message bus configuration loaded"
    );

    let service = MessageBusService::new(config).context("invalid message bus configuration")?;
    let stats = service.run().await.context("message bus failed")?;

    log_summary(&stats);
    Ok(())
}

fn log_summary(stats: &HubStatsSnapshot) {
    info!(
        connections = stats.connections_total,
        messages = stats.messages_published,
        deliveries = stats.deliveries,
        invalid = stats.invalid_messages,
        dropped = stats.dropped,
        "Message bus shut down"
    );
}
