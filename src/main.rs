//! Process bootstrap
//!
//! Loads configuration, installs logging, and starts the background consumer
//! when the broker is reachable. Runs until Ctrl-C, then stops the consumer
//! and waits for it to leave the group.

use std::process::ExitCode;
use std::sync::Arc;

use kafka_sessions::kafka::{BrokerService, RdKafkaConnector};
use kafka_sessions::{telemetry, Config};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = telemetry::init_logging(config.log_format) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    info!(
        brokers = %config.brokers,
        client_id = %config.client_id,
        group_id = %config.group_id,
        "Starting broker session manager"
    );

    let connector = Arc::new(RdKafkaConnector::new(&config));
    let service = match BrokerService::new(connector, &config) {
        Ok(service) => service,
        Err(e) => {
            error!(error = %e, "Failed to build broker service");
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    let consumer = match service.start_if_available(cancel.clone()).await {
        Ok(handle) => handle,
        Err(e) => {
            error!(error = %e, "Error starting background consumer");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown requested");

    cancel.cancel();
    if let Some(handle) = consumer {
        if let Err(e) = handle.await {
            error!(error = %e, "Background consumer task failed");
        }
    }

    info!("Shutdown complete");
    ExitCode::SUCCESS
}
