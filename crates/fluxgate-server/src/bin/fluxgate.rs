//! Fluxgate bridge server binary
//!
//! # Environment Variables
//!
//! - `FLUXGATE_BROKER_ADDR`: broker bootstrap address, or `memory` (required)
//! - `FLUXGATE_TOPIC`: substring matched against broker topic names (default: owner)
//! - `FLUXGATE_SCHEMA_REGISTRY`: schema registry base URL (required)
//! - `FLUXGATE_INFLUX_ADDR`: time-series store base URL (required)
//! - `FLUXGATE_INFLUX_DATABASE`: target database (default: fluxgate)
//! - `FLUXGATE_INFLUX_USER` / `FLUXGATE_INFLUX_PASSWORD`: store credentials (optional)
//! - `FLUXGATE_PORT`: HTTP port (default: 7070)
//! - `FLUXGATE_LOG_LEVEL`: log level when `RUST_LOG` is unset (default: info)
//! - `FLUXGATE_WITH_TICKET` plus `FLUXGATE_TICKET_*`: broker ticket authentication
//!
//! # Example
//!
//! ```bash
//! export FLUXGATE_BROKER_ADDR=localhost:9092
//! export FLUXGATE_SCHEMA_REGISTRY=http://localhost:8081
//! export FLUXGATE_INFLUX_ADDR=http://localhost:8086
//! cargo run --bin fluxgate --features kafka
//! ```

use std::sync::Arc;

use clap::Parser;
use fluxgate_consumer::{
    os_signal, BrokerClient, CloseReason, ConsumerGroup, GroupConfig, MemoryBroker, ShutdownHandle,
};
use fluxgate_influx::{InfluxSink, PointSink};
use fluxgate_schema::{RecordDecoder, RegistryClient};
use fluxgate_server::{create_router, serve, AppState, BridgePipeline, Config, PointService};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .init();

    info!("Fluxgate bridge starting...");
    info!("  Broker: {}", config.broker_addr);
    info!("  Topic: {}", config.topic);
    info!("  Schema registry: {}", config.schema_registry);
    info!(
        "  Time-series store: {} (database: {})",
        config.influx_addr, config.influx_database
    );

    // Probe the registry so a misconfigured URL surfaces at startup. Decoding
    // resolves schemas per record, so a failed probe is not fatal.
    let registry = Arc::new(RegistryClient::new(config.schema_registry.clone()));
    match registry.latest_schema_id(&config.topic).await {
        Ok(schema_id) => info!(schema_id, "topic schema resolved"),
        Err(e) => warn!(error = %e, "topic schema lookup failed; schemas will resolve per record"),
    }

    let decoder = RecordDecoder::new(registry);
    let sink: Arc<dyn PointSink> = Arc::new(InfluxSink::new(config.influx_config()));
    let pipeline = Arc::new(BridgePipeline::new(decoder, sink.clone()));
    let service = PointService::new(sink);

    let shutdown = ShutdownHandle::new();
    let broker = connect_broker(&config.broker_addr)?;

    let group = ConsumerGroup::new(
        GroupConfig {
            topic: config.topic.clone(),
            auth: config.broker_auth(),
        },
        broker,
        pipeline,
        shutdown.clone(),
    );

    // The group runs beside the HTTP server. A broker failure ends the group
    // but leaves the query API serving.
    tokio::spawn(async move {
        match group.run().await {
            Ok(report) => {
                let reason = &report.reason;
                if matches!(reason, CloseReason::PartitionError { .. }) {
                    error!(
                        reason = %reason,
                        records_consumed = report.records_consumed,
                        "consumer group closed"
                    );
                } else {
                    info!(
                        reason = %reason,
                        records_consumed = report.records_consumed,
                        "consumer group closed"
                    );
                }
            }
            Err(e) => error!(error = %e, "consumer group failed to start"),
        }
    });

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let signal = os_signal().await;
        info!(signal = %signal, "shutdown signal received");
        signal_shutdown.signal(signal);
    });

    let router = create_router(AppState { service });
    serve(router, config.port, shutdown).await?;

    info!("fluxgate stopped");
    Ok(())
}

/// Pick the broker driver from the configured address.
fn connect_broker(addr: &str) -> Result<Arc<dyn BrokerClient>, Box<dyn std::error::Error>> {
    if addr == "memory" {
        info!("  Using in-process memory broker");
        Ok(Arc::new(MemoryBroker::new()))
    } else {
        #[cfg(feature = "kafka")]
        {
            info!("  Using Kafka broker");
            Ok(Arc::new(fluxgate_consumer::KafkaBroker::new(addr)))
        }
        #[cfg(not(feature = "kafka"))]
        {
            return Err(format!(
                "broker address '{addr}' provided but the kafka feature is not enabled"
            )
            .into());
        }
    }
}
