//! Runtime configuration.
//!
//! Everything is a flag with a `FLUXGATE_`-prefixed environment fallback, so
//! the binary runs the same from a shell, a unit file or a container spec.

use clap::Parser;
use fluxgate_consumer::{BrokerAuth, TicketAuth};
use fluxgate_influx::InfluxConfig;

#[derive(Parser, Debug, Clone)]
#[command(name = "fluxgate", about = "Bridges broker state records into a time-series store")]
pub struct Config {
    /// Broker bootstrap address, or `memory` for the in-process broker.
    #[arg(long, env = "FLUXGATE_BROKER_ADDR")]
    pub broker_addr: String,

    /// Topic name fragment; every broker topic containing it is consumed.
    #[arg(long, env = "FLUXGATE_TOPIC", default_value = "owner")]
    pub topic: String,

    /// Schema registry base URL.
    #[arg(long, env = "FLUXGATE_SCHEMA_REGISTRY")]
    pub schema_registry: String,

    /// Time-series store base URL.
    #[arg(long, env = "FLUXGATE_INFLUX_ADDR")]
    pub influx_addr: String,

    /// Time-series database name.
    #[arg(long, env = "FLUXGATE_INFLUX_DATABASE", default_value = "fluxgate")]
    pub influx_database: String,

    /// Time-series store user; basic auth is attached only when set.
    #[arg(long, env = "FLUXGATE_INFLUX_USER")]
    pub influx_user: Option<String>,

    /// Time-series store password.
    #[arg(long, env = "FLUXGATE_INFLUX_PASSWORD")]
    pub influx_password: Option<String>,

    /// HTTP port for the query surface.
    #[arg(long, env = "FLUXGATE_PORT", default_value_t = 7070)]
    pub port: u16,

    /// Log level used when `RUST_LOG` is not set.
    #[arg(long, env = "FLUXGATE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Enable ticket (SASL) authentication against the broker.
    #[arg(long, env = "FLUXGATE_WITH_TICKET")]
    pub with_ticket: bool,

    /// Ticket mechanism negotiated with the broker.
    #[arg(long, env = "FLUXGATE_TICKET_MECHANISM", default_value = "GSSAPI")]
    pub ticket_mechanism: String,

    /// Path to the ticket configuration (keytab for GSSAPI).
    #[arg(long, env = "FLUXGATE_TICKET_CONFIG_PATH", default_value = "")]
    pub ticket_config_path: String,

    /// Service name the broker is registered under.
    #[arg(long, env = "FLUXGATE_TICKET_SERVICE_NAME", default_value = "")]
    pub ticket_service_name: String,

    /// Principal presented to the broker.
    #[arg(long, env = "FLUXGATE_TICKET_PRINCIPAL", default_value = "")]
    pub ticket_principal: String,

    /// Secret for the principal.
    #[arg(long, env = "FLUXGATE_TICKET_SECRET", default_value = "")]
    pub ticket_secret: String,

    /// Realm the principal belongs to.
    #[arg(long, env = "FLUXGATE_TICKET_REALM", default_value = "")]
    pub ticket_realm: String,
}

impl Config {
    /// Broker credentials assembled from the ticket flags.
    pub fn broker_auth(&self) -> BrokerAuth {
        if !self.with_ticket {
            return BrokerAuth::None;
        }
        BrokerAuth::Ticket(TicketAuth {
            mechanism: self.ticket_mechanism.clone(),
            config_path: self.ticket_config_path.clone(),
            service_name: self.ticket_service_name.clone(),
            principal: self.ticket_principal.clone(),
            secret: self.ticket_secret.clone(),
            realm: self.ticket_realm.clone(),
        })
    }

    /// Sink connection settings.
    pub fn influx_config(&self) -> InfluxConfig {
        InfluxConfig {
            addr: self.influx_addr.clone(),
            database: self.influx_database.clone(),
            username: self.influx_user.clone(),
            password: self.influx_password.clone(),
        }
    }
}
