//! Broker authentication settings.
//!
//! Authentication is negotiated once, before any partition cursor is opened.
//! A failure at this stage is fatal to the whole group. The ticket mechanism
//! carries the fields a Kerberos-style handshake needs; the broker client
//! decides what to do with them.

use crate::error::{ConsumerError, Result};

/// Authentication mode for the broker connection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BrokerAuth {
    /// Plaintext connection, no negotiation.
    #[default]
    None,
    /// Ticket-based negotiation (e.g. GSSAPI/Kerberos).
    Ticket(TicketAuth),
}

/// Settings for ticket-based authentication. Every field is required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketAuth {
    /// Mechanism name announced to the broker, e.g. "GSSAPI".
    pub mechanism: String,
    /// Path to the mechanism configuration file.
    pub config_path: String,
    /// Service name the broker is registered under.
    pub service_name: String,
    /// Principal to authenticate as.
    pub principal: String,
    /// Shared secret for the principal.
    pub secret: String,
    /// Authentication realm.
    pub realm: String,
}

impl BrokerAuth {
    /// Check that the configured mode is complete enough to negotiate.
    pub fn validate(&self) -> Result<()> {
        match self {
            BrokerAuth::None => Ok(()),
            BrokerAuth::Ticket(ticket) => ticket.validate(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, BrokerAuth::None)
    }
}

impl TicketAuth {
    fn validate(&self) -> Result<()> {
        let required = [
            ("mechanism", &self.mechanism),
            ("config-path", &self.config_path),
            ("service-name", &self.service_name),
            ("principal", &self.principal),
            ("secret", &self.secret),
            ("realm", &self.realm),
        ];
        for (name, value) in required {
            if value.is_empty() {
                return Err(ConsumerError::AuthenticationFailed(format!(
                    "ticket auth field '{name}' is required"
                )));
            }
        }
        Ok(())
    }
}
