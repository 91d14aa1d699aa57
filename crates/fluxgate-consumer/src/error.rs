//! Error types for the consumer group.
//!
//! ## Error Categories
//!
//! ### Fatal Errors
//! - `AuthenticationFailed`: ticket negotiation was rejected or incomplete;
//!   the group aborts before any partition connects
//! - `Broker`: a broker-level failure (listing topics, opening a cursor,
//!   reading a stream)
//! - `NoMatchingTopic`: no broker topic contains the configured fragment
//!
//! ### Per-record Errors
//! - `Handler`: the record handler rejected one record; logged by the owning
//!   partition task, the record is dropped and streaming continues

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("broker error: {0}")]
    Broker(String),

    #[error("no broker topic matches '{0}'")]
    NoMatchingTopic(String),

    #[error("handler error: {0}")]
    Handler(String),
}

pub type Result<T> = std::result::Result<T, ConsumerError>;
