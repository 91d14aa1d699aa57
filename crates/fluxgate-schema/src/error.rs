//! Error types for schema resolution and record decoding.
//!
//! ## Error Categories
//!
//! ### Registry Errors
//! - `Request`: transport-level failure talking to the schema registry
//! - `Unavailable`: registry answered with a non-success status
//! - `Malformed`: registry answered 200 but the envelope did not parse
//!
//! ### Decode Errors
//! - `Frame`: payload too short or wrong magic byte
//! - `Avro`: schema or datum did not decode
//! - `Json`: plain-text fallback did not decode
//! - `DecodeFailed`: every decode strategy failed; carries all causes
//!
//! ### Timestamp Errors
//! - `MissingTimestamp` / `InvalidTimestamp`: a strategy produced a field
//!   mapping but its `dateTime` was absent or matched neither accepted format

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema registry request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("schema registry returned {status}: {body}")]
    Unavailable { status: u16, body: String },

    #[error("malformed registry response: {0}")]
    Malformed(String),

    #[error("invalid wire framing: {0}")]
    Frame(String),

    #[error("avro decode failed: {0}")]
    Avro(String),

    #[error("json decode failed: {0}")]
    Json(String),

    #[error("record decode failed (schema strategy: {schema}) (plain strategy: {plain})")]
    DecodeFailed { schema: String, plain: String },

    #[error("value record has no dateTime field")]
    MissingTimestamp,

    #[error("dateTime '{value}' is neither RFC 3339 nor the legacy offset format")]
    InvalidTimestamp { value: String },
}

pub type Result<T> = std::result::Result<T, SchemaError>;
