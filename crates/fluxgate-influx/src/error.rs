//! Error types for the time-series sink.
//!
//! ## Error Categories
//!
//! - **Transport**: `Request` wraps connection and timeout failures from the
//!   HTTP client.
//! - **Store rejection**: `Persistence` carries the status and body of a
//!   non-success store response; `Query` carries an error the store reported
//!   inside an otherwise successful response.
//! - **Protocol**: `Malformed` means the store answered with something the
//!   response parser cannot make sense of.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("sink request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("sink rejected the write: status {status}: {body}")]
    Persistence { status: u16, body: String },

    #[error("store reported a query error: {0}")]
    Query(String),

    #[error("malformed store response: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, SinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SinkError::Persistence {
            status: 400,
            body: "partial write".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "sink rejected the write: status 400: partial write"
        );

        let err = SinkError::Query("retention policy not found".to_string());
        assert!(err.to_string().contains("retention policy not found"));
    }
}
