//! Error types for the core data model.
//!
//! Mapping errors cover the key-to-identity step; validation errors cover
//! the point construction invariants. Both are per-message errors: callers
//! log them and drop the offending record, they never abort consumption.

use thiserror::Error;

/// A point violated one of the construction invariants.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// One of the identity tags (`owner`, `thing`, `node`) is absent or empty.
    #[error("missing or empty identity tag '{0}'")]
    MissingTag(&'static str),

    /// The point carries no attribute fields at all.
    #[error("point has no attribute fields")]
    EmptyFields,

    /// Static attributes (keys containing `$`) belong to the thing registry,
    /// not to the state series.
    #[error("attribute '{0}' is static registry data and cannot be reported as state")]
    StaticAttribute(String),
}

/// Mapping a decoded record into a time-series point failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MapError {
    /// The record key does not contain an
    /// `owner/<owner>/thing/<thing>/node/<node>` identity path.
    #[error("key '{0}' does not match pattern owner/<owner>/thing/<thing>/node/<node>")]
    InvalidKey(String),

    /// The mapped point failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

pub type Result<T> = std::result::Result<T, MapError>;
