//! Time-series point model.
//!
//! A [`Point`] is the write-side unit: one timestamped set of string
//! attribute fields tagged with the identity path. Construction validates
//! the invariants, so a `Point` in hand is always persistable. A
//! [`StatePoint`] is the read-side unit returned by range queries.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ValidationError;

/// Measurement name every point is written under.
pub const MEASUREMENT: &str = "state";

pub const OWNER_TAG: &str = "owner";
pub const THING_TAG: &str = "thing";
pub const NODE_TAG: &str = "node";

/// Provenance tag recording which schema decoded the source record.
pub const SCHEMA_TAG: &str = "schema";

/// Query filter value meaning "match any", alongside the empty string.
pub const WILDCARD: &str = "+";

const IDENTITY_TAGS: [&str; 3] = [OWNER_TAG, THING_TAG, NODE_TAG];

/// A validated time-series point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Point {
    timestamp: DateTime<Utc>,
    tags: BTreeMap<String, String>,
    fields: BTreeMap<String, String>,
}

impl Point {
    /// Build a point, enforcing the construction invariants:
    /// non-empty `owner`/`thing`/`node` tags, at least one field, and no
    /// field key containing `$`.
    pub fn new(
        timestamp: DateTime<Utc>,
        tags: BTreeMap<String, String>,
        fields: BTreeMap<String, String>,
    ) -> Result<Self, ValidationError> {
        for tag in IDENTITY_TAGS {
            if tags.get(tag).map_or(true, |value| value.is_empty()) {
                return Err(ValidationError::MissingTag(tag));
            }
        }
        if fields.is_empty() {
            return Err(ValidationError::EmptyFields);
        }
        for key in fields.keys() {
            if key.contains('$') {
                return Err(ValidationError::StaticAttribute(key.clone()));
            }
        }
        Ok(Self {
            timestamp,
            tags,
            fields,
        })
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(String::as_str)
    }
}

/// A persisted point read back from the store, keyed by its identity path.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatePoint {
    pub owner: String,
    pub thing: String,
    pub node: String,
    pub attributes: BTreeMap<String, String>,
    pub date_time: DateTime<Utc>,
}
