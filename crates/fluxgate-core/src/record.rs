//! Decoded record model.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

/// Field carrying the event timestamp in value payloads.
pub const DATE_TIME_FIELD: &str = "dateTime";

/// Field mirroring the record key inside value payloads. Consumed by the
/// mapper, never persisted as an attribute.
pub const KEY_FIELD: &str = "key";

/// A broker record after decoding: the flattened string attribute mapping
/// plus the event timestamp extracted from its `dateTime` field.
///
/// The `dateTime` entry is removed from `fields` when it is consumed into
/// `timestamp`, so the mapping holds only reportable attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRecord {
    pub fields: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

impl DecodedRecord {
    pub fn new(fields: BTreeMap<String, String>, timestamp: DateTime<Utc>) -> Self {
        Self { fields, timestamp }
    }

    /// Look up a decoded attribute by name.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}
