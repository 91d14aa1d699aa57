//! Decoded record to time-series point mapping.

use std::collections::BTreeMap;

use crate::error::MapError;
use crate::identity::IdentityKey;
use crate::point::{Point, NODE_TAG, OWNER_TAG, SCHEMA_TAG, THING_TAG};
use crate::record::{DecodedRecord, DATE_TIME_FIELD, KEY_FIELD};

/// Map a decoded key/value pair into a persistable [`Point`].
///
/// The identity path extracted from `key` becomes the `owner`/`thing`/`node`
/// tags; when the value was decoded against a named schema, its name is
/// attached as the `schema` provenance tag. Every decoded field except
/// `dateTime` and `key` becomes a point attribute. The point is validated
/// before it is returned, so a mapping failure never reaches the sink.
pub fn map_record(
    key: &str,
    record: &DecodedRecord,
    schema_name: Option<&str>,
) -> Result<Point, MapError> {
    let identity =
        IdentityKey::parse(key).ok_or_else(|| MapError::InvalidKey(key.to_string()))?;

    let mut tags = BTreeMap::new();
    tags.insert(OWNER_TAG.to_string(), identity.owner);
    tags.insert(THING_TAG.to_string(), identity.thing);
    tags.insert(NODE_TAG.to_string(), identity.node);
    if let Some(name) = schema_name {
        if !name.is_empty() {
            tags.insert(SCHEMA_TAG.to_string(), name.to_string());
        }
    }

    let fields: BTreeMap<String, String> = record
        .fields
        .iter()
        .filter(|(name, _)| name.as_str() != DATE_TIME_FIELD && name.as_str() != KEY_FIELD)
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    Ok(Point::new(record.timestamp, tags, fields)?)
}
