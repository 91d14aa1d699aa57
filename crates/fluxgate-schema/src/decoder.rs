//! Two-stage record decoding.
//!
//! Every payload is decoded by an ordered list of strategies:
//!
//! 1. **Schema strategy**: split the Confluent wire header, resolve the
//!    schema by id, decode the Avro datum.
//! 2. **Plain strategy**: parse the entire original payload as JSON.
//!
//! The first strategy to succeed wins. For value payloads a strategy only
//! succeeds when its field mapping carries a parseable `dateTime`; a mapping
//! with a missing or malformed timestamp falls through to the next strategy
//! once, and the final error then reports the timestamp fault rather than a
//! generic decode failure. When no strategy succeeds the error carries the
//! cause of every attempt.

use std::collections::BTreeMap;
use std::sync::Arc;

use apache_avro::types::Value;

use fluxgate_core::record::DATE_TIME_FIELD;
use fluxgate_core::timestamp::parse_date_time;
use fluxgate_core::DecodedRecord;

use crate::client::RegistryClient;
use crate::error::{Result, SchemaError};
use crate::wire;

/// Decodes record keys and values against the schema registry.
pub struct RecordDecoder {
    registry: Arc<RegistryClient>,
}

impl RecordDecoder {
    pub fn new(registry: Arc<RegistryClient>) -> Self {
        Self { registry }
    }

    /// Decode a value payload into a record plus the name of the schema that
    /// decoded it (`None` when the plain strategy won).
    pub async fn decode_value(&self, payload: &[u8]) -> Result<(DecodedRecord, Option<String>)> {
        let mut timestamp_fault: Option<SchemaError> = None;

        let schema_cause = match self.value_fields(payload).await {
            Ok((fields, schema_name)) => match finish_record(fields) {
                Ok(record) => return Ok((record, schema_name)),
                Err(fault) => {
                    let cause = fault.to_string();
                    timestamp_fault = Some(fault);
                    cause
                }
            },
            Err(err) => err.to_string(),
        };

        let plain_cause = match plain_fields(payload) {
            Ok(fields) => match finish_record(fields) {
                Ok(record) => return Ok((record, None)),
                Err(fault) => {
                    let cause = fault.to_string();
                    if timestamp_fault.is_none() {
                        timestamp_fault = Some(fault);
                    }
                    cause
                }
            },
            Err(err) => err.to_string(),
        };

        // A mapping was produced somewhere; the record itself is readable and
        // only its timestamp is at fault.
        if let Some(fault) = timestamp_fault {
            return Err(fault);
        }

        Err(SchemaError::DecodeFailed {
            schema: schema_cause,
            plain: plain_cause,
        })
    }

    /// Decode a key payload into the identity-key text.
    pub async fn decode_key(&self, payload: &[u8]) -> Result<String> {
        let schema_cause = match self.key_string(payload).await {
            Ok(text) => return Ok(text),
            Err(err) => err.to_string(),
        };

        let plain_cause = match plain_string(payload) {
            Ok(text) => return Ok(text),
            Err(err) => err.to_string(),
        };

        Err(SchemaError::DecodeFailed {
            schema: schema_cause,
            plain: plain_cause,
        })
    }

    async fn value_fields(
        &self,
        payload: &[u8],
    ) -> Result<(BTreeMap<String, String>, Option<String>)> {
        let (schema_id, datum) = wire::split(payload)?;
        let schema = self.registry.schema_by_id(schema_id).await?;
        let value = apache_avro::from_avro_datum(&schema.parsed, &mut &datum[..], None)
            .map_err(|e| {
                SchemaError::Avro(format!("datum does not decode under schema {schema_id}: {e}"))
            })?;
        Ok((flatten_value(value)?, schema.name.clone()))
    }

    async fn key_string(&self, payload: &[u8]) -> Result<String> {
        let (schema_id, datum) = wire::split(payload)?;
        let schema = self.registry.schema_by_id(schema_id).await?;
        let value = apache_avro::from_avro_datum(&schema.parsed, &mut &datum[..], None)
            .map_err(|e| {
                SchemaError::Avro(format!("key does not decode under schema {schema_id}: {e}"))
            })?;
        scalar_text("key", &value)?.ok_or_else(|| SchemaError::Avro("key is null".to_string()))
    }
}

/// Consume `dateTime` out of a field mapping and build the decoded record.
fn finish_record(mut fields: BTreeMap<String, String>) -> Result<DecodedRecord> {
    let raw = fields
        .remove(DATE_TIME_FIELD)
        .ok_or(SchemaError::MissingTimestamp)?;
    match parse_date_time(&raw) {
        Some(timestamp) => Ok(DecodedRecord::new(fields, timestamp)),
        None => Err(SchemaError::InvalidTimestamp { value: raw }),
    }
}

/// Flatten an Avro record (or string map) into a string field mapping.
/// Null fields are dropped; nested values are rejected.
fn flatten_value(value: Value) -> Result<BTreeMap<String, String>> {
    let entries = match value {
        Value::Record(entries) => entries,
        Value::Map(map) => map.into_iter().collect(),
        other => {
            return Err(SchemaError::Avro(format!(
                "expected a record value, got {}",
                value_kind(&other)
            )))
        }
    };

    let mut fields = BTreeMap::new();
    for (name, field_value) in entries {
        if let Some(text) = scalar_text(&name, &field_value)? {
            fields.insert(name, text);
        }
    }
    Ok(fields)
}

fn scalar_text(name: &str, value: &Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(text.clone())),
        Value::Boolean(flag) => Ok(Some(flag.to_string())),
        Value::Int(number) => Ok(Some(number.to_string())),
        Value::Long(number) => Ok(Some(number.to_string())),
        Value::Float(number) => Ok(Some(number.to_string())),
        Value::Double(number) => Ok(Some(number.to_string())),
        Value::Enum(_, symbol) => Ok(Some(symbol.clone())),
        Value::Union(_, inner) => scalar_text(name, inner),
        other => Err(SchemaError::Avro(format!(
            "field '{}' holds a non-scalar {} value",
            name,
            value_kind(other)
        ))),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Boolean(_) => "boolean",
        Value::Int(_) => "int",
        Value::Long(_) => "long",
        Value::Float(_) => "float",
        Value::Double(_) => "double",
        Value::Bytes(_) => "bytes",
        Value::String(_) => "string",
        Value::Fixed(_, _) => "fixed",
        Value::Enum(_, _) => "enum",
        Value::Union(_, _) => "union",
        Value::Array(_) => "array",
        Value::Map(_) => "map",
        Value::Record(_) => "record",
        _ => "other",
    }
}

fn plain_fields(payload: &[u8]) -> Result<BTreeMap<String, String>> {
    let value: serde_json::Value =
        serde_json::from_slice(payload).map_err(|e| SchemaError::Json(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| SchemaError::Json("payload is not a JSON object".to_string()))?;

    let mut fields = BTreeMap::new();
    for (name, field_value) in object {
        match field_value {
            serde_json::Value::Null => continue,
            serde_json::Value::String(text) => {
                fields.insert(name.clone(), text.clone());
            }
            serde_json::Value::Bool(flag) => {
                fields.insert(name.clone(), flag.to_string());
            }
            serde_json::Value::Number(number) => {
                fields.insert(name.clone(), number.to_string());
            }
            _ => {
                return Err(SchemaError::Json(format!(
                    "field '{name}' holds a nested value"
                )))
            }
        }
    }
    Ok(fields)
}

fn plain_string(payload: &[u8]) -> Result<String> {
    serde_json::from_slice::<String>(payload).map_err(|e| SchemaError::Json(e.to_string()))
}
