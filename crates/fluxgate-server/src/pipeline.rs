//! Decode, map, persist chain for consumed records.
//!
//! [`BridgePipeline`] is the record handler the consumer group drives: each
//! record's key and value are decoded, mapped into a point and written to the
//! sink, all synchronously within the owning partition task. Failures are
//! per-record; the handler reports them and the group drops the record.

use std::sync::Arc;

use async_trait::async_trait;
use fluxgate_consumer::{ConsumerError, RawRecord, RecordHandler};
use fluxgate_core::{map_record, MapError, OWNER_TAG};
use fluxgate_influx::{PointSink, SinkError};
use fluxgate_schema::{RecordDecoder, SchemaError};
use thiserror::Error;

/// One record's failure, tagged with the stage that produced it.
#[derive(Debug, Error)]
enum PipelineError {
    #[error("record has no key")]
    MissingKey,

    #[error("key decode failed: {0}")]
    Key(SchemaError),

    #[error("value decode failed: {0}")]
    Value(SchemaError),

    #[error("mapping failed: {0}")]
    Map(#[from] MapError),

    #[error("persistence failed: {0}")]
    Persist(#[from] SinkError),
}

pub struct BridgePipeline {
    decoder: RecordDecoder,
    sink: Arc<dyn PointSink>,
}

impl BridgePipeline {
    pub fn new(decoder: RecordDecoder, sink: Arc<dyn PointSink>) -> Self {
        Self { decoder, sink }
    }

    async fn process(&self, record: &RawRecord) -> Result<(), PipelineError> {
        let key_payload = record.key.as_ref().ok_or(PipelineError::MissingKey)?;
        let key = self
            .decoder
            .decode_key(key_payload)
            .await
            .map_err(PipelineError::Key)?;
        let (decoded, schema_name) = self
            .decoder
            .decode_value(&record.value)
            .await
            .map_err(PipelineError::Value)?;

        let point = map_record(&key, &decoded, schema_name.as_deref())?;
        self.sink.write_point(&point).await?;

        tracing::debug!(
            topic = %record.topic,
            partition = record.partition,
            offset = record.offset,
            owner = %point.tag(OWNER_TAG).unwrap_or_default(),
            timestamp = %point.timestamp(),
            "state point persisted"
        );
        Ok(())
    }
}

#[async_trait]
impl RecordHandler for BridgePipeline {
    async fn handle(&self, record: &RawRecord) -> fluxgate_consumer::Result<()> {
        self.process(record)
            .await
            .map_err(|e| ConsumerError::Handler(e.to_string()))
    }
}
