//! Partition consumer group.
//!
//! One task per partition reads records from its cursor and runs them through
//! the [`RecordHandler`] in stream order. Tasks report back to a single
//! coordinator over two unbounded channels, one for handled-record receipts
//! and one for partition failures. The first terminal event, whether a
//! partition failure or a shutdown signal, closes the whole group; the
//! coordinator does not wait for sibling tasks before tearing the broker
//! connection down.
//!
//! Offsets are never committed. Every run starts again from the oldest
//! retained record and idempotency is left to the sink.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::auth::BrokerAuth;
use crate::broker::{BrokerClient, PartitionStream, RawRecord, StartOffset};
use crate::error::{ConsumerError, Result};
use crate::shutdown::ShutdownHandle;

/// Processes one consumed record. The decode, map and persist chain lives
/// behind this seam so the group stays independent of any particular sink.
#[async_trait::async_trait]
pub trait RecordHandler: Send + Sync {
    async fn handle(&self, record: &RawRecord) -> Result<()>;
}

/// Settings for one consumer group run.
#[derive(Debug, Clone)]
pub struct GroupConfig {
    /// Substring matched against broker topic names.
    pub topic: String,
    pub auth: BrokerAuth,
}

/// Lifecycle of a single partition task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionState {
    Idle,
    Connected,
    Streaming,
    Error,
    Closed,
}

impl std::fmt::Display for PartitionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self {
            PartitionState::Idle => "idle",
            PartitionState::Connected => "connected",
            PartitionState::Streaming => "streaming",
            PartitionState::Error => "error",
            PartitionState::Closed => "closed",
        };
        write!(f, "{state}")
    }
}

/// Why the group stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Every partition stream ended cleanly.
    StreamsExhausted,
    /// A partition task hit a broker error.
    PartitionError {
        topic: String,
        partition: i32,
        message: String,
    },
    /// A shutdown signal arrived.
    Interrupted,
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloseReason::StreamsExhausted => write!(f, "all partition streams exhausted"),
            CloseReason::PartitionError {
                topic,
                partition,
                message,
            } => write!(f, "partition {topic}/{partition} failed: {message}"),
            CloseReason::Interrupted => write!(f, "interrupted by shutdown signal"),
        }
    }
}

/// Summary returned when the group stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupReport {
    pub reason: CloseReason,
    pub records_consumed: u64,
}

struct PartitionFailure {
    topic: String,
    partition: i32,
    message: String,
}

pub struct ConsumerGroup {
    config: GroupConfig,
    client: Arc<dyn BrokerClient>,
    handler: Arc<dyn RecordHandler>,
    shutdown: ShutdownHandle,
}

impl ConsumerGroup {
    pub fn new(
        config: GroupConfig,
        client: Arc<dyn BrokerClient>,
        handler: Arc<dyn RecordHandler>,
        shutdown: ShutdownHandle,
    ) -> Self {
        Self {
            config,
            client,
            handler,
            shutdown,
        }
    }

    /// Run the group until a terminal event.
    ///
    /// Bootstrap errors (invalid or rejected credentials, no matching topic,
    /// cursor open failures) are returned as `Err`; once streaming has
    /// started the group always resolves to a [`GroupReport`].
    pub async fn run(self) -> Result<GroupReport> {
        self.config.auth.validate()?;
        self.client.authenticate(&self.config.auth).await?;

        let matched = self.matched_topics().await?;
        tracing::info!(
            filter = %self.config.topic,
            topics = ?matched,
            "consumer group starting"
        );

        let cursors = self.open_cursors(&matched).await?;
        let (records_tx, mut records_rx) = mpsc::unbounded_channel::<RawRecord>();
        let (errors_tx, mut errors_rx) = mpsc::unbounded_channel::<PartitionFailure>();

        for (topic, partition, stream) in cursors {
            let handler = Arc::clone(&self.handler);
            let records = records_tx.clone();
            let errors = errors_tx.clone();
            tokio::spawn(partition_task(
                topic, partition, stream, handler, records, errors,
            ));
        }
        // Only the partition tasks hold senders now, so the channels close
        // when the last task exits.
        drop(records_tx);
        drop(errors_tx);

        let mut shutdown = self.shutdown.clone();
        let mut records_open = true;
        let mut errors_open = true;
        let mut records_consumed: u64 = 0;

        let reason = loop {
            tokio::select! {
                signal = shutdown.wait() => {
                    tracing::info!(signal = %signal, "consumer group interrupted");
                    break CloseReason::Interrupted;
                }
                failure = errors_rx.recv(), if errors_open => {
                    match failure {
                        Some(failure) => {
                            break CloseReason::PartitionError {
                                topic: failure.topic,
                                partition: failure.partition,
                                message: failure.message,
                            };
                        }
                        None => {
                            errors_open = false;
                            if !records_open {
                                break CloseReason::StreamsExhausted;
                            }
                        }
                    }
                }
                received = records_rx.recv(), if records_open => {
                    match received {
                        Some(record) => {
                            records_consumed += 1;
                            tracing::trace!(
                                topic = %record.topic,
                                partition = record.partition,
                                offset = record.offset,
                                "record consumed"
                            );
                        }
                        None => {
                            records_open = false;
                            if !errors_open {
                                break CloseReason::StreamsExhausted;
                            }
                        }
                    }
                }
            }
        };

        if let Err(error) = self.client.close().await {
            tracing::warn!(error = %error, "broker close failed");
        }
        tracing::info!(reason = %reason, records_consumed, "consumer group closed");

        Ok(GroupReport {
            reason,
            records_consumed,
        })
    }

    async fn matched_topics(&self) -> Result<Vec<String>> {
        let all = self.client.topics().await?;
        let matched: Vec<String> = all
            .into_iter()
            .filter(|name| name.contains(&self.config.topic))
            .collect();
        if matched.is_empty() {
            return Err(ConsumerError::NoMatchingTopic(self.config.topic.clone()));
        }
        Ok(matched)
    }

    async fn open_cursors(
        &self,
        topics: &[String],
    ) -> Result<Vec<(String, i32, Box<dyn PartitionStream>)>> {
        let mut cursors = Vec::new();
        for topic in topics {
            for partition in self.client.partitions(topic).await? {
                tracing::debug!(
                    topic = %topic,
                    partition,
                    state = %PartitionState::Idle,
                    "partition discovered"
                );
                let stream = self
                    .client
                    .consume(topic, partition, StartOffset::Oldest)
                    .await?;
                tracing::debug!(
                    topic = %topic,
                    partition,
                    state = %PartitionState::Connected,
                    "partition cursor opened"
                );
                cursors.push((topic.clone(), partition, stream));
            }
        }
        Ok(cursors)
    }
}

/// Reads one partition until its stream ends or fails.
///
/// Handler errors are logged and the record is dropped; the receipt is sent
/// either way so the coordinator's count reflects records read, not records
/// persisted. Send errors mean the coordinator already went away and are
/// ignored.
async fn partition_task(
    topic: String,
    partition: i32,
    mut stream: Box<dyn PartitionStream>,
    handler: Arc<dyn RecordHandler>,
    records: mpsc::UnboundedSender<RawRecord>,
    errors: mpsc::UnboundedSender<PartitionFailure>,
) {
    let mut state = PartitionState::Connected;
    loop {
        match stream.next().await {
            Ok(Some(record)) => {
                if state != PartitionState::Streaming {
                    state = PartitionState::Streaming;
                    tracing::debug!(topic = %topic, partition, state = %state, "first record received");
                }
                if let Err(error) = handler.handle(&record).await {
                    tracing::error!(
                        topic = %topic,
                        partition,
                        offset = record.offset,
                        error = %error,
                        "record dropped"
                    );
                }
                let _ = records.send(record);
            }
            Ok(None) => {
                state = PartitionState::Closed;
                tracing::debug!(topic = %topic, partition, state = %state, "partition stream ended");
                return;
            }
            Err(error) => {
                state = PartitionState::Error;
                tracing::error!(
                    topic = %topic,
                    partition,
                    state = %state,
                    error = %error,
                    "partition stream failed"
                );
                let _ = errors.send(PartitionFailure {
                    topic,
                    partition,
                    message: error.to_string(),
                });
                return;
            }
        }
    }
}
