//! In-memory broker.
//!
//! Backs the consumer group in tests and local runs. Partitions hold a
//! replayable item log, so a cursor opened at [`StartOffset::Oldest`] sees
//! everything ever pushed; live pushes wake waiting cursors through a watch
//! revision counter. `close()` flips a flag every open cursor observes as a
//! connection error, which is exactly how the group expects teardown to look.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{watch, Mutex};

use crate::auth::BrokerAuth;
use crate::broker::{BrokerClient, PartitionStream, RawRecord, StartOffset};
use crate::error::{ConsumerError, Result};

#[derive(Debug, Clone)]
enum StreamItem {
    Record(RawRecord),
    Fail(String),
    End,
}

type PartitionMap = HashMap<(String, i32), Vec<StreamItem>>;

pub struct MemoryBroker {
    partitions: Arc<Mutex<PartitionMap>>,
    revision: watch::Sender<u64>,
    closed: watch::Sender<bool>,
    expected_auth: Option<BrokerAuth>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        let (closed, _) = watch::channel(false);
        Self {
            partitions: Arc::new(Mutex::new(HashMap::new())),
            revision,
            closed,
            expected_auth: None,
        }
    }

    /// Make `authenticate` reject anything but the given credentials.
    pub fn require_auth(mut self, auth: BrokerAuth) -> Self {
        self.expected_auth = Some(auth);
        self
    }

    /// Create an empty partition.
    pub async fn add_partition(&self, topic: &str, partition: i32) {
        self.partitions
            .lock()
            .await
            .entry((topic.to_string(), partition))
            .or_default();
        self.bump();
    }

    /// Append a record to a partition, wake waiting cursors.
    pub async fn push(&self, topic: &str, partition: i32, key: Option<Bytes>, value: Bytes) {
        let mut partitions = self.partitions.lock().await;
        let log = partitions
            .entry((topic.to_string(), partition))
            .or_default();
        let offset = log
            .iter()
            .filter(|item| matches!(item, StreamItem::Record(_)))
            .count() as i64;
        log.push(StreamItem::Record(RawRecord {
            topic: topic.to_string(),
            partition,
            offset,
            key,
            value,
        }));
        drop(partitions);
        self.bump();
    }

    /// Inject a broker error: the next read past this point fails.
    pub async fn fail(&self, topic: &str, partition: i32, message: &str) {
        let mut partitions = self.partitions.lock().await;
        partitions
            .entry((topic.to_string(), partition))
            .or_default()
            .push(StreamItem::Fail(message.to_string()));
        drop(partitions);
        self.bump();
    }

    /// Mark a partition as cleanly ended.
    pub async fn end(&self, topic: &str, partition: i32) {
        let mut partitions = self.partitions.lock().await;
        partitions
            .entry((topic.to_string(), partition))
            .or_default()
            .push(StreamItem::End);
        drop(partitions);
        self.bump();
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrokerClient for MemoryBroker {
    async fn authenticate(&self, auth: &BrokerAuth) -> Result<()> {
        match &self.expected_auth {
            None => Ok(()),
            Some(expected) if expected == auth => Ok(()),
            Some(_) => Err(ConsumerError::AuthenticationFailed(
                "broker rejected the offered credentials".to_string(),
            )),
        }
    }

    async fn topics(&self) -> Result<Vec<String>> {
        let partitions = self.partitions.lock().await;
        let mut names: Vec<String> = partitions.keys().map(|(topic, _)| topic.clone()).collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    async fn partitions(&self, topic: &str) -> Result<Vec<i32>> {
        let partitions = self.partitions.lock().await;
        let mut ids: Vec<i32> = partitions
            .keys()
            .filter(|(name, _)| name == topic)
            .map(|(_, id)| *id)
            .collect();
        if ids.is_empty() {
            return Err(ConsumerError::Broker(format!("unknown topic '{topic}'")));
        }
        ids.sort_unstable();
        Ok(ids)
    }

    async fn consume(
        &self,
        topic: &str,
        partition: i32,
        start: StartOffset,
    ) -> Result<Box<dyn PartitionStream>> {
        let partitions = self.partitions.lock().await;
        let key = (topic.to_string(), partition);
        let log = partitions.get(&key).ok_or_else(|| {
            ConsumerError::Broker(format!("unknown partition {topic}/{partition}"))
        })?;
        let next_index = match start {
            StartOffset::Oldest => 0,
            StartOffset::Newest => log.len(),
        };
        Ok(Box::new(MemoryStream {
            key,
            next_index,
            partitions: Arc::clone(&self.partitions),
            revision: self.revision.subscribe(),
            closed: self.closed.subscribe(),
        }))
    }

    async fn close(&self) -> Result<()> {
        self.closed.send_modify(|flag| *flag = true);
        Ok(())
    }
}

struct MemoryStream {
    key: (String, i32),
    next_index: usize,
    partitions: Arc<Mutex<PartitionMap>>,
    revision: watch::Receiver<u64>,
    closed: watch::Receiver<bool>,
}

#[async_trait]
impl PartitionStream for MemoryStream {
    async fn next(&mut self) -> Result<Option<RawRecord>> {
        loop {
            if *self.closed.borrow() {
                return Err(ConsumerError::Broker("broker connection closed".to_string()));
            }

            {
                let partitions = self.partitions.lock().await;
                if let Some(log) = partitions.get(&self.key) {
                    if let Some(item) = log.get(self.next_index) {
                        self.next_index += 1;
                        match item.clone() {
                            StreamItem::Record(record) => return Ok(Some(record)),
                            StreamItem::Fail(message) => return Err(ConsumerError::Broker(message)),
                            StreamItem::End => return Ok(None),
                        }
                    }
                }
            }

            tokio::select! {
                changed = self.revision.changed() => {
                    if changed.is_err() {
                        // Broker dropped entirely; treat as a clean end.
                        return Ok(None);
                    }
                }
                _ = self.closed.changed() => {}
            }
        }
    }
}
