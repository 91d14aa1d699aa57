//! Broker client seam.
//!
//! The broker's wire protocol stays behind these traits; the group only
//! needs topic discovery, per-partition cursors and a way to tear every
//! connection down at once. [`crate::memory::MemoryBroker`] implements the
//! seam in-process; a real broker integration plugs in the same way.

use async_trait::async_trait;
use bytes::Bytes;

use crate::auth::BrokerAuth;
use crate::error::Result;

/// One consumed record, exactly as the broker delivered it.
///
/// Owned by its partition task for the duration of one decode cycle, then
/// moved to the coordinator as the delivery receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Bytes>,
    pub value: Bytes,
}

/// Where a freshly opened cursor starts reading.
///
/// The group always starts from `Oldest`: no offsets are persisted, so a
/// restart re-reads everything the broker still retains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOffset {
    /// The oldest offset the broker retains for the partition.
    Oldest,
    /// Only records produced after the cursor was opened.
    Newest,
}

/// A blocking read cursor over one partition.
#[async_trait]
pub trait PartitionStream: Send {
    /// Wait for the next record. `Ok(None)` means the stream ended cleanly;
    /// an error means the broker connection failed or was closed.
    async fn next(&mut self) -> Result<Option<RawRecord>>;
}

/// Client-side view of the partitioned broker.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Negotiate authentication. Called once, before any cursor is opened.
    async fn authenticate(&self, auth: &BrokerAuth) -> Result<()>;

    /// List the topics available on the broker.
    async fn topics(&self) -> Result<Vec<String>>;

    /// List the partition ids of one topic.
    async fn partitions(&self, topic: &str) -> Result<Vec<i32>>;

    /// Open a read cursor over one partition.
    async fn consume(
        &self,
        topic: &str,
        partition: i32,
        start: StartOffset,
    ) -> Result<Box<dyn PartitionStream>>;

    /// Release every broker connection. Open cursors observe the closed
    /// connection as a read error.
    async fn close(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_record_clone_and_eq() {
        let record = RawRecord {
            topic: "owner-events".to_string(),
            partition: 0,
            offset: 7,
            key: Some(Bytes::from_static(b"k")),
            value: Bytes::from_static(b"v"),
        };
        assert_eq!(record.clone(), record);
    }

    #[test]
    fn test_start_offset_is_copy() {
        let start = StartOffset::Oldest;
        let copied = start;
        assert_eq!(start, copied);
        assert_ne!(StartOffset::Oldest, StartOffset::Newest);
    }
}
