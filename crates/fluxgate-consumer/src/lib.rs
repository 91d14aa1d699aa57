pub mod auth;
pub mod broker;
pub mod error;
pub mod group;
#[cfg(feature = "kafka")]
pub mod kafka;
pub mod memory;
pub mod shutdown;

pub use auth::{BrokerAuth, TicketAuth};
pub use broker::{BrokerClient, PartitionStream, RawRecord, StartOffset};
pub use error::{ConsumerError, Result};
pub use group::{CloseReason, ConsumerGroup, GroupConfig, GroupReport, PartitionState, RecordHandler};
#[cfg(feature = "kafka")]
pub use kafka::KafkaBroker;
pub use memory::MemoryBroker;
pub use shutdown::{os_signal, ShutdownHandle, ShutdownSignal};
