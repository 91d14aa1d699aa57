pub mod error;
pub mod http;
pub mod line;
pub mod query;
pub mod sink;

pub use error::{Result, SinkError};
pub use http::{InfluxConfig, InfluxSink};
pub use query::PointQuery;
pub use sink::{MemorySink, PointSink};
