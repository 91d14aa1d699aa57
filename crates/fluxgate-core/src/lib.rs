pub mod error;
pub mod identity;
pub mod mapper;
pub mod point;
pub mod record;
pub mod timestamp;

pub use error::{MapError, ValidationError};
pub use identity::IdentityKey;
pub use mapper::map_record;
pub use point::{Point, StatePoint, MEASUREMENT, NODE_TAG, OWNER_TAG, SCHEMA_TAG, THING_TAG, WILDCARD};
pub use record::DecodedRecord;
