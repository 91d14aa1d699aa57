pub mod cache;
pub mod client;
pub mod decoder;
pub mod error;
pub mod wire;

pub use cache::SchemaCache;
pub use client::{RegistryClient, ResolvedSchema};
pub use decoder::RecordDecoder;
pub use error::{Result, SchemaError};
