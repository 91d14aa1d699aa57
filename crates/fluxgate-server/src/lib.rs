//! Fluxgate bridge server
//!
//! Consumes state records from a broker topic, maps them to tagged points and
//! persists them in a time-series store, while exposing the same points over a
//! small HTTP/JSON API.

pub mod api;
pub mod config;
pub mod period;
pub mod pipeline;
pub mod service;

pub use api::{create_router, serve, AppState};
pub use config::Config;
pub use pipeline::BridgePipeline;
pub use service::{PointService, ServiceError};
