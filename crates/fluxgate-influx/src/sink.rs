//! Sink seam.
//!
//! [`PointSink`] is what the pipeline and the HTTP handlers talk to;
//! [`InfluxSink`](crate::http::InfluxSink) is the production implementation
//! and [`MemorySink`] the in-process one used by tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use fluxgate_core::{Point, StatePoint, NODE_TAG, OWNER_TAG, THING_TAG};

use crate::error::{Result, SinkError};
use crate::query::PointQuery;

#[async_trait]
pub trait PointSink: Send + Sync {
    async fn write_point(&self, point: &Point) -> Result<()>;
    async fn query_points(&self, query: &PointQuery) -> Result<Vec<StatePoint>>;
}

/// Recording sink with injectable write failures.
#[derive(Default)]
pub struct MemorySink {
    points: Mutex<Vec<Point>>,
    fail_writes: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn written(&self) -> Vec<Point> {
        self.points.lock().await.clone()
    }
}

#[async_trait]
impl PointSink for MemorySink {
    async fn write_point(&self, point: &Point) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SinkError::Persistence {
                status: 500,
                body: "injected write failure".to_string(),
            });
        }
        self.points.lock().await.push(point.clone());
        Ok(())
    }

    async fn query_points(&self, query: &PointQuery) -> Result<Vec<StatePoint>> {
        let points = self.points.lock().await;
        Ok(points
            .iter()
            .filter(|point| query.matches(point))
            .map(to_state_point)
            .collect())
    }
}

/// Read-side projection of a stored point. Non-identity tags fold into
/// `attributes` alongside the fields, which is exactly what a `SELECT *`
/// against the store returns.
fn to_state_point(point: &Point) -> StatePoint {
    let mut attributes: BTreeMap<String, String> = point.fields().clone();
    for (key, value) in point.tags() {
        if !matches!(key.as_str(), OWNER_TAG | THING_TAG | NODE_TAG) {
            attributes.insert(key.clone(), value.clone());
        }
    }
    StatePoint {
        owner: point.tag(OWNER_TAG).unwrap_or_default().to_string(),
        thing: point.tag(THING_TAG).unwrap_or_default().to_string(),
        node: point.tag(NODE_TAG).unwrap_or_default().to_string(),
        attributes,
        date_time: point.timestamp(),
    }
}
