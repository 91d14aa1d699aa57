//! Point read/write service behind the HTTP surface.
//!
//! Validates what the handlers pass in and delegates to the sink. Query
//! validation rejects ranges without both bounds and identity filters that
//! constrain nothing; write validation is the point construction itself.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use fluxgate_core::{Point, StatePoint, WILDCARD};
use fluxgate_influx::{PointQuery, PointSink, SinkError};
use thiserror::Error;

use crate::period::Period;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request failed validation; served as a 400 with this message.
    #[error("{0}")]
    Invalid(String),

    /// The sink rejected the operation; served as a 500.
    #[error(transparent)]
    Persistence(#[from] SinkError),
}

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Read/write entry point shared by the HTTP handlers.
#[derive(Clone)]
pub struct PointService {
    sink: Arc<dyn PointSink>,
}

impl PointService {
    pub fn new(sink: Arc<dyn PointSink>) -> Self {
        Self { sink }
    }

    /// Query persisted points for one identity filter over a period.
    pub async fn query_points(
        &self,
        owner: &str,
        thing: &str,
        node: &str,
        period: Period,
    ) -> Result<Vec<StatePoint>> {
        let (start, end) = match (period.start, period.end) {
            (Some(start), Some(end)) => (start, end),
            _ => {
                return Err(ServiceError::Invalid(
                    "The `startDateTime` and `endDateTime` parameters are required for \
                     querying the database"
                        .to_string(),
                ))
            }
        };

        let all_empty = owner.is_empty() && thing.is_empty() && node.is_empty();
        let all_wildcard = owner == WILDCARD && thing == WILDCARD && node == WILDCARD;
        if all_empty || all_wildcard {
            return Err(ServiceError::Invalid(
                "At least one of the 'owner', 'thing' or 'node' tags must be provided for \
                 querying the database"
                    .to_string(),
            ));
        }

        let query = PointQuery {
            owner: owner.to_string(),
            thing: thing.to_string(),
            node: node.to_string(),
            start: Some(start),
            end: Some(end),
        };
        Ok(self.sink.query_points(&query).await?)
    }

    /// Validate and persist one point.
    pub async fn create_point(
        &self,
        timestamp: DateTime<Utc>,
        tags: BTreeMap<String, String>,
        fields: BTreeMap<String, String>,
    ) -> Result<Point> {
        let point = Point::new(timestamp, tags, fields)
            .map_err(|e| ServiceError::Invalid(e.to_string()))?;
        self.sink.write_point(&point).await?;
        Ok(point)
    }
}
