//! Range query model, statement builder and response parser.
//!
//! A [`PointQuery`] carries optional inclusive time bounds and three tag
//! filters. A filter whose value is empty or the `+` wildcard matches
//! anything and is omitted from the generated statement; the same rule backs
//! [`PointQuery::matches`], which the in-memory sink uses so both sinks agree
//! on filter semantics.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;

use fluxgate_core::{Point, StatePoint, MEASUREMENT, NODE_TAG, OWNER_TAG, THING_TAG, WILDCARD};

use crate::error::{Result, SinkError};

/// A range query over persisted state points.
#[derive(Debug, Clone, Default)]
pub struct PointQuery {
    pub owner: String,
    pub thing: String,
    pub node: String,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl PointQuery {
    /// Build the `SELECT` statement for this query.
    pub fn statement(&self) -> String {
        let mut conditions: Vec<String> = Vec::new();
        if let Some(start) = self.start {
            conditions.push(format!(
                "time >= '{}'",
                start.to_rfc3339_opts(SecondsFormat::Secs, true)
            ));
        }
        if let Some(end) = self.end {
            conditions.push(format!(
                "time <= '{}'",
                end.to_rfc3339_opts(SecondsFormat::Secs, true)
            ));
        }
        for (tag, value) in self.tag_filters() {
            conditions.push(format!("{} = '{}'", tag, value.replace('\'', "\\'")));
        }

        let mut statement = format!("SELECT * FROM {MEASUREMENT}");
        if !conditions.is_empty() {
            statement.push_str(" WHERE ");
            statement.push_str(&conditions.join(" AND "));
        }
        statement
    }

    /// The tag filters that actually constrain the query.
    fn tag_filters(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        [
            (OWNER_TAG, self.owner.as_str()),
            (THING_TAG, self.thing.as_str()),
            (NODE_TAG, self.node.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| is_constraining(value))
    }

    /// Whether a stored point satisfies this query's bounds and filters.
    pub fn matches(&self, point: &Point) -> bool {
        if let Some(start) = self.start {
            if point.timestamp() < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if point.timestamp() > end {
                return false;
            }
        }
        self.tag_filters()
            .all(|(tag, value)| point.tag(tag) == Some(value))
    }
}

fn is_constraining(value: &str) -> bool {
    !value.is_empty() && value != WILDCARD
}

// ---------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct QueryResponse {
    #[serde(default)]
    results: Vec<QueryResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    series: Vec<Series>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Series {
    columns: Vec<String>,
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Map a query response onto [`StatePoint`]s.
///
/// Only the first series of the first result is read, matching how the store
/// answers a single-statement query. `owner`, `thing`, `node` and `time` are
/// lifted out by column name; every remaining column lands in `attributes`,
/// with null cells skipped and scalar cells stringified.
pub(crate) fn rows_to_points(response: QueryResponse) -> Result<Vec<StatePoint>> {
    if let Some(error) = response.error {
        return Err(SinkError::Query(error));
    }
    let result = match response.results.into_iter().next() {
        Some(result) => result,
        None => return Ok(Vec::new()),
    };
    if let Some(error) = result.error {
        return Err(SinkError::Query(error));
    }
    let series = match result.series.into_iter().next() {
        Some(series) => series,
        None => return Ok(Vec::new()),
    };

    let time_idx = column_index(&series.columns, "time")?;
    let owner_idx = column_index(&series.columns, OWNER_TAG)?;
    let thing_idx = column_index(&series.columns, THING_TAG)?;
    let node_idx = column_index(&series.columns, NODE_TAG)?;

    let mut points = Vec::with_capacity(series.values.len());
    for row in &series.values {
        let time_text = row
            .get(time_idx)
            .and_then(|value| value.as_str())
            .ok_or_else(|| SinkError::Malformed("row is missing its time column".to_string()))?;
        let date_time = DateTime::parse_from_rfc3339(time_text)
            .map_err(|e| SinkError::Malformed(format!("unparseable row time '{time_text}': {e}")))?
            .with_timezone(&Utc);

        let mut attributes = BTreeMap::new();
        for (idx, column) in series.columns.iter().enumerate() {
            if idx == time_idx || idx == owner_idx || idx == thing_idx || idx == node_idx {
                continue;
            }
            if let Some(text) = row.get(idx).and_then(scalar_text) {
                attributes.insert(column.clone(), text);
            }
        }

        points.push(StatePoint {
            owner: row.get(owner_idx).and_then(scalar_text).unwrap_or_default(),
            thing: row.get(thing_idx).and_then(scalar_text).unwrap_or_default(),
            node: row.get(node_idx).and_then(scalar_text).unwrap_or_default(),
            attributes,
            date_time,
        });
    }
    Ok(points)
}

fn column_index(columns: &[String], name: &str) -> Result<usize> {
    columns
        .iter()
        .position(|column| column == name)
        .ok_or_else(|| {
            SinkError::Malformed(format!("response series is missing the '{name}' column"))
        })
}

fn scalar_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(text) => Some(text.clone()),
        serde_json::Value::Bool(flag) => Some(flag.to_string()),
        serde_json::Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
