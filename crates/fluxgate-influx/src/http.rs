//! InfluxDB 1.x HTTP sink.
//!
//! Writes go to `POST {addr}/write?db={database}&precision=s` as line
//! protocol; queries go to `GET {addr}/query?db={database}&q=...` and come
//! back as the JSON results/series shape parsed in [`crate::query`]. Basic
//! auth is attached when a username is configured.

use std::time::Duration;

use async_trait::async_trait;

use fluxgate_core::{Point, StatePoint};

use crate::error::{Result, SinkError};
use crate::line;
use crate::query::{rows_to_points, PointQuery, QueryResponse};
use crate::sink::PointSink;

#[derive(Debug, Clone)]
pub struct InfluxConfig {
    /// Base URL of the store, e.g. `http://localhost:8086`.
    pub addr: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

pub struct InfluxSink {
    config: InfluxConfig,
    http_client: reqwest::Client,
}

impl InfluxSink {
    pub fn new(config: InfluxConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");
        Self::with_client(config, http_client)
    }

    /// Create with an injected reqwest client (useful for testing).
    pub fn with_client(config: InfluxConfig, http_client: reqwest::Client) -> Self {
        let mut config = config;
        config.addr = config.addr.trim_end_matches('/').to_string();
        Self {
            config,
            http_client,
        }
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.username {
            Some(username) => request.basic_auth(username, self.config.password.as_deref()),
            None => request,
        }
    }

    async fn post_line(&self, line: String) -> Result<()> {
        let url = format!("{}/write", self.config.addr);
        let request = self
            .http_client
            .post(&url)
            .query(&[
                ("db", self.config.database.as_str()),
                ("precision", "s"),
            ])
            .body(line);

        let response = self.authorized(request).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Persistence { status, body });
        }
        Ok(())
    }

    async fn run_query(&self, statement: &str) -> Result<Vec<StatePoint>> {
        let url = format!("{}/query", self.config.addr);
        let request = self
            .http_client
            .get(&url)
            .query(&[("db", self.config.database.as_str()), ("q", statement)]);

        let response = self.authorized(request).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Persistence { status, body });
        }
        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| SinkError::Malformed(format!("unreadable store response: {e}")))?;
        rows_to_points(body)
    }
}

#[async_trait]
impl PointSink for InfluxSink {
    async fn write_point(&self, point: &Point) -> Result<()> {
        self.post_line(line::render(point)).await?;
        tracing::debug!(
            database = %self.config.database,
            timestamp = %point.timestamp(),
            "state point written"
        );
        Ok(())
    }

    async fn query_points(&self, query: &PointQuery) -> Result<Vec<StatePoint>> {
        let statement = query.statement();
        tracing::debug!(database = %self.config.database, statement = %statement, "querying state points");
        self.run_query(&statement).await
    }
}
