//! HTTP client for the schema registry.
//!
//! Speaks the Confluent-compatible REST surface: schema lookup by id
//! (`/schemas/ids/{id}`) and latest-version lookup by subject
//! (`/subjects/{subject}/versions/latest/schema`). Resolved schemas are
//! parsed once and cached for the process lifetime.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::cache::SchemaCache;
use crate::error::{Result, SchemaError};

/// A schema fetched from the registry, parsed and ready for decoding.
#[derive(Debug)]
pub struct ResolvedSchema {
    pub id: u32,
    /// Schema definition exactly as the registry returned it.
    pub raw: String,
    pub parsed: apache_avro::Schema,
    /// Declared record name, absent for primitive and anonymous schemas.
    pub name: Option<String>,
}

impl ResolvedSchema {
    pub fn parse(id: u32, definition: &str) -> Result<Self> {
        let parsed = apache_avro::Schema::parse_str(definition)
            .map_err(|e| SchemaError::Avro(format!("schema {id} does not parse: {e}")))?;
        let name = serde_json::from_str::<serde_json::Value>(definition)
            .ok()
            .and_then(|value| value.get("name")?.as_str().map(str::to_string));
        Ok(Self {
            id,
            raw: definition.to_string(),
            parsed,
            name,
        })
    }
}

/// Envelope of `GET /schemas/ids/{id}`.
#[derive(Debug, Deserialize)]
struct SchemaByIdResponse {
    schema: String,
}

/// Envelope of `GET /subjects/{subject}/versions/latest/schema`.
#[derive(Debug, Deserialize)]
struct LatestVersionResponse {
    id: u32,
}

/// HTTP client for schema registry lookups.
pub struct RegistryClient {
    base_url: String,
    http_client: reqwest::Client,
    cache: Arc<SchemaCache>,
}

impl RegistryClient {
    /// Create a new registry client.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the registry (e.g. "http://localhost:8081")
    pub fn new(base_url: impl Into<String>) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
            cache: Arc::new(SchemaCache::new()),
        }
    }

    /// Resolve a schema by id, consulting the process-wide cache first.
    pub async fn schema_by_id(&self, id: u32) -> Result<Arc<ResolvedSchema>> {
        if let Some(cached) = self.cache.get(id).await {
            return Ok(cached);
        }
        let fetched = self.fetch_schema(id).await?;
        Ok(self.cache.insert(Arc::new(fetched)).await)
    }

    /// Look up the id of the latest schema version registered for a subject.
    pub async fn latest_schema_id(&self, subject: &str) -> Result<u32> {
        let url = format!(
            "{}/subjects/{}/versions/latest/schema",
            self.base_url, subject
        );

        let response = self.http_client.get(&url).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SchemaError::Unavailable { status, body });
        }

        let envelope: LatestVersionResponse = response
            .json()
            .await
            .map_err(|e| SchemaError::Malformed(format!("latest-version envelope: {e}")))?;

        tracing::debug!(
            subject = %subject,
            schema_id = envelope.id,
            "Resolved latest schema id"
        );

        Ok(envelope.id)
    }

    pub fn cache(&self) -> Arc<SchemaCache> {
        Arc::clone(&self.cache)
    }

    async fn fetch_schema(&self, id: u32) -> Result<ResolvedSchema> {
        let url = format!("{}/schemas/ids/{}", self.base_url, id);

        let response = self.http_client.get(&url).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SchemaError::Unavailable { status, body });
        }

        let envelope: SchemaByIdResponse = response
            .json()
            .await
            .map_err(|e| SchemaError::Malformed(format!("schema envelope: {e}")))?;

        let resolved = ResolvedSchema::parse(id, &envelope.schema)?;

        tracing::debug!(
            schema_id = id,
            schema_name = resolved.name.as_deref().unwrap_or(""),
            "Schema fetched from registry"
        );

        Ok(resolved)
    }
}
