//! HTTP surface: liveness, range queries and manual point writes.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use fluxgate_consumer::ShutdownHandle;
use fluxgate_core::record::DATE_TIME_FIELD;
use fluxgate_core::{StatePoint, NODE_TAG, OWNER_TAG, THING_TAG};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use crate::period;
use crate::service::{PointService, ServiceError};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: PointService,
}

/// Create the router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/owner/:owner/thing/:thing/node/:node",
            get(query_points).post(create_point),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the router until the shutdown handle fires.
pub async fn serve(
    router: Router,
    port: u16,
    mut shutdown: ShutdownHandle,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "HTTP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait().await;
        })
        .await?;
    Ok(())
}

// API Handlers

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RangeParams {
    time: Option<String>,
    start_date_time: Option<String>,
    end_date_time: Option<String>,
}

async fn health_check() -> &'static str {
    "fluxgate"
}

/// Query persisted points for one identity path over a time range.
async fn query_points(
    State(state): State<AppState>,
    Path((owner, thing, node)): Path<(String, String, String)>,
    Query(params): Query<RangeParams>,
) -> Result<Json<Vec<StatePoint>>, ServiceError> {
    let period = period::parse(
        params.time.as_deref(),
        params.start_date_time.as_deref(),
        params.end_date_time.as_deref(),
    )
    .map_err(|e| ServiceError::Invalid(format!("Error parsing time interval query params: {e}")))?;

    let points = state
        .service
        .query_points(&owner, &thing, &node, period)
        .await?;
    Ok(Json(points))
}

/// Persist one point with tags taken from the identity path.
async fn create_point(
    State(state): State<AppState>,
    Path((owner, thing, node)): Path<(String, String, String)>,
    Json(mut body): Json<BTreeMap<String, String>>,
) -> Result<(StatusCode, &'static str), ServiceError> {
    let timestamp = extract_date_time(&mut body)?;

    let mut tags = BTreeMap::new();
    tags.insert(OWNER_TAG.to_string(), owner);
    tags.insert(THING_TAG.to_string(), thing);
    tags.insert(NODE_TAG.to_string(), node);

    state.service.create_point(timestamp, tags, body).await?;
    Ok((StatusCode::CREATED, "State point created"))
}

/// Pull the mandatory `dateTime` attribute out of the request body.
fn extract_date_time(body: &mut BTreeMap<String, String>) -> Result<DateTime<Utc>, ServiceError> {
    let raw = body.remove(DATE_TIME_FIELD).ok_or_else(|| {
        ServiceError::Invalid(
            "The attribute `dateTime` must be provided in the request body. This is the \
             date and time that the data was collected."
                .to_string(),
        )
    })?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| {
            ServiceError::Invalid(
                "You must provide a `dateTime` field in the RFC3339 format \
                 (Ex: 2020-05-24T14:27:33Z)"
                    .to_string(),
            )
        })
}

// Error handling

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ServiceError::Invalid(message) => (StatusCode::BAD_REQUEST, message),
            ServiceError::Persistence(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };
        (status, message).into_response()
    }
}
