//! HTTP API: device registration for the scan agent, the model catalog and
//! compatibility scoring.
//!
//! The engine is synchronous and cheap, so handlers call it inline; only the
//! catalog (a blocking HTTP client) is moved onto the blocking pool.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use checkmate_core::catalog::{FallbackCatalog, HuggingFaceCatalog, ModelCatalogProvider};
use checkmate_core::config::{ServerSettings, Settings};
use checkmate_core::engine;
use checkmate_core::error::{CheckmateError, ModelError, ProfileError};
use checkmate_core::hardware::{HardwareInput, HardwareProfile};
use checkmate_core::models::{ModelDescriptor, RequestContext};
use checkmate_core::registry::{DeviceStore, InMemoryDeviceStore, StoredDevice};
use checkmate_core::report::DeviceReport;
use colored::*;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

const PURGE_INTERVAL: Duration = Duration::from_secs(60);

pub struct AppState {
    pub store: Arc<dyn DeviceStore>,
    pub catalog: Arc<dyn ModelCatalogProvider + Send + Sync>,
    pub default_context: u32,
    pub default_task: String,
}

pub type SharedState = Arc<AppState>;

// ────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────

/// Every failure is returned as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Invalid input is the caller's fault (422); anything else is ours.
impl From<CheckmateError> for ApiError {
    fn from(err: CheckmateError) -> Self {
        match &err {
            CheckmateError::Profile(_) | CheckmateError::Model(_) => {
                ApiError::unprocessable(err.to_string())
            }
            _ => ApiError::internal(err.to_string()),
        }
    }
}

impl From<ProfileError> for ApiError {
    fn from(err: ProfileError) -> Self {
        CheckmateError::from(err).into()
    }
}

impl From<ModelError> for ApiError {
    fn from(err: ModelError) -> Self {
        CheckmateError::from(err).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::new(rejection.status(), rejection.body_text())
    }
}

// ────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/device/register", post(register_device))
        .route("/api/device/:id", get(get_device))
        .route("/api/models", get(list_models))
        .route("/api/compatibility", post(compatibility))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn register_device(
    State(state): State<SharedState>,
    payload: Result<Json<DeviceReport>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(report) = payload?;
    if report.device_id.trim().is_empty() {
        return Err(ApiError::unprocessable("device_id must not be empty"));
    }

    let profile = report.to_hardware_input().into_profile()?;
    let device_id = report.device_id.clone();
    state
        .store
        .put(StoredDevice::received_now(profile.clone(), report));

    Ok(Json(json!({
        "status": "registered",
        "device_id": device_id,
        "profile": profile,
    })))
}

async fn get_device(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<StoredDevice>, ApiError> {
    state
        .store
        .get(&id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("no device registered with id '{id}'")))
}

#[derive(Debug, Default, Deserialize)]
pub struct ModelQuery {
    #[serde(default)]
    pub task: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}

/// Run the (possibly blocking) catalog off the async workers.
async fn fetch_models(
    state: &SharedState,
    task: Option<String>,
    search: Option<String>,
) -> Result<Vec<ModelDescriptor>, ApiError> {
    let catalog = Arc::clone(&state.catalog);
    let task = task.unwrap_or_else(|| state.default_task.clone());
    let search = search.unwrap_or_default();
    tokio::task::spawn_blocking(move || catalog.fetch_models(&task, &search))
        .await
        .map_err(|e| ApiError::internal(format!("catalog task failed: {e}")))
}

async fn list_models(
    State(state): State<SharedState>,
    Query(query): Query<ModelQuery>,
) -> Result<Json<Value>, ApiError> {
    let models = fetch_models(&state, query.task, query.search).await?;
    Ok(Json(json!({ "models": models })))
}

/// Body of `POST /api/compatibility`. Exactly one of `hardware` and
/// `device_id` must be given.
#[derive(Debug, Default, Deserialize)]
pub struct CompatibilityRequest {
    #[serde(default)]
    pub hardware: Option<HardwareInput>,
    #[serde(default, alias = "deviceId")]
    pub device_id: Option<String>,
    #[serde(default, alias = "contextTokens")]
    pub context_tokens: Option<u32>,
    #[serde(default)]
    pub task: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}

fn resolve_profile(
    state: &AppState,
    request: &CompatibilityRequest,
) -> Result<HardwareProfile, ApiError> {
    match (&request.hardware, &request.device_id) {
        (Some(input), None) => Ok(input.clone().into_profile()?),
        (None, Some(id)) => state
            .store
            .get(id)
            .map(|d| d.profile)
            .ok_or_else(|| ApiError::not_found(format!("no device registered with id '{id}'"))),
        _ => Err(ApiError::bad_request(
            "provide exactly one of 'hardware' or 'device_id'",
        )),
    }
}

async fn compatibility(
    State(state): State<SharedState>,
    payload: Result<Json<CompatibilityRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload?;
    let profile = resolve_profile(&state, &request)?;
    let ctx = RequestContext::new(request.context_tokens.unwrap_or(state.default_context))?;

    let models = fetch_models(&state, request.task, request.search).await?;
    let results = engine::classify_all(&profile, &models, ctx);
    debug!(results = results.len(), "compatibility request served");

    Ok(Json(json!({
        "hardware": profile,
        "context_tokens": ctx.tokens(),
        "results": results,
    })))
}

// ────────────────────────────────────────────────────────────────────
// Server loop
// ────────────────────────────────────────────────────────────────────

fn spawn_purge_task(store: Arc<dyn DeviceStore>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            let removed = store.purge_expired();
            if removed > 0 {
                info!(removed, "expired devices purged");
            }
        }
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

pub fn run(server: &ServerSettings, settings: &Settings) -> Result<()> {
    let state: SharedState = Arc::new(AppState {
        store: Arc::new(InMemoryDeviceStore::new(Duration::from_secs(
            server.device_ttl_secs,
        ))),
        catalog: Arc::new(FallbackCatalog::new(HuggingFaceCatalog::from_settings(
            &settings.catalog,
        ))),
        default_context: settings.engine.default_context_tokens,
        default_task: settings.catalog.default_task.clone(),
    });
    let bind_addr = format!("{}:{}", server.host, server.port);

    let runtime = tokio::runtime::Runtime::new().context("failed to create tokio runtime")?;

    runtime.block_on(async move {
        let purge = spawn_purge_task(Arc::clone(&state.store));
        let app = router(state);

        let listener = tokio::net::TcpListener::bind(&bind_addr)
            .await
            .with_context(|| format!("failed to bind {bind_addr}"))?;
        info!(addr = %bind_addr, "server listening");

        println!();
        println!(
            "{}",
            format!("Server listening on http://{}", bind_addr)
                .green()
                .bold()
        );
        println!();
        println!("{}", "Endpoints:".cyan());
        println!("  GET  /health                - Health check");
        println!("  POST /api/device/register   - Store an agent report");
        println!("  GET  /api/device/:id        - Fetch a stored device");
        println!("  GET  /api/models            - Model catalog");
        println!("  POST /api/compatibility     - Rate models for a profile");
        println!();
        println!("{}", "Press Ctrl+C to stop".dimmed());

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("server error")?;

        purge.abort();
        println!();
        println!("{}", "Server stopped".yellow());
        Ok(())
    })
}
