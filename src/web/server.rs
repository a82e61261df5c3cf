use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::Config;
use crate::registry::engine::RegistryEngine;
use crate::registry::ingest;
use crate::registry::types::{NewFault, NewVehicle};
use crate::scoring;

/// JSON API server - the garage frontend talks to this
pub struct WebServer {
    engine: Arc<RegistryEngine>,
    config: Arc<Config>,
}

#[derive(Clone)]
struct AppState {
    engine: Arc<RegistryEngine>,
}

#[derive(Deserialize)]
struct BrandQuery {
    q: Option<String>,
}

#[derive(Deserialize)]
struct ModelsQuery {
    brand: String,
}

#[derive(Deserialize)]
struct JournalQuery {
    query: Option<String>,
    event: Option<String>,
    limit: Option<usize>,
}

impl WebServer {
    pub fn new(engine: Arc<RegistryEngine>, config: Arc<Config>) -> Self {
        Self { engine, config }
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        let app = router(self.engine.clone());

        let addr = format!("{}:{}", self.config.listen.address, self.config.listen.port);
        info!("🚗 API listening on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await?;
        Ok(())
    }
}

/// Build the API router. Separate from `WebServer` so tests can mount it
/// on an ephemeral port.
pub fn router(engine: Arc<RegistryEngine>) -> Router {
    let state = AppState { engine };

    Router::new()
        .route("/api/health", get(api_health))
        .route("/api/catalog/brands", get(api_brands))
        .route("/api/catalog/models", get(api_models))
        .route("/api/categories", get(api_categories))
        .route("/api/vehicles", get(api_list_vehicles).post(api_add_vehicle))
        .route("/api/vehicles/:id", get(api_get_vehicle).delete(api_delete_vehicle))
        .route("/api/vehicles/:id/faults", post(api_report_fault))
        .route("/api/vehicles/:id/category-scores", get(api_category_scores))
        .route("/api/faults/:id/verify", post(api_verify_fault))
        .route("/api/reliability", get(api_reliability))
        .route("/api/reliability/preview", post(api_reliability_preview))
        .route("/api/journal", get(api_journal))
        .route("/api/stats", get(api_stats))
        // The frontend is a separate browser app on another origin
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn not_found(what: &str, id: u64) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": format!("{} {} not found", what, id) })),
    )
}

async fn api_health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Brand autocomplete: case-insensitive prefix search
async fn api_brands(
    State(state): State<AppState>,
    Query(params): Query<BrandQuery>,
) -> Json<Value> {
    let brands = state
        .engine
        .catalog
        .search_brands(params.q.as_deref().unwrap_or(""));
    Json(json!({ "brands": brands }))
}

/// Models for an exact brand name
async fn api_models(
    State(state): State<AppState>,
    Query(params): Query<ModelsQuery>,
) -> Json<Value> {
    let models = state.engine.catalog.models_for(&params.brand);
    Json(json!({ "brand": params.brand, "models": models }))
}

/// Static fault-category reference list
async fn api_categories(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "categories": state.engine.categories() }))
}

async fn api_list_vehicles(State(state): State<AppState>) -> Json<Value> {
    let vehicles = state.engine.store.list_vehicles();
    Json(json!({ "vehicles": vehicles }))
}

async fn api_add_vehicle(
    State(state): State<AppState>,
    Json(new): Json<NewVehicle>,
) -> (StatusCode, Json<Value>) {
    match state.engine.add_vehicle(new) {
        Ok(vehicle) => (StatusCode::CREATED, Json(json!({ "vehicle": vehicle }))),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": e.to_string() })),
        ),
    }
}

/// Vehicle detail, joined with its fault reports
async fn api_get_vehicle(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> (StatusCode, Json<Value>) {
    match state.engine.store.get_vehicle(id) {
        Some(vehicle) => {
            let faults = state.engine.store.faults_for(id);
            (
                StatusCode::OK,
                Json(json!({ "vehicle": vehicle, "fault_reports": faults })),
            )
        }
        None => not_found("vehicle", id),
    }
}

async fn api_delete_vehicle(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> (StatusCode, Json<Value>) {
    match state.engine.remove_vehicle(id) {
        Some(vehicle) => (StatusCode::OK, Json(json!({ "removed": vehicle }))),
        None => not_found("vehicle", id),
    }
}

async fn api_report_fault(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(new): Json<NewFault>,
) -> (StatusCode, Json<Value>) {
    match state.engine.report_fault(id, new) {
        Some(report) => (StatusCode::CREATED, Json(json!({ "fault_report": report }))),
        None => not_found("vehicle", id),
    }
}

async fn api_verify_fault(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> (StatusCode, Json<Value>) {
    match state.engine.verify_fault(id) {
        Some(report) => (StatusCode::OK, Json(json!({ "fault_report": report }))),
        None => not_found("fault report", id),
    }
}

/// Per-category reliability breakdown for one vehicle
async fn api_category_scores(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> (StatusCode, Json<Value>) {
    match state.engine.category_scores(id) {
        Some(scores) => (
            StatusCode::OK,
            Json(json!({ "vehicle_id": id, "categories": scores })),
        ),
        None => not_found("vehicle", id),
    }
}

/// Ranked model reliability report, recomputed fresh per request
async fn api_reliability(State(state): State<AppState>) -> Json<Value> {
    let report = state.engine.reliability_report();
    let models: Vec<Value> = report
        .iter()
        .map(|m| {
            json!({
                "brand": m.brand,
                "model": m.model,
                "vehicle_count": m.vehicle_count,
                "verified_faults": m.verified_faults,
                "reliability_score": m.reliability_score,
                "percentage": (m.reliability_score * 100.0).round() as i64,
                "band": scoring::score_to_band(m.reliability_score),
            })
        })
        .collect();
    Json(json!({ "models": models }))
}

/// Score a caller-supplied batch of joined rows without touching the
/// store. Rows arrive in the loose external-fetch shape and are typed
/// at the ingest boundary before scoring.
async fn api_reliability_preview(Json(rows): Json<Value>) -> (StatusCode, Json<Value>) {
    let records = match ingest::parse_rows(rows) {
        Ok(records) => records,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": e.to_string() })),
            )
        }
    };
    let report = scoring::score_by_model(&records);
    (StatusCode::OK, Json(json!({ "models": report })))
}

/// Journal API with search
async fn api_journal(
    State(state): State<AppState>,
    Query(params): Query<JournalQuery>,
) -> Json<Value> {
    let limit = params.limit.unwrap_or(100);
    let entries = state.engine.journal.search(
        params.query.as_deref(),
        params.event.as_deref(),
        limit,
    );
    Json(json!({
        "entries": entries,
        "stats": state.engine.journal.get_stats(),
    }))
}

/// Stats API
async fn api_stats(State(state): State<AppState>) -> Json<Value> {
    Json(state.engine.get_stats())
}
