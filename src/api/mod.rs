//! HTTP API: catalog, property listings and appraisals.

pub mod appraisal;
pub mod catalog;
pub mod properties;
pub mod validate;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{header, HeaderValue, Method};
use axum::response::Json;
use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::db::store::Store;
use crate::monitoring::health::{HealthReport, HealthState};
use crate::valuation::engine::ValuationEngine;

/// Shared state accessible by all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub engine: Arc<ValuationEngine>,
    pub health: HealthState,
}

impl AppState {
    pub fn new(store: Arc<Store>, health: HealthState) -> Self {
        let engine = Arc::new(ValuationEngine::new(store.clone()));
        Self {
            store,
            engine,
            health,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_handler))
        .route(
            "/sectors",
            get(catalog::list_sectors).post(catalog::create_sector),
        )
        .route(
            "/sectors/{id}",
            patch(catalog::update_sector).delete(catalog::delete_sector),
        )
        .route("/finishes", get(catalog::list_finishes))
        .route("/finish-weights", get(catalog::list_finish_weights))
        .route(
            "/properties",
            get(properties::list_properties).post(properties::create_property),
        )
        .route(
            "/properties/{id}",
            get(properties::get_property)
                .patch(properties::update_property)
                .delete(properties::delete_property),
        )
        .route("/amc/run", post(appraisal::run_appraisal))
        .with_state(state)
}

/// Credentialed CORS for the configured origins.
pub fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|o| HeaderValue::from_str(o).with_context(|| format!("Invalid CORS origin: {o}")))
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true))
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.health.report().await)
}
