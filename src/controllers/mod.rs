pub mod showtimes;
pub mod seats;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(showtimes::routes())
        .merge(seats::routes())
}

/// Full application router, shared by the binary and the router tests.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Showtime Inventory API v1.0" }))
        .route("/health", get(health))
        .nest("/api", routes())
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

// GET /health
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (records, holds) = futures::join!(state.records.ping(), state.holds.ping());
    let body = json!({
        "records": records.as_ref().map(|_| "ok").unwrap_or("unavailable"),
        "holds": holds.as_ref().map(|_| "ok").unwrap_or("unavailable"),
    });

    if records.is_ok() && holds.is_ok() {
        (StatusCode::OK, Json(body))
    } else {
        tracing::warn!("Health check degraded: {}", body);
        (StatusCode::SERVICE_UNAVAILABLE, Json(body))
    }
}
