use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::CoreError;
use crate::middleware::{ApiJson, ApiPath, ApiQuery, HolderId};
use crate::models::{SeatCoord, SeatStatus};
use crate::services::seat_lock::HoldOutcome;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/showtimes/{id}/seats", get(get_seat_map))
        .route("/showtimes/{id}/holds", post(hold_seat).delete(release_seat))
        .route("/showtimes/{id}/holds/verify", post(verify_holds))
}

/* ---------- SEAT MAP ---------- */

#[derive(Debug, Deserialize)]
struct SeatMapQuery {
    /// Also mark seats under a live hold.
    #[serde(default)]
    holds: bool,
}

// GET /api/showtimes/{id}/seats
async fn get_seat_map(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(params): ApiQuery<SeatMapQuery>,
) -> Result<impl IntoResponse, CoreError> {
    let map = if params.holds {
        state.seats.build_selectable_seat_map(id).await?
    } else {
        state.seats.build_seat_map(id).await?
    };

    Ok(Json(json!({
        "status": "success",
        "data": map,
    })))
}

/* ---------- HOLDS ---------- */

// Body shared by hold and release
#[derive(Debug, Deserialize)]
struct SeatRequest {
    row: i32,
    seat: i32,
}

// POST /api/showtimes/{id}/holds
async fn hold_seat(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    HolderId(holder): HolderId,
    ApiJson(req): ApiJson<SeatRequest>,
) -> Result<impl IntoResponse, CoreError> {
    // The seat must exist in the layout and not be sold already.
    let map = state.seats.build_seat_map(id).await?;
    let coord = SeatCoord::new(req.row, req.seat);
    match map.cell(coord).map(|c| c.status) {
        None => {
            return Err(CoreError::ValidationFailed(format!(
                "Seat {}-{} does not exist on screen {}",
                req.row, req.seat, map.screen
            )))
        }
        Some(SeatStatus::Booked) => {
            return Err(CoreError::ValidationFailed(format!(
                "Seat {}-{} is already booked",
                req.row, req.seat
            )))
        }
        Some(_) => {}
    }

    match state.seat_lock.acquire(id, req.row, req.seat, &holder).await? {
        HoldOutcome::Acquired => Ok(Json(json!({
            "status": "success",
            "data": {
                "showtime": id,
                "row": req.row,
                "seat": req.seat,
                "holder": holder,
                "expires_in_seconds": state.seat_lock.ttl().as_secs(),
            },
        }))),
        HoldOutcome::AlreadyHeld => Err(CoreError::AlreadyHeld { row: req.row, seat: req.seat }),
    }
}

// DELETE /api/showtimes/{id}/holds
async fn release_seat(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    HolderId(holder): HolderId,
    ApiJson(req): ApiJson<SeatRequest>,
) -> Result<impl IntoResponse, CoreError> {
    state.seat_lock.release(id, req.row, req.seat, &holder).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct VerifyRequest {
    seats: Vec<SeatCoord>,
}

// POST /api/showtimes/{id}/holds/verify
async fn verify_holds(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    HolderId(holder): HolderId,
    ApiJson(req): ApiJson<VerifyRequest>,
) -> Result<impl IntoResponse, CoreError> {
    if req.seats.is_empty() {
        return Err(CoreError::ValidationFailed("seats must not be empty".to_string()));
    }
    let lost = state.seat_lock.verify(id, &holder, &req.seats).await?;

    Ok(Json(json!({
        "status": "success",
        "data": {
            "verified": lost.is_empty(),
            "lost": lost,
        },
    })))
}
