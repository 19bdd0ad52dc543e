use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::CoreError;
use crate::middleware::{ApiJson, ApiPath, ApiQuery};
use crate::models::{Page, ShowtimeFilter, ShowtimeWindow};
use crate::services::scheduler::ScheduleRequest;
use crate::services::status::{filter_by_status, ShowPhase, ShowtimeWithStatus};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/showtimes", get(list_showtimes).post(create_showtime))
        .route("/showtimes/current", get(current_showtimes))
        .route("/showtimes/upcoming", get(upcoming_showtimes))
        .route("/showtimes/available", get(available_showtimes))
        .route("/showtimes/past", get(past_showtimes))
        .route("/showtimes/{id}", get(get_showtime).delete(delete_showtime))
        .route("/movies/{id}", delete(delete_movie))
        .route("/theaters/{id}", delete(delete_theater))
}

/* ---------- READ ---------- */

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<u32>,
    #[serde(rename = "pageSize")]
    page_size: Option<u32>,
}

impl PageQuery {
    fn page(&self) -> Page {
        Page::new(self.page, self.page_size)
    }
}

#[derive(Debug, Deserialize)]
struct ShowtimesQuery {
    status: Option<String>,
    movie: Option<Uuid>,
    theater: Option<Uuid>,
    page: Option<u32>,
    #[serde(rename = "pageSize")]
    page_size: Option<u32>,
}

fn listing(shows: Vec<ShowtimeWithStatus>, page: Page) -> Json<serde_json::Value> {
    Json(json!({
        "status": "success",
        "results": shows.len(),
        "page": page.offset / page.limit + 1,
        "page_size": page.limit,
        "data": { "showtimes": shows },
    }))
}

// GET /api/showtimes
async fn list_showtimes(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<ShowtimesQuery>,
) -> Result<impl IntoResponse, CoreError> {
    let phase = match params.status.as_deref() {
        None | Some("all") => None,
        Some(s) => Some(s.parse::<ShowPhase>().map_err(CoreError::ValidationFailed)?),
    };

    let page = Page::new(params.page, params.page_size);
    let filter = ShowtimeFilter {
        window: ShowtimeWindow::All,
        movie_id: params.movie,
        theater_id: params.theater,
        page: Some(page),
    };
    let now = Utc::now();
    let shows = state.scheduler.list(&filter, now).await?;
    let shows = filter_by_status(state.status.classify_all(shows, now), phase);

    Ok(listing(shows, page))
}

async fn window_listing(
    state: &AppState,
    window: ShowtimeWindow,
    paging: PageQuery,
) -> Result<Json<serde_json::Value>, CoreError> {
    let page = paging.page();
    let filter = ShowtimeFilter { page: Some(page), ..ShowtimeFilter::window(window) };
    let now = Utc::now();
    let shows = state.scheduler.list(&filter, now).await?;
    // Keep the window's own ordering (start time), only annotate.
    let shows = shows.into_iter().map(|s| state.status.annotate(s, now)).collect();

    Ok(listing(shows, page))
}

// GET /api/showtimes/current
async fn current_showtimes(
    State(state): State<Arc<AppState>>,
    ApiQuery(paging): ApiQuery<PageQuery>,
) -> Result<impl IntoResponse, CoreError> {
    window_listing(&state, ShowtimeWindow::Current, paging).await
}

// GET /api/showtimes/upcoming
async fn upcoming_showtimes(
    State(state): State<Arc<AppState>>,
    ApiQuery(paging): ApiQuery<PageQuery>,
) -> Result<impl IntoResponse, CoreError> {
    window_listing(&state, ShowtimeWindow::Upcoming, paging).await
}

// GET /api/showtimes/available
async fn available_showtimes(
    State(state): State<Arc<AppState>>,
    ApiQuery(paging): ApiQuery<PageQuery>,
) -> Result<impl IntoResponse, CoreError> {
    window_listing(&state, ShowtimeWindow::Available, paging).await
}

// GET /api/showtimes/past
async fn past_showtimes(
    State(state): State<Arc<AppState>>,
    ApiQuery(paging): ApiQuery<PageQuery>,
) -> Result<impl IntoResponse, CoreError> {
    window_listing(&state, ShowtimeWindow::Past, paging).await
}

// GET /api/showtimes/{id}
async fn get_showtime(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, CoreError> {
    let show = state.scheduler.get(id).await?;
    let show = state.status.annotate(show, Utc::now());

    Ok(Json(json!({
        "status": "success",
        "data": { "showtime": show },
    })))
}

/* ---------- WRITE ---------- */

// POST /api/showtimes
async fn create_showtime(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ScheduleRequest>,
) -> Result<impl IntoResponse, CoreError> {
    let created = state.scheduler.schedule(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "message": format!("Successfully created {} showtime(s)", created.len()),
            "data": {
                "count": created.len(),
                "showtimes": created,
            },
        })),
    ))
}

// DELETE /api/showtimes/{id}
async fn delete_showtime(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, CoreError> {
    state.scheduler.delete_showtime(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// DELETE /api/movies/{id}
async fn delete_movie(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, CoreError> {
    let removed = state.scheduler.delete_movie(id).await?;
    Ok(Json(json!({
        "status": "success",
        "data": { "movie": id, "showtimes_removed": removed },
    })))
}

// DELETE /api/theaters/{id}
async fn delete_theater(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, CoreError> {
    let removed = state.scheduler.delete_theater(id).await?;
    Ok(Json(json!({
        "status": "success",
        "data": { "theater": id, "showtimes_removed": removed },
    })))
}
