use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde_json::json;
use uuid::Uuid;

use crate::store::StoreError;

/// Details of a rejected scheduling candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictDetail {
    /// Calendar day of the rejected candidate (multi-day runs only).
    pub day: Option<NaiveDate>,
    pub existing_id: Option<Uuid>,
    /// Times of the clashing show on the scheduler's local calendar.
    pub existing_start: Option<DateTime<FixedOffset>>,
    pub existing_end: Option<DateTime<FixedOffset>>,
}

impl std::fmt::Display for ConflictDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.day, self.existing_start, self.existing_end) {
            (Some(day), Some(start), Some(end)) => write!(
                f,
                "Show conflicts with existing show on {} ({} - {})",
                day.format("%a %b %d %Y"),
                start.format("%H:%M"),
                end.format("%H:%M"),
            ),
            (Some(day), _, _) => write!(
                f,
                "Show conflicts with an existing show on {}",
                day.format("%a %b %d %Y")
            ),
            (None, Some(start), Some(end)) => write!(
                f,
                "There is already a show scheduled in this screen during the requested time ({} - {})",
                start.format("%Y-%m-%d %H:%M"),
                end.format("%Y-%m-%d %H:%M"),
            ),
            _ => write!(
                f,
                "There is already a show scheduled in this screen during the requested time"
            ),
        }
    }
}

/// Error kinds surfaced by the inventory core.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("No {entity} found with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{0}")]
    Conflict(ConflictDetail),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Seat {row}-{seat} is already held")]
    AlreadyHeld { row: i32, seat: i32 },

    /// The backing store timed out or is unreachable. Safe to retry.
    #[error("Store temporarily unavailable: {0}")]
    Transient(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        CoreError::NotFound { entity, id: id.to_string() }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Transient(_))
    }

    fn status_code(&self) -> (StatusCode, &'static str) {
        match self {
            CoreError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            CoreError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            CoreError::ValidationFailed(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            CoreError::AlreadyHeld { .. } => (StatusCode::CONFLICT, "ALREADY_HELD"),
            CoreError::Transient(_) => (StatusCode::SERVICE_UNAVAILABLE, "TRANSIENT"),
            CoreError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Overlap { theater_id, screen, start, end } => {
                tracing::warn!(%theater_id, %screen, %start, %end, "Store rejected overlapping showtime");
                CoreError::Conflict(ConflictDetail {
                    day: None,
                    existing_id: None,
                    existing_start: None,
                    existing_end: None,
                })
            }
            StoreError::Unavailable(msg) => CoreError::Transient(msg),
            StoreError::Backend(msg) => CoreError::Internal(msg),
        }
    }
}

// Malformed bodies, paths and query strings share the validation error shape.
impl From<JsonRejection> for CoreError {
    fn from(rejection: JsonRejection) -> Self {
        CoreError::ValidationFailed(rejection.body_text())
    }
}

impl From<PathRejection> for CoreError {
    fn from(rejection: PathRejection) -> Self {
        CoreError::ValidationFailed(rejection.body_text())
    }
}

impl From<QueryRejection> for CoreError {
    fn from(rejection: QueryRejection) -> Self {
        CoreError::ValidationFailed(rejection.body_text())
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_code();
        let message = match &self {
            CoreError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                "An internal error occurred".to_string()
            }
            CoreError::Transient(msg) => {
                tracing::error!(error = %msg, "Store unavailable");
                "Service temporarily unavailable, please retry".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "status": if status.is_server_error() { "error" } else { "fail" },
            "code": code,
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn conflict_message_names_day_and_existing_show() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let detail = ConflictDetail {
            day: NaiveDate::from_ymd_opt(2024, 1, 2),
            existing_id: Some(Uuid::nil()),
            existing_start: Some(utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap()),
            existing_end: Some(utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap()),
        };
        let msg = CoreError::Conflict(detail).to_string();
        assert!(msg.contains("Tue Jan 02 2024"), "{msg}");
        assert!(msg.contains("10:00 - 12:00"), "{msg}");
    }

    #[test]
    fn conflict_times_print_in_their_own_offset() {
        // 04:30 UTC is 10:00 at UTC+05:30.
        let ist = FixedOffset::east_opt(330 * 60).unwrap();
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 4, 30, 0).unwrap();
        let detail = ConflictDetail {
            day: None,
            existing_id: None,
            existing_start: Some(start.with_timezone(&ist)),
            existing_end: Some((start + chrono::Duration::hours(2)).with_timezone(&ist)),
        };
        assert!(detail.to_string().contains("(2024-01-02 10:00 - 2024-01-02 12:00)"), "{detail}");
    }

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(CoreError::not_found("showtime", "x").status_code().0, StatusCode::NOT_FOUND);
        assert_eq!(
            CoreError::ValidationFailed("bad".into()).status_code().0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            CoreError::AlreadyHeld { row: 0, seat: 1 }.status_code().0,
            StatusCode::CONFLICT
        );
        assert_eq!(
            CoreError::Transient("timeout".into()).status_code().0,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn only_transient_errors_are_retryable() {
        assert!(CoreError::from(StoreError::Unavailable("pool timed out".into())).is_retryable());
        assert!(!CoreError::from(StoreError::Backend("syntax".into())).is_retryable());
        assert!(!CoreError::ValidationFailed("x".into()).is_retryable());
    }
}
