use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Showtime {
    pub id: Uuid,
    pub movie_id: Uuid,
    pub theater_id: Uuid,
    /// Canonical screen name within the theater.
    pub screen: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub price: f64,
    pub total_seats: i32,
    pub available_seats: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Showtime {
    /// Half-open interval intersection, `[start, end)`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time < end && self.end_time > start
    }
}

/// A showtime that has passed validation but is not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewShowtime {
    pub movie_id: Uuid,
    pub theater_id: Uuid,
    pub screen: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub price: f64,
    pub total_seats: i32,
    pub is_active: bool,
}

impl NewShowtime {
    pub fn into_showtime(self, id: Uuid, created_at: DateTime<Utc>) -> Showtime {
        Showtime {
            id,
            movie_id: self.movie_id,
            theater_id: self.theater_id,
            screen: self.screen,
            start_time: self.start_time,
            end_time: self.end_time,
            price: self.price,
            total_seats: self.total_seats,
            available_seats: self.total_seats,
            is_active: self.is_active,
            created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShowtimeWindow {
    #[default]
    All,
    /// Playing now, or starting/ending within an hour of `now`.
    Current,
    Upcoming,
    /// Upcoming with at least one seat left.
    Available,
    Past,
}

/// Slice of a listing in store order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Page {
    pub const MAX_SIZE: u32 = 100;

    /// From a one-based page number and a page size; both default and the
    /// size is clamped to `1..=MAX_SIZE`.
    pub fn new(page: Option<u32>, page_size: Option<u32>) -> Self {
        let limit = page_size.unwrap_or(Self::MAX_SIZE).clamp(1, Self::MAX_SIZE);
        let page = page.unwrap_or(1).max(1);
        Self { limit, offset: (page - 1).saturating_mul(limit) }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ShowtimeFilter {
    pub window: ShowtimeWindow,
    pub movie_id: Option<Uuid>,
    pub theater_id: Option<Uuid>,
    /// `None` returns every match.
    pub page: Option<Page>,
}

impl ShowtimeFilter {
    pub fn window(window: ShowtimeWindow) -> Self {
        Self { window, ..Default::default() }
    }

    /// In-process evaluation of the filter, used by the memory store.
    pub fn matches(&self, show: &Showtime, now: DateTime<Utc>) -> bool {
        if self.movie_id.is_some_and(|id| id != show.movie_id) {
            return false;
        }
        if self.theater_id.is_some_and(|id| id != show.theater_id) {
            return false;
        }
        match self.window {
            ShowtimeWindow::All => true,
            ShowtimeWindow::Current => {
                show.start_time <= now + Duration::hours(1)
                    && show.end_time >= now - Duration::hours(1)
            }
            ShowtimeWindow::Upcoming => show.start_time > now,
            ShowtimeWindow::Available => show.start_time > now && show.available_seats > 0,
            ShowtimeWindow::Past => show.end_time < now,
        }
    }
}
