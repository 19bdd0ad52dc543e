//! Overlap-safe showtime scheduling.
//!
//! A request is validated, expanded into one slot per calendar day when it
//! carries an `end_date`, checked slot by slot against persisted showtimes on
//! the same `(theater, screen)`, and finally persisted as a single batch. The
//! per-slot check is the fast path that produces readable conflicts; the
//! record store's own exclusion rule is what keeps concurrent schedulers from
//! both succeeding.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::config::ScheduleConfig;
use crate::error::{ConflictDetail, CoreError, CoreResult};
use crate::models::{NewShowtime, Showtime, ShowtimeFilter};
use crate::store::{RecordStore, StoreError};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ScheduleRequest {
    pub movie_id: Uuid,
    pub theater_id: Uuid,
    /// Screen name or screen id within the theater.
    #[validate(length(min = 1, message = "screen is required"))]
    pub screen: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Last calendar day of a daily run.
    pub end_date: Option<DateTime<Utc>>,
    #[validate(range(exclusive_min = 0.0, message = "price must be positive"))]
    pub price: f64,
    #[validate(range(min = 1, message = "seat count must be positive"))]
    pub seat_count: Option<i32>,
    pub is_active: Option<bool>,
}

/// One concrete interval produced from a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// Local calendar day, set for multi-day runs only.
    pub day: Option<NaiveDate>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

fn hour_minute(t: NaiveTime) -> NaiveTime {
    t.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(t)
}

fn to_utc(local: NaiveDateTime, offset: &FixedOffset) -> CoreResult<DateTime<Utc>> {
    local
        .and_local_timezone(*offset)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| CoreError::ValidationFailed(format!("{local} is not a valid local time")))
}

/// Expands a daily run into one slot per local calendar day, from the day of
/// `start` through the day of `end_date` inclusive.
///
/// Each slot reuses the hour:minute of `start` and `end`. When the end
/// time-of-day is not after the start time-of-day the show crosses midnight
/// and its end lands on the following day.
pub fn expand_days(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    end_date: DateTime<Utc>,
    offset: &FixedOffset,
    max_days: u32,
) -> CoreResult<Vec<Slot>> {
    let start_local = start.with_timezone(offset);
    let end_local = end.with_timezone(offset);
    let start_tod = hour_minute(start_local.time());
    let end_tod = hour_minute(end_local.time());
    let crosses_midnight = end_tod <= start_tod;

    let first_day = start_local.date_naive();
    let last_day = end_date.with_timezone(offset).date_naive();
    let days = (last_day - first_day).num_days() + 1;
    if days > i64::from(max_days) {
        return Err(CoreError::ValidationFailed(format!(
            "Cannot create shows for more than {max_days} days at once"
        )));
    }

    let mut slots = Vec::with_capacity(days.max(0) as usize);
    for day in first_day.iter_days().take(days.max(0) as usize) {
        let end_day = if crosses_midnight {
            day.succ_opt()
                .ok_or_else(|| CoreError::ValidationFailed("date out of range".to_string()))?
        } else {
            day
        };
        slots.push(Slot {
            day: Some(day),
            start: to_utc(day.and_time(start_tod), offset)?,
            end: to_utc(end_day.and_time(end_tod), offset)?,
        });
    }
    Ok(slots)
}

pub struct Scheduler {
    store: Arc<dyn RecordStore>,
    offset: FixedOffset,
    max_days: u32,
}

impl Scheduler {
    pub fn new(store: Arc<dyn RecordStore>, config: &ScheduleConfig) -> Self {
        Self { store, offset: config.offset(), max_days: config.max_days }
    }

    /// Validates the interval and expands the request into its slots.
    pub fn plan(&self, req: &ScheduleRequest) -> CoreResult<Vec<Slot>> {
        req.validate()
            .map_err(|e| CoreError::ValidationFailed(e.to_string()))?;
        if req.end_time <= req.start_time {
            return Err(CoreError::ValidationFailed(
                "end_time must be after start_time".to_string(),
            ));
        }

        match req.end_date.filter(|d| *d > req.start_time) {
            Some(end_date) => {
                expand_days(req.start_time, req.end_time, end_date, &self.offset, self.max_days)
            }
            None => Ok(vec![Slot { day: None, start: req.start_time, end: req.end_time }]),
        }
    }

    /// Request-shape checks run first and touch no store, so a malformed
    /// request fails with `ValidationFailed` even when its movie is unknown.
    /// Lookups follow in the order movie, theater, screen.
    pub async fn schedule(&self, req: ScheduleRequest) -> CoreResult<Vec<Showtime>> {
        let slots = self.plan(&req)?;

        if self.store.find_movie(req.movie_id).await?.is_none() {
            return Err(CoreError::not_found("movie", req.movie_id));
        }
        let theater = self
            .store
            .find_theater(req.theater_id)
            .await?
            .ok_or_else(|| CoreError::not_found("theater", req.theater_id))?;
        let screen = theater
            .resolve_screen(&req.screen)
            .ok_or_else(|| CoreError::not_found("screen", &req.screen))?;

        for slot in &slots {
            let clash = self
                .store
                .find_overlapping(theater.id, &screen.name, slot.start, slot.end)
                .await?;
            if let Some(existing) = clash {
                warn!(
                    "Scheduling conflict on {}/{}: {} - {} collides with showtime {}",
                    theater.id, screen.name, slot.start, slot.end, existing.id
                );
                return Err(self.conflict(slot.day, Some(&existing)));
            }
        }

        let seats = req.seat_count.unwrap_or(screen.capacity);
        let batch: Vec<NewShowtime> = slots
            .iter()
            .map(|slot| NewShowtime {
                movie_id: req.movie_id,
                theater_id: theater.id,
                screen: screen.name.clone(),
                start_time: slot.start,
                end_time: slot.end,
                price: req.price,
                total_seats: seats,
                is_active: req.is_active.unwrap_or(true),
            })
            .collect();

        match self.store.insert_showtimes(batch).await {
            Ok(created) => {
                info!(
                    "Created {} showtime(s) for movie {} on {}/{}",
                    created.len(),
                    req.movie_id,
                    theater.id,
                    screen.name
                );
                Ok(created)
            }
            Err(StoreError::Overlap { theater_id, screen, start, end }) => {
                // Lost a race with a concurrent scheduler; name the winner if it is visible.
                warn!("Store rejected overlapping batch on {}/{} at {}", theater_id, screen, start);
                let existing = self
                    .store
                    .find_overlapping(theater_id, &screen, start, end)
                    .await
                    .ok()
                    .flatten();
                let day = slots
                    .iter()
                    .find(|s| s.start == start)
                    .and_then(|s| s.day);
                Err(self.conflict(day, existing.as_ref()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Conflict naming the clashing show in local calendar time.
    fn conflict(&self, day: Option<NaiveDate>, existing: Option<&Showtime>) -> CoreError {
        CoreError::Conflict(ConflictDetail {
            day,
            existing_id: existing.map(|s| s.id),
            existing_start: existing.map(|s| s.start_time.with_timezone(&self.offset)),
            existing_end: existing.map(|s| s.end_time.with_timezone(&self.offset)),
        })
    }

    pub async fn get(&self, id: Uuid) -> CoreResult<Showtime> {
        self.store
            .find_showtime(id)
            .await?
            .ok_or_else(|| CoreError::not_found("showtime", id))
    }

    pub async fn list(
        &self,
        filter: &ShowtimeFilter,
        now: DateTime<Utc>,
    ) -> CoreResult<Vec<Showtime>> {
        Ok(self.store.list_showtimes(filter, now).await?)
    }

    pub async fn delete_showtime(&self, id: Uuid) -> CoreResult<()> {
        if !self.store.delete_showtime(id).await? {
            return Err(CoreError::not_found("showtime", id));
        }
        info!("Deleted showtime {}", id);
        Ok(())
    }

    /// Deletes a movie and every showtime referencing it.
    pub async fn delete_movie(&self, id: Uuid) -> CoreResult<u64> {
        let removed = self
            .store
            .delete_movie(id)
            .await?
            .ok_or_else(|| CoreError::not_found("movie", id))?;
        info!("Cascade removed {} showtimes of movie {}", removed, id);
        Ok(removed)
    }

    /// Deletes a theater and every showtime referencing it.
    pub async fn delete_theater(&self, id: Uuid) -> CoreResult<u64> {
        let removed = self
            .store
            .delete_theater(id)
            .await?
            .ok_or_else(|| CoreError::not_found("theater", id))?;
        info!("Cascade removed {} showtimes of theater {}", removed, id);
        Ok(removed)
    }
}
