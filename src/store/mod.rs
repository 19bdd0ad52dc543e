//! Contracts the inventory core needs from its two backing stores.
//!
//! - [`RecordStore`]: durable records (movies, theaters, showtimes, bookings).
//!   Implemented over PostgreSQL by [`PgRecordStore`].
//! - [`HoldStore`]: shared key-value store with atomic set-if-absent + TTL.
//!   Implemented over Redis by [`RedisHoldStore`].
//!
//! Both have in-memory implementations in [`memory`] for tests and local runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use uuid::Uuid;

use crate::models::{Movie, NewShowtime, SeatCoord, Showtime, ShowtimeFilter, Theater};

pub mod memory;
pub mod postgres;
pub mod redis_holds;

pub use memory::{MemoryHoldStore, MemoryRecordStore};
pub use postgres::PgRecordStore;
pub use redis_holds::RedisHoldStore;

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The store's own exclusion rule rejected an overlapping showtime.
    #[error("showtime on {theater_id}/{screen} overlaps [{start}, {end})")]
    Overlap {
        theater_id: Uuid,
        screen: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Timeout, refused or dropped connection.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store failure: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn find_movie(&self, id: Uuid) -> StoreResult<Option<Movie>>;

    /// Theater together with its current screen list.
    async fn find_theater(&self, id: Uuid) -> StoreResult<Option<Theater>>;

    /// First showtime on `(theater, screen)` with
    /// `start_time < end AND end_time > start`, if any.
    async fn find_overlapping(
        &self,
        theater_id: Uuid,
        screen: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Option<Showtime>>;

    /// Inserts every record or none. Must refuse overlaps with
    /// [`StoreError::Overlap`] even under concurrent callers.
    async fn insert_showtimes(&self, batch: Vec<NewShowtime>) -> StoreResult<Vec<Showtime>>;

    async fn find_showtime(&self, id: Uuid) -> StoreResult<Option<Showtime>>;

    async fn list_showtimes(
        &self,
        filter: &ShowtimeFilter,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Showtime>>;

    /// Returns `false` when nothing was deleted.
    async fn delete_showtime(&self, id: Uuid) -> StoreResult<bool>;

    /// Deletes the movie and its showtimes. `None` when the movie is unknown,
    /// otherwise the number of showtimes removed.
    async fn delete_movie(&self, id: Uuid) -> StoreResult<Option<u64>>;

    /// Deletes the theater and its showtimes, same contract as `delete_movie`.
    async fn delete_theater(&self, id: Uuid) -> StoreResult<Option<u64>>;

    /// Seats of confirmed bookings for one showtime.
    async fn booked_seats(&self, showtime_id: Uuid) -> StoreResult<Vec<SeatCoord>>;

    async fn ping(&self) -> StoreResult<()>;
}

#[async_trait]
pub trait HoldStore: Send + Sync {
    /// Writes `value` under `key` only if the key is absent, with expiry `ttl`.
    /// Returns whether the write happened.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool>;

    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Deletes `key` only while its value's `holder` field equals `holder`.
    async fn delete_if_holder(&self, key: &str, holder: &str) -> StoreResult<bool>;

    /// Existence flags in the same order as `keys`.
    async fn exists_many(&self, keys: &[String]) -> StoreResult<Vec<bool>>;

    async fn ping(&self) -> StoreResult<()>;
}
