//! In-process stores with the same contracts as the Postgres and Redis ones.
//! Every operation takes one short critical section, which also makes the
//! overlap check in `insert_showtimes` atomic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use crate::models::{Movie, NewShowtime, SeatCoord, Showtime, ShowtimeFilter, ShowtimeWindow, Theater};
use crate::store::{HoldStore, RecordStore, StoreError, StoreResult};

struct BookingRecord {
    showtime_id: Uuid,
    status: String,
    seats: Vec<SeatCoord>,
}

#[derive(Default)]
struct Records {
    movies: HashMap<Uuid, Movie>,
    theaters: HashMap<Uuid, Theater>,
    showtimes: HashMap<Uuid, Showtime>,
    bookings: HashMap<Uuid, BookingRecord>,
}

#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<Records>,
    unavailable: AtomicBool,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> StoreResult<MutexGuard<'_, Records>> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("memory store marked unavailable".into()));
        }
        self.records
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }

    /// Makes every subsequent call fail as if the backend timed out.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Relaxed);
    }

    pub fn insert_movie(&self, movie: Movie) -> StoreResult<()> {
        self.records()?.movies.insert(movie.id, movie);
        Ok(())
    }

    pub fn insert_theater(&self, theater: Theater) -> StoreResult<()> {
        self.records()?.theaters.insert(theater.id, theater);
        Ok(())
    }

    /// Records a booking as the external booking flow would.
    pub fn add_booking(
        &self,
        showtime_id: Uuid,
        status: &str,
        seats: Vec<SeatCoord>,
    ) -> StoreResult<Uuid> {
        let id = Uuid::new_v4();
        self.records()?.bookings.insert(
            id,
            BookingRecord { showtime_id, status: status.to_string(), seats },
        );
        Ok(id)
    }

    pub fn showtime_count(&self) -> StoreResult<usize> {
        Ok(self.records()?.showtimes.len())
    }

    fn cascade(records: &mut Records, doomed: impl Fn(&Showtime) -> bool) -> u64 {
        let ids: Vec<Uuid> = records
            .showtimes
            .values()
            .filter(|s| doomed(s))
            .map(|s| s.id)
            .collect();
        for id in &ids {
            records.showtimes.remove(id);
        }
        records.bookings.retain(|_, b| !ids.contains(&b.showtime_id));
        ids.len() as u64
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn find_movie(&self, id: Uuid) -> StoreResult<Option<Movie>> {
        Ok(self.records()?.movies.get(&id).cloned())
    }

    async fn find_theater(&self, id: Uuid) -> StoreResult<Option<Theater>> {
        Ok(self.records()?.theaters.get(&id).cloned())
    }

    async fn find_overlapping(
        &self,
        theater_id: Uuid,
        screen: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Option<Showtime>> {
        let records = self.records()?;
        Ok(records
            .showtimes
            .values()
            .filter(|s| s.theater_id == theater_id && s.screen == screen && s.overlaps(start, end))
            .min_by_key(|s| s.start_time)
            .cloned())
    }

    async fn insert_showtimes(&self, batch: Vec<NewShowtime>) -> StoreResult<Vec<Showtime>> {
        let mut records = self.records()?;
        let now = Utc::now();

        let mut created: Vec<Showtime> = Vec::with_capacity(batch.len());
        for show in batch {
            let clash = records
                .showtimes
                .values()
                .chain(created.iter())
                .any(|s| {
                    s.theater_id == show.theater_id
                        && s.screen == show.screen
                        && s.overlaps(show.start_time, show.end_time)
                });
            if clash {
                return Err(StoreError::Overlap {
                    theater_id: show.theater_id,
                    screen: show.screen,
                    start: show.start_time,
                    end: show.end_time,
                });
            }
            created.push(show.into_showtime(Uuid::new_v4(), now));
        }

        for show in &created {
            records.showtimes.insert(show.id, show.clone());
        }
        Ok(created)
    }

    async fn find_showtime(&self, id: Uuid) -> StoreResult<Option<Showtime>> {
        Ok(self.records()?.showtimes.get(&id).cloned())
    }

    async fn list_showtimes(
        &self,
        filter: &ShowtimeFilter,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Showtime>> {
        let records = self.records()?;
        let mut shows: Vec<Showtime> = records
            .showtimes
            .values()
            .filter(|s| filter.matches(s, now))
            .cloned()
            .collect();
        match filter.window {
            ShowtimeWindow::Past => {
                shows.sort_by(|a, b| b.start_time.cmp(&a.start_time).then(a.id.cmp(&b.id)))
            }
            _ => shows.sort_by_key(|s| (s.start_time, s.id)),
        }
        if let Some(page) = filter.page {
            shows = shows
                .into_iter()
                .skip(page.offset as usize)
                .take(page.limit as usize)
                .collect();
        }
        Ok(shows)
    }

    async fn delete_showtime(&self, id: Uuid) -> StoreResult<bool> {
        let mut records = self.records()?;
        Ok(Self::cascade(&mut records, |s| s.id == id) > 0)
    }

    async fn delete_movie(&self, id: Uuid) -> StoreResult<Option<u64>> {
        let mut records = self.records()?;
        if records.movies.remove(&id).is_none() {
            return Ok(None);
        }
        Ok(Some(Self::cascade(&mut records, |s| s.movie_id == id)))
    }

    async fn delete_theater(&self, id: Uuid) -> StoreResult<Option<u64>> {
        let mut records = self.records()?;
        if records.theaters.remove(&id).is_none() {
            return Ok(None);
        }
        Ok(Some(Self::cascade(&mut records, |s| s.theater_id == id)))
    }

    async fn booked_seats(&self, showtime_id: Uuid) -> StoreResult<Vec<SeatCoord>> {
        let records = self.records()?;
        Ok(records
            .bookings
            .values()
            .filter(|b| b.showtime_id == showtime_id && b.status == "confirmed")
            .flat_map(|b| b.seats.iter().copied())
            .collect())
    }

    async fn ping(&self) -> StoreResult<()> {
        self.records().map(|_| ())
    }
}

/// Key-value store with per-key expiry measured on the tokio clock, so tests
/// can drive expiry with `tokio::time::advance`.
#[derive(Default)]
pub struct MemoryHoldStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryHoldStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> StoreResult<MutexGuard<'_, HashMap<String, (String, Instant)>>> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Backend("memory hold store lock poisoned".into()))?;
        let now = Instant::now();
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        Ok(entries)
    }
}

fn holder_field(value: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(value)
        .ok()?
        .get("holder")?
        .as_str()
        .map(str::to_string)
}

#[async_trait]
impl HoldStore for MemoryHoldStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        let mut entries = self.entries()?;
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(true)
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries()?.get(key).map(|(value, _)| value.clone()))
    }

    async fn delete_if_holder(&self, key: &str, holder: &str) -> StoreResult<bool> {
        let mut entries = self.entries()?;
        let owned = entries
            .get(key)
            .and_then(|(value, _)| holder_field(value))
            .is_some_and(|h| h == holder);
        if owned {
            entries.remove(key);
        }
        Ok(owned)
    }

    async fn exists_many(&self, keys: &[String]) -> StoreResult<Vec<bool>> {
        let entries = self.entries()?;
        Ok(keys.iter().map(|k| entries.contains_key(k)).collect())
    }

    async fn ping(&self) -> StoreResult<()> {
        self.entries().map(|_| ())
    }
}
