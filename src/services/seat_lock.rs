//! Short-lived exclusive seat holds on the shared key-value store.
//!
//! A hold is a single `SET NX EX` key per `(showtime, row, seat)`. Holds are
//! never swept: expiry is enforced by the store's TTL, which is the only
//! guarantee against holds abandoned by crashed or disconnected clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::HoldConfig;
use crate::error::{CoreError, CoreResult};
use crate::models::SeatCoord;
use crate::store::HoldStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldOutcome {
    Acquired,
    AlreadyHeld,
}

/// Value stored under a hold key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatHold {
    pub holder: String,
    pub locked_at: DateTime<Utc>,
}

pub struct SeatLock {
    store: Arc<dyn HoldStore>,
    ttl: Duration,
    prefix: String,
}

fn check_coord(row: i32, seat: i32) -> CoreResult<()> {
    if row < 0 || seat < 0 {
        return Err(CoreError::ValidationFailed(format!(
            "seat {row}-{seat} is outside the layout"
        )));
    }
    Ok(())
}

fn check_holder(holder: &str) -> CoreResult<()> {
    if holder.trim().is_empty() {
        return Err(CoreError::ValidationFailed("holder id is required".to_string()));
    }
    Ok(())
}

impl SeatLock {
    pub fn new(store: Arc<dyn HoldStore>, config: &HoldConfig) -> Self {
        Self { store, ttl: config.ttl(), prefix: config.key_prefix.clone() }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn key(&self, showtime_id: Uuid, row: i32, seat: i32) -> String {
        format!("{}:{}:{}-{}", self.prefix, showtime_id, row, seat)
    }

    pub async fn acquire(
        &self,
        showtime_id: Uuid,
        row: i32,
        seat: i32,
        holder: &str,
    ) -> CoreResult<HoldOutcome> {
        check_coord(row, seat)?;
        check_holder(holder)?;

        let value = serde_json::to_string(&SeatHold {
            holder: holder.to_string(),
            locked_at: Utc::now(),
        })
        .map_err(|e| CoreError::Internal(e.to_string()))?;

        let key = self.key(showtime_id, row, seat);
        if self.store.set_if_absent(&key, &value, self.ttl).await? {
            debug!("Seat {} held by {} for {:?}", key, holder, self.ttl);
            Ok(HoldOutcome::Acquired)
        } else {
            warn!("Seat {} already held, {} must pick another", key, holder);
            Ok(HoldOutcome::AlreadyHeld)
        }
    }

    /// Best-effort release; a no-op unless `holder` currently owns the hold.
    pub async fn release(
        &self,
        showtime_id: Uuid,
        row: i32,
        seat: i32,
        holder: &str,
    ) -> CoreResult<()> {
        check_coord(row, seat)?;
        let key = self.key(showtime_id, row, seat);
        if self.store.delete_if_holder(&key, holder).await? {
            debug!("Seat {} released by {}", key, holder);
        }
        Ok(())
    }

    pub async fn holder_of(
        &self,
        showtime_id: Uuid,
        row: i32,
        seat: i32,
    ) -> CoreResult<Option<SeatHold>> {
        check_coord(row, seat)?;
        let raw = self.store.get(&self.key(showtime_id, row, seat)).await?;
        // Unparseable values are treated as held by nobody in particular.
        Ok(raw.and_then(|v| serde_json::from_str(&v).ok()))
    }

    /// Seats from `seats` that are no longer held by `holder`. Empty means
    /// every hold is still live and owned, so the booking may commit.
    pub async fn verify(
        &self,
        showtime_id: Uuid,
        holder: &str,
        seats: &[SeatCoord],
    ) -> CoreResult<Vec<SeatCoord>> {
        check_holder(holder)?;
        let mut lost = Vec::new();
        for coord in seats {
            let owned = self
                .holder_of(showtime_id, coord.row, coord.seat)
                .await?
                .is_some_and(|h| h.holder == holder);
            if !owned {
                lost.push(*coord);
            }
        }
        Ok(lost)
    }

    /// Which of `seats` currently carry a live hold, in one round trip.
    pub async fn held_among(
        &self,
        showtime_id: Uuid,
        seats: &[SeatCoord],
    ) -> CoreResult<HashSet<SeatCoord>> {
        let keys: Vec<String> = seats
            .iter()
            .map(|c| self.key(showtime_id, c.row, c.seat))
            .collect();
        let flags = self.store.exists_many(&keys).await?;
        Ok(seats
            .iter()
            .zip(flags)
            .filter_map(|(coord, held)| held.then_some(*coord))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryHoldStore;

    fn lock() -> SeatLock {
        SeatLock::new(Arc::new(MemoryHoldStore::new()), &HoldConfig::default())
    }

    #[test]
    fn key_composes_showtime_row_and_seat() {
        let id = Uuid::nil();
        assert_eq!(
            lock().key(id, 2, 7),
            "seat_lock:00000000-0000-0000-0000-000000000000:2-7"
        );
    }

    #[tokio::test]
    async fn second_holder_is_refused() {
        let lock = lock();
        let id = Uuid::new_v4();
        assert_eq!(lock.acquire(id, 0, 1, "alice").await.unwrap(), HoldOutcome::Acquired);
        assert_eq!(lock.acquire(id, 0, 1, "bob").await.unwrap(), HoldOutcome::AlreadyHeld);
        // Re-acquiring your own live hold does not extend it either.
        assert_eq!(lock.acquire(id, 0, 1, "alice").await.unwrap(), HoldOutcome::AlreadyHeld);
    }

    #[tokio::test]
    async fn release_by_stranger_is_a_no_op() {
        let lock = lock();
        let id = Uuid::new_v4();
        lock.acquire(id, 1, 1, "alice").await.unwrap();
        lock.release(id, 1, 1, "bob").await.unwrap();
        let holder = lock.holder_of(id, 1, 1).await.unwrap().map(|h| h.holder);
        assert_eq!(holder.as_deref(), Some("alice"));

        lock.release(id, 1, 1, "alice").await.unwrap();
        assert!(lock.holder_of(id, 1, 1).await.unwrap().is_none());
        // Releasing again is fine.
        lock.release(id, 1, 1, "alice").await.unwrap();
    }

    #[tokio::test]
    async fn negative_coordinates_are_rejected() {
        let err = lock().acquire(Uuid::new_v4(), -1, 0, "alice").await.unwrap_err();
        assert!(matches!(err, CoreError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn verify_reports_lost_seats() {
        let lock = lock();
        let id = Uuid::new_v4();
        lock.acquire(id, 0, 0, "alice").await.unwrap();
        lock.acquire(id, 0, 1, "bob").await.unwrap();

        let lost = lock
            .verify(id, "alice", &[SeatCoord::new(0, 0), SeatCoord::new(0, 1), SeatCoord::new(0, 2)])
            .await
            .unwrap();
        assert_eq!(lost, vec![SeatCoord::new(0, 1), SeatCoord::new(0, 2)]);
    }

    #[tokio::test]
    async fn held_among_flags_only_live_holds() {
        let lock = lock();
        let id = Uuid::new_v4();
        lock.acquire(id, 0, 2, "alice").await.unwrap();
        let held = lock
            .held_among(id, &[SeatCoord::new(0, 1), SeatCoord::new(0, 2)])
            .await
            .unwrap();
        assert_eq!(held.len(), 1);
        assert!(held.contains(&SeatCoord::new(0, 2)));
    }
}
