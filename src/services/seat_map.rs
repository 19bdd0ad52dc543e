use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::models::{SeatCell, SeatCoord, SeatMap, SeatStatus};
use crate::services::seat_lock::SeatLock;
use crate::store::RecordStore;

/// Row-major grid for a layout; row `r` gets `layout[r]` cells.
pub fn render_grid(layout: &[i32], booked: &HashSet<SeatCoord>, price: f64) -> Vec<Vec<SeatCell>> {
    layout
        .iter()
        .enumerate()
        .map(|(r, width)| {
            let row = r as i32;
            (0..(*width).max(0))
                .map(|seat| SeatCell {
                    row,
                    seat,
                    status: if booked.contains(&SeatCoord { row, seat }) {
                        SeatStatus::Booked
                    } else {
                        SeatStatus::Available
                    },
                    price,
                })
                .collect()
        })
        .collect()
}

pub struct SeatInventory {
    store: Arc<dyn RecordStore>,
    lock: Arc<SeatLock>,
}

impl SeatInventory {
    pub fn new(store: Arc<dyn RecordStore>, lock: Arc<SeatLock>) -> Self {
        Self { store, lock }
    }

    /// Seat availability from confirmed bookings only. Live holds are not
    /// reflected; see [`SeatInventory::build_selectable_seat_map`].
    pub async fn build_seat_map(&self, showtime_id: Uuid) -> CoreResult<SeatMap> {
        let showtime = self
            .store
            .find_showtime(showtime_id)
            .await?
            .ok_or_else(|| CoreError::not_found("showtime", showtime_id))?;

        let (theater, booked) = futures::try_join!(
            self.store.find_theater(showtime.theater_id),
            self.store.booked_seats(showtime_id),
        )?;

        let theater = theater.ok_or_else(|| CoreError::not_found("theater", showtime.theater_id))?;
        let Some(screen) = theater.screens.iter().find(|s| s.name == showtime.screen) else {
            warn!(
                "Showtime {} references screen '{}' missing from theater {}",
                showtime_id, showtime.screen, theater.id
            );
            return Err(CoreError::not_found("screen", &showtime.screen));
        };

        let booked: HashSet<SeatCoord> = booked.into_iter().collect();
        debug!("Seat map for {}: {} booked seats", showtime_id, booked.len());

        Ok(SeatMap {
            showtime: showtime.id,
            screen: screen.name.clone(),
            total_seats: screen.capacity,
            available_seats: showtime.available_seats,
            grid: render_grid(&screen.seat_layout, &booked, showtime.price),
        })
    }

    /// Seat map with available seats under a live hold marked `held`.
    pub async fn build_selectable_seat_map(&self, showtime_id: Uuid) -> CoreResult<SeatMap> {
        let mut map = self.build_seat_map(showtime_id).await?;

        let candidates: Vec<SeatCoord> = map
            .cells()
            .filter(|c| c.status == SeatStatus::Available)
            .map(|c| SeatCoord { row: c.row, seat: c.seat })
            .collect();
        let held = self.lock.held_among(showtime_id, &candidates).await?;

        for cell in map.grid.iter_mut().flatten() {
            if cell.status == SeatStatus::Available && held.contains(&SeatCoord { row: cell.row, seat: cell.seat }) {
                cell.status = SeatStatus::Held;
            }
        }
        Ok(map)
    }
}
