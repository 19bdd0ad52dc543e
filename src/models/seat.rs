use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Zero-based seat coordinate inside a screen layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, FromRow, Serialize, Deserialize)]
pub struct SeatCoord {
    pub row: i32,
    pub seat: i32,
}

impl SeatCoord {
    pub fn new(row: i32, seat: i32) -> Self {
        Self { row, seat }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatStatus {
    Available,
    Booked,
    /// Temporarily held by a seat lock; only reported by the selectable map.
    Held,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatCell {
    pub row: i32,
    pub seat: i32,
    pub status: SeatStatus,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatMap {
    pub showtime: Uuid,
    pub screen: String,
    pub total_seats: i32,
    pub available_seats: i32,
    pub grid: Vec<Vec<SeatCell>>,
}

impl SeatMap {
    pub fn cells(&self) -> impl Iterator<Item = &SeatCell> {
        self.grid.iter().flatten()
    }

    pub fn cell(&self, coord: SeatCoord) -> Option<&SeatCell> {
        let row = usize::try_from(coord.row).ok()?;
        let seat = usize::try_from(coord.seat).ok()?;
        self.grid.get(row)?.get(seat)
    }

    pub fn count(&self, status: SeatStatus) -> usize {
        self.cells().filter(|c| c.status == status).count()
    }
}
