#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use fake::faker::address::en::CityName;
use fake::faker::company::en::CompanyName;
use fake::faker::lorem::en::Sentence;
use fake::Fake;
use std::sync::Arc;
use uuid::Uuid;

use showtime_inventory::config::{HoldConfig, ScheduleConfig};
use showtime_inventory::models::{Movie, Screen, Theater};
use showtime_inventory::services::scheduler::ScheduleRequest;
use showtime_inventory::store::{MemoryHoldStore, MemoryRecordStore};
use showtime_inventory::AppState;

pub struct Fixture {
    pub records: Arc<MemoryRecordStore>,
    pub holds: Arc<MemoryHoldStore>,
    pub state: Arc<AppState>,
    pub movie: Movie,
    pub theater: Theater,
}

impl Fixture {
    pub fn screen(&self) -> &Screen {
        &self.theater.screens[0]
    }

    pub fn request(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        end_date: Option<DateTime<Utc>>,
    ) -> ScheduleRequest {
        ScheduleRequest {
            movie_id: self.movie.id,
            theater_id: self.theater.id,
            screen: self.screen().name.clone(),
            start_time: start,
            end_time: end,
            end_date,
            price: 12.5,
            seat_count: None,
            is_active: None,
        }
    }
}

pub fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

/// One movie and one theater with two screens: "Screen 1" (2 rows of 3) and
/// "Screen 2" (rows of 4, 6, 8).
pub fn fixture() -> Fixture {
    fixture_with(&ScheduleConfig::default())
}

/// Same seed data, scheduled on a custom calendar.
pub fn fixture_with(schedule: &ScheduleConfig) -> Fixture {
    let records = Arc::new(MemoryRecordStore::new());
    let holds = Arc::new(MemoryHoldStore::new());

    let movie = Movie {
        id: Uuid::new_v4(),
        title: Sentence(1..4).fake(),
        duration_minutes: 120,
    };
    let theater = Theater {
        id: Uuid::new_v4(),
        name: CompanyName().fake(),
        city: CityName().fake(),
        screens: vec![
            Screen {
                id: Uuid::new_v4(),
                name: "Screen 1".to_string(),
                capacity: 6,
                seat_layout: vec![3, 3],
            },
            Screen {
                id: Uuid::new_v4(),
                name: "Screen 2".to_string(),
                capacity: 18,
                seat_layout: vec![4, 6, 8],
            },
        ],
    };
    records.insert_movie(movie.clone()).unwrap();
    records.insert_theater(theater.clone()).unwrap();

    let state = AppState::new(
        records.clone(),
        holds.clone(),
        schedule,
        &HoldConfig::default(),
    );

    Fixture { records, holds, state, movie, theater }
}
