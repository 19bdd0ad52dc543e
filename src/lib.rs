pub mod config;
pub mod database;
pub mod redis_client;
pub mod error;
pub mod models;
pub mod store;
pub mod services;
pub mod controllers;
pub mod middleware;

use std::sync::Arc;

use config::{HoldConfig, ScheduleConfig};
use services::{
    scheduler::Scheduler, seat_lock::SeatLock, seat_map::SeatInventory, status::StatusEngine,
};
use store::{HoldStore, RecordStore};

// Shared state for every request handler. Store handles are built once at
// startup and injected here.
#[derive(Clone)]
pub struct AppState {
    pub records: Arc<dyn RecordStore>,
    pub holds: Arc<dyn HoldStore>,
    pub scheduler: Arc<Scheduler>,
    pub seat_lock: Arc<SeatLock>,
    pub seats: Arc<SeatInventory>,
    pub status: StatusEngine,
}

impl AppState {
    pub fn new(
        records: Arc<dyn RecordStore>,
        holds: Arc<dyn HoldStore>,
        schedule: &ScheduleConfig,
        hold_config: &HoldConfig,
    ) -> Arc<Self> {
        let scheduler = Arc::new(Scheduler::new(records.clone(), schedule));
        let seat_lock = Arc::new(SeatLock::new(holds.clone(), hold_config));
        let seats = Arc::new(SeatInventory::new(records.clone(), seat_lock.clone()));

        Arc::new(Self {
            records,
            holds,
            scheduler,
            seat_lock,
            seats,
            status: StatusEngine::new(schedule.offset()),
        })
    }
}
