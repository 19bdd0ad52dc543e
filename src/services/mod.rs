pub mod scheduler;
pub mod seat_lock;
pub mod seat_map;
pub mod status;
