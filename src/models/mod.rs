pub mod movie;
pub mod theater;
pub mod showtime;
pub mod seat;

pub use movie::Movie;
pub use theater::{Screen, Theater};
pub use showtime::{NewShowtime, Page, Showtime, ShowtimeFilter, ShowtimeWindow};
pub use seat::{SeatCell, SeatCoord, SeatMap, SeatStatus};
