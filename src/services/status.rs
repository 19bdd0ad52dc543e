//! Realtime lifecycle status of a showtime relative to "now".
//!
//! Pure and allocation-light: safe to call from any handler without
//! synchronization. Calendar-day labels ("Today", "Tomorrow") are computed in
//! the engine's configured UTC offset.

use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::models::Showtime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShowPhase {
    Live,
    StartingSoon,
    UpcomingToday,
    Upcoming,
    Completed,
}

impl ShowPhase {
    /// Lower sorts first.
    pub fn priority(self) -> u8 {
        match self {
            ShowPhase::Live => 1,
            ShowPhase::StartingSoon => 2,
            ShowPhase::UpcomingToday => 3,
            ShowPhase::Upcoming => 4,
            ShowPhase::Completed => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ShowPhase::Live => "live",
            ShowPhase::StartingSoon => "starting-soon",
            ShowPhase::UpcomingToday => "upcoming-today",
            ShowPhase::Upcoming => "upcoming",
            ShowPhase::Completed => "completed",
        }
    }
}

impl FromStr for ShowPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "live" => Ok(ShowPhase::Live),
            "starting-soon" => Ok(ShowPhase::StartingSoon),
            "upcoming-today" => Ok(ShowPhase::UpcomingToday),
            "upcoming" => Ok(ShowPhase::Upcoming),
            "completed" => Ok(ShowPhase::Completed),
            other => Err(format!("unknown showtime status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RealtimeStatus {
    pub status: ShowPhase,
    pub label: &'static str,
    pub description: String,
    pub sort_order: u8,
}

impl RealtimeStatus {
    fn new(status: ShowPhase, label: &'static str, description: String) -> Self {
        Self { status, label, description, sort_order: status.priority() }
    }
}

/// A showtime annotated for a caller. Never written back to the store.
#[derive(Debug, Clone, Serialize)]
pub struct ShowtimeWithStatus {
    #[serde(flatten)]
    pub showtime: Showtime,
    pub realtime_status: RealtimeStatus,
}

#[derive(Debug, Clone, Copy)]
pub struct StatusEngine {
    offset: FixedOffset,
}

impl Default for StatusEngine {
    fn default() -> Self {
        Self::new(Utc.fix())
    }
}

/// Whole minutes, rounded up; only used for durations known to be positive.
fn minutes_ceil(d: Duration) -> i64 {
    (d.num_milliseconds() + 59_999) / 60_000
}

impl StatusEngine {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn classify(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> RealtimeStatus {
        if start <= now && now <= end {
            let left = (end - now).num_minutes();
            return RealtimeStatus::new(ShowPhase::Live, "Live Now", format!("Ends in {left} min"));
        }

        let until_start = start - now;
        if until_start <= Duration::zero() {
            return RealtimeStatus::new(
                ShowPhase::Completed,
                "Completed",
                "Show ended".to_string(),
            );
        }

        let minutes = minutes_ceil(until_start);
        if until_start <= Duration::minutes(30) {
            RealtimeStatus::new(
                ShowPhase::StartingSoon,
                "Starting Soon",
                format!("Starts in {minutes} min"),
            )
        } else if until_start <= Duration::minutes(120) {
            RealtimeStatus::new(
                ShowPhase::UpcomingToday,
                "Today",
                format!("Starts in {}h {}m", minutes / 60, minutes % 60),
            )
        } else {
            let local_start = start.with_timezone(&self.offset);
            let today = now.with_timezone(&self.offset).date_naive();
            let tomorrow = (now + Duration::days(1)).with_timezone(&self.offset).date_naive();
            let label = if local_start.date_naive() == today {
                "Today"
            } else if local_start.date_naive() == tomorrow {
                "Tomorrow"
            } else {
                "Upcoming"
            };
            RealtimeStatus::new(
                ShowPhase::Upcoming,
                label,
                local_start.format("%a %b %d %Y %H:%M").to_string(),
            )
        }
    }

    pub fn annotate(&self, showtime: Showtime, now: DateTime<Utc>) -> ShowtimeWithStatus {
        let realtime_status = self.classify(showtime.start_time, showtime.end_time, now);
        ShowtimeWithStatus { showtime, realtime_status }
    }

    /// Annotates every showtime and orders by priority, then start time.
    pub fn classify_all(
        &self,
        showtimes: Vec<Showtime>,
        now: DateTime<Utc>,
    ) -> Vec<ShowtimeWithStatus> {
        let mut annotated: Vec<ShowtimeWithStatus> =
            showtimes.into_iter().map(|s| self.annotate(s, now)).collect();
        annotated.sort_by(|a, b| {
            a.realtime_status
                .sort_order
                .cmp(&b.realtime_status.sort_order)
                .then(a.showtime.start_time.cmp(&b.showtime.start_time))
        });
        annotated
    }
}

/// UTC calendar variant of [`StatusEngine::classify`].
pub fn classify(start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> RealtimeStatus {
    StatusEngine::default().classify(start, end, now)
}

/// Keeps showtimes in the given phase; `None` keeps everything.
pub fn filter_by_status(
    showtimes: Vec<ShowtimeWithStatus>,
    phase: Option<ShowPhase>,
) -> Vec<ShowtimeWithStatus> {
    match phase {
        None => showtimes,
        Some(phase) => showtimes
            .into_iter()
            .filter(|s| s.realtime_status.status == phase)
            .collect(),
    }
}
