use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Screen {
    pub id: Uuid,
    pub name: String,
    pub capacity: i32,
    /// Seat count per row, front to back.
    pub seat_layout: Vec<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theater {
    pub id: Uuid,
    pub name: String,
    pub city: String,
    pub screens: Vec<Screen>,
}

impl Theater {
    /// Finds a screen by name, or by id when the identifier parses as one.
    pub fn resolve_screen(&self, identifier: &str) -> Option<&Screen> {
        let as_id = Uuid::parse_str(identifier).ok();
        self.screens
            .iter()
            .find(|s| s.name == identifier || Some(s.id) == as_id)
    }
}
