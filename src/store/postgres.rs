use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{error, info};
use uuid::Uuid;

use crate::database::Database;
use crate::models::{
    Movie, NewShowtime, SeatCoord, Screen, Showtime, ShowtimeFilter, ShowtimeWindow, Theater,
};
use crate::store::{RecordStore, StoreError, StoreResult};

const SHOWTIME_COLUMNS: &str = "id, movie_id, theater_id, screen, start_time, end_time, price, \
     total_seats, available_seats, is_active, created_at";

/// SQLSTATE for `exclusion_violation`.
const EXCLUSION_VIOLATION: &str = "23P01";

#[derive(Clone)]
pub struct PgRecordStore {
    db: Database,
}

impl PgRecordStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn map_sqlx(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(err.to_string())
        }
        other => {
            error!("sql error: {:?}", other);
            StoreError::Backend(other.to_string())
        }
    }
}

fn is_exclusion_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(EXCLUSION_VIOLATION))
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn find_movie(&self, id: Uuid) -> StoreResult<Option<Movie>> {
        sqlx::query_as::<_, Movie>("SELECT id, title, duration_minutes FROM movies WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db.pool)
            .await
            .map_err(map_sqlx)
    }

    async fn find_theater(&self, id: Uuid) -> StoreResult<Option<Theater>> {
        let row = sqlx::query_as::<_, (Uuid, String, String)>(
            "SELECT id, name, city FROM theaters WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db.pool)
        .await
        .map_err(map_sqlx)?;

        let Some((id, name, city)) = row else {
            return Ok(None);
        };

        let screens = sqlx::query_as::<_, Screen>(
            "SELECT id, name, capacity, seat_layout
             FROM screens
             WHERE theater_id = $1
             ORDER BY position, name",
        )
        .bind(id)
        .fetch_all(&self.db.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(Some(Theater { id, name, city, screens }))
    }

    async fn find_overlapping(
        &self,
        theater_id: Uuid,
        screen: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Option<Showtime>> {
        let q = format!(
            "SELECT {SHOWTIME_COLUMNS}
             FROM showtimes
             WHERE theater_id = $1 AND screen = $2
               AND start_time < $3 AND end_time > $4
             ORDER BY start_time
             LIMIT 1"
        );
        sqlx::query_as::<_, Showtime>(&q)
            .bind(theater_id)
            .bind(screen)
            .bind(end)
            .bind(start)
            .fetch_optional(&self.db.pool)
            .await
            .map_err(map_sqlx)
    }

    async fn insert_showtimes(&self, batch: Vec<NewShowtime>) -> StoreResult<Vec<Showtime>> {
        let mut tx = self.db.pool.begin().await.map_err(map_sqlx)?;
        let q = format!(
            "INSERT INTO showtimes
                (id, movie_id, theater_id, screen, start_time, end_time, price,
                 total_seats, available_seats, is_active)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8, $9)
             RETURNING {SHOWTIME_COLUMNS}"
        );

        let mut created = Vec::with_capacity(batch.len());
        for show in batch {
            let res = sqlx::query_as::<_, Showtime>(&q)
                .bind(Uuid::new_v4())
                .bind(show.movie_id)
                .bind(show.theater_id)
                .bind(&show.screen)
                .bind(show.start_time)
                .bind(show.end_time)
                .bind(show.price)
                .bind(show.total_seats)
                .bind(show.is_active)
                .fetch_one(&mut *tx)
                .await;

            match res {
                Ok(row) => created.push(row),
                Err(e) => {
                    // The whole batch is abandoned on the first failure.
                    let _ = tx.rollback().await;
                    if is_exclusion_violation(&e) {
                        return Err(StoreError::Overlap {
                            theater_id: show.theater_id,
                            screen: show.screen,
                            start: show.start_time,
                            end: show.end_time,
                        });
                    }
                    return Err(map_sqlx(e));
                }
            }
        }

        tx.commit().await.map_err(map_sqlx)?;
        Ok(created)
    }

    async fn find_showtime(&self, id: Uuid) -> StoreResult<Option<Showtime>> {
        let q = format!("SELECT {SHOWTIME_COLUMNS} FROM showtimes WHERE id = $1");
        sqlx::query_as::<_, Showtime>(&q)
            .bind(id)
            .fetch_optional(&self.db.pool)
            .await
            .map_err(map_sqlx)
    }

    async fn list_showtimes(
        &self,
        filter: &ShowtimeFilter,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Showtime>> {
        let mut q = format!("SELECT {SHOWTIME_COLUMNS} FROM showtimes WHERE TRUE");
        let mut bind_idx = 1;

        let uses_now = filter.window != ShowtimeWindow::All;
        if uses_now {
            let now_idx = bind_idx;
            bind_idx += 1;
            let clause = match filter.window {
                ShowtimeWindow::Current => format!(
                    " AND start_time <= ${now_idx} + interval '1 hour'
                      AND end_time >= ${now_idx} - interval '1 hour'"
                ),
                ShowtimeWindow::Upcoming => format!(" AND start_time > ${now_idx}"),
                ShowtimeWindow::Available => {
                    format!(" AND start_time > ${now_idx} AND available_seats > 0")
                }
                ShowtimeWindow::Past => format!(" AND end_time < ${now_idx}"),
                ShowtimeWindow::All => String::new(),
            };
            q.push_str(&clause);
        }
        if filter.movie_id.is_some() {
            q.push_str(&format!(" AND movie_id = ${}", bind_idx));
            bind_idx += 1;
        }
        if filter.theater_id.is_some() {
            q.push_str(&format!(" AND theater_id = ${}", bind_idx));
            bind_idx += 1;
        }
        q.push_str(match filter.window {
            ShowtimeWindow::Past => " ORDER BY start_time DESC, id",
            _ => " ORDER BY start_time, id",
        });
        if filter.page.is_some() {
            q.push_str(&format!(" LIMIT ${} OFFSET ${}", bind_idx, bind_idx + 1));
        }

        let mut dbq = sqlx::query_as::<_, Showtime>(&q);
        if uses_now {
            dbq = dbq.bind(now);
        }
        if let Some(id) = filter.movie_id {
            dbq = dbq.bind(id);
        }
        if let Some(id) = filter.theater_id {
            dbq = dbq.bind(id);
        }
        if let Some(page) = filter.page {
            dbq = dbq.bind(i64::from(page.limit)).bind(i64::from(page.offset));
        }

        dbq.fetch_all(&self.db.pool).await.map_err(map_sqlx)
    }

    async fn delete_showtime(&self, id: Uuid) -> StoreResult<bool> {
        sqlx::query("DELETE FROM showtimes WHERE id = $1")
            .bind(id)
            .execute(&self.db.pool)
            .await
            .map(|r| r.rows_affected() > 0)
            .map_err(map_sqlx)
    }

    async fn delete_movie(&self, id: Uuid) -> StoreResult<Option<u64>> {
        let mut tx = self.db.pool.begin().await.map_err(map_sqlx)?;

        let removed = sqlx::query("DELETE FROM showtimes WHERE movie_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?
            .rows_affected();

        let deleted = sqlx::query("DELETE FROM movies WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?
            .rows_affected();

        if deleted == 0 {
            let _ = tx.rollback().await;
            return Ok(None);
        }

        tx.commit().await.map_err(map_sqlx)?;
        info!("Deleted movie {} and {} showtimes", id, removed);
        Ok(Some(removed))
    }

    async fn delete_theater(&self, id: Uuid) -> StoreResult<Option<u64>> {
        let mut tx = self.db.pool.begin().await.map_err(map_sqlx)?;

        let removed = sqlx::query("DELETE FROM showtimes WHERE theater_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?
            .rows_affected();

        let deleted = sqlx::query("DELETE FROM theaters WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?
            .rows_affected();

        if deleted == 0 {
            let _ = tx.rollback().await;
            return Ok(None);
        }

        tx.commit().await.map_err(map_sqlx)?;
        info!("Deleted theater {} and {} showtimes", id, removed);
        Ok(Some(removed))
    }

    async fn booked_seats(&self, showtime_id: Uuid) -> StoreResult<Vec<SeatCoord>> {
        let rows = sqlx::query_as::<_, (i32, i32)>(
            r#"
            SELECT bs.seat_row, bs.seat_number
            FROM booking_seats bs
            JOIN bookings b ON b.id = bs.booking_id
            WHERE b.showtime_id = $1 AND b.status = 'confirmed'
            "#,
        )
        .bind(showtime_id)
        .fetch_all(&self.db.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(rows.into_iter().map(|(row, seat)| SeatCoord { row, seat }).collect())
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.db.pool)
            .await
            .map(|_| ())
            .map_err(map_sqlx)
    }
}
