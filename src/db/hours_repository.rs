// src/db/hours_repository.rs
// DOCUMENTATION: Structured opening hours storage
// PURPOSE: One row per place per day of week

use crate::errors::DirectoryError;
use crate::models::OpeningHoursRow;
use crate::services::opening_hours::{format_time, DayHours, WeekSchedule};
use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashMap;

pub struct HoursRepository;

impl HoursRepository {
    /// Rows for a place, Monday first
    pub async fn for_place<'e, E>(
        executor: E,
        place_id: i64,
    ) -> Result<Vec<OpeningHoursRow>, DirectoryError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, OpeningHoursRow>(
            r#"
            SELECT place_id, day_of_week, status, opens, closes
            FROM opening_hours
            WHERE place_id = ?
            ORDER BY day_of_week ASC
            "#,
        )
        .bind(place_id)
        .fetch_all(executor)
        .await
        .map_err(|e| {
            log::error!("Failed to fetch hours for place {}: {}", place_id, e);
            DirectoryError::from(e)
        })
    }

    /// Rows of every active place, grouped by place id
    pub async fn for_active_places(
        pool: &SqlitePool,
    ) -> Result<HashMap<i64, Vec<OpeningHoursRow>>, DirectoryError> {
        let rows = sqlx::query_as::<_, OpeningHoursRow>(
            r#"
            SELECT h.place_id, h.day_of_week, h.status, h.opens, h.closes
            FROM opening_hours h
            JOIN places p ON p.id = h.place_id
            WHERE p.is_active = 1
            ORDER BY h.place_id ASC, h.day_of_week ASC
            "#,
        )
        .fetch_all(pool)
        .await?;

        let mut grouped: HashMap<i64, Vec<OpeningHoursRow>> = HashMap::new();
        for row in rows {
            grouped.entry(row.place_id).or_default().push(row);
        }
        Ok(grouped)
    }

    /// Replace every row of a place with the given schedule
    /// DOCUMENTATION: Days absent from the schedule end up with no row
    pub async fn replace(
        conn: &mut SqliteConnection,
        place_id: i64,
        schedule: &WeekSchedule,
    ) -> Result<(), DirectoryError> {
        sqlx::query("DELETE FROM opening_hours WHERE place_id = ?")
            .bind(place_id)
            .execute(&mut *conn)
            .await?;

        for (day, hours) in schedule.iter() {
            let (opens, closes) = match hours {
                DayHours::Open { opens, closes } => {
                    (Some(format_time(opens)), Some(format_time(closes)))
                }
                DayHours::Closed | DayHours::ByAppointment => (None, None),
            };

            sqlx::query(
                r#"
                INSERT INTO opening_hours (place_id, day_of_week, status, opens, closes)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(place_id)
            .bind(day.index() as i64)
            .bind(hours.status().as_str())
            .bind(opens)
            .bind(closes)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                log::error!("Failed to store {:?} hours for place {}: {}", day, place_id, e);
                DirectoryError::from(e)
            })?;
        }

        log::debug!("Stored hours for place {}", place_id);
        Ok(())
    }

    /// Copy all rows from one place to another that has none
    pub async fn copy(
        conn: &mut SqliteConnection,
        from_place: i64,
        to_place: i64,
    ) -> Result<u64, DirectoryError> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO opening_hours (place_id, day_of_week, status, opens, closes)
            SELECT ?, day_of_week, status, opens, closes
            FROM opening_hours
            WHERE place_id = ?
            "#,
        )
        .bind(to_place)
        .bind(from_place)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }
}
