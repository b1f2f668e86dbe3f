// src/db/specialty_repository.rs
// DOCUMENTATION: Specialty tags and their assignment to places
// PURPOSE: Hierarchical tag storage plus the place_specialties junction

use crate::errors::DirectoryError;
use crate::models::Specialty;
use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};

pub struct SpecialtyRepository;

impl SpecialtyRepository {
    pub async fn list(pool: &SqlitePool) -> Result<Vec<Specialty>, DirectoryError> {
        let specialties = sqlx::query_as::<_, Specialty>(
            "SELECT id, name, slug, parent_id FROM specialties ORDER BY name COLLATE NOCASE",
        )
        .fetch_all(pool)
        .await
        .map_err(|e| {
            log::error!("Failed to list specialties: {}", e);
            DirectoryError::from(e)
        })?;
        Ok(specialties)
    }

    pub async fn get(pool: &SqlitePool, id: i64) -> Result<Specialty, DirectoryError> {
        sqlx::query_as::<_, Specialty>(
            "SELECT id, name, slug, parent_id FROM specialties WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DirectoryError::NotFound(format!("specialty {}", id)))
    }

    pub async fn create(
        pool: &SqlitePool,
        name: &str,
        slug: &str,
        parent_id: Option<i64>,
    ) -> Result<Specialty, DirectoryError> {
        let id = sqlx::query("INSERT INTO specialties (name, slug, parent_id) VALUES (?, ?, ?)")
            .bind(name)
            .bind(slug)
            .bind(parent_id)
            .execute(pool)
            .await
            .map_err(|e| {
                log::error!("Failed to create specialty {}: {}", name, e);
                DirectoryError::from(e)
            })?
            .last_insert_rowid();

        log::info!("Created specialty {} ({})", slug, id);
        Self::get(pool, id).await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        name: &str,
        slug: &str,
        parent_id: Option<i64>,
    ) -> Result<Specialty, DirectoryError> {
        let rows = sqlx::query("UPDATE specialties SET name = ?, slug = ?, parent_id = ? WHERE id = ?")
            .bind(name)
            .bind(slug)
            .bind(parent_id)
            .bind(id)
            .execute(pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(DirectoryError::NotFound(format!("specialty {}", id)));
        }
        Self::get(pool, id).await
    }

    /// Children of a deleted specialty become roots (ON DELETE SET NULL)
    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<(), DirectoryError> {
        let rows = sqlx::query("DELETE FROM specialties WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(DirectoryError::NotFound(format!("specialty {}", id)));
        }
        log::info!("Deleted specialty {}", id);
        Ok(())
    }

    /// Ids of `id` and every ancestor above it
    pub async fn ancestry(pool: &SqlitePool, id: i64) -> Result<Vec<i64>, DirectoryError> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            r#"
            WITH RECURSIVE up(id, parent_id) AS (
                SELECT id, parent_id FROM specialties WHERE id = ?
                UNION
                SELECT s.id, s.parent_id FROM specialties s JOIN up ON s.id = up.parent_id
            )
            SELECT id FROM up
            "#,
        )
        .bind(id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// How many of the given ids exist
    pub async fn count_existing(pool: &SqlitePool, ids: &[i64]) -> Result<usize, DirectoryError> {
        let mut found = 0;
        for id in ids {
            let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM specialties WHERE id = ?")
                .bind(id)
                .fetch_optional(pool)
                .await?;
            if row.is_some() {
                found += 1;
            }
        }
        Ok(found)
    }

    /// Specialties attached to a place
    pub async fn for_place<'e, E>(executor: E, place_id: i64) -> Result<Vec<Specialty>, DirectoryError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let specialties = sqlx::query_as::<_, Specialty>(
            r#"
            SELECT s.id, s.name, s.slug, s.parent_id
            FROM specialties s
            JOIN place_specialties ps ON ps.specialty_id = s.id
            WHERE ps.place_id = ?
            ORDER BY s.name COLLATE NOCASE
            "#,
        )
        .bind(place_id)
        .fetch_all(executor)
        .await?;
        Ok(specialties)
    }

    /// Add tags to a place, keeping the ones it already has
    pub async fn attach(
        conn: &mut SqliteConnection,
        place_id: i64,
        specialty_ids: &[i64],
    ) -> Result<(), DirectoryError> {
        for specialty_id in specialty_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO place_specialties (place_id, specialty_id) VALUES (?, ?)",
            )
            .bind(place_id)
            .bind(specialty_id)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    /// Make `specialty_ids` the full set of tags on a place
    pub async fn replace_for_place(
        conn: &mut SqliteConnection,
        place_id: i64,
        specialty_ids: &[i64],
    ) -> Result<(), DirectoryError> {
        sqlx::query("DELETE FROM place_specialties WHERE place_id = ?")
            .bind(place_id)
            .execute(&mut *conn)
            .await?;
        Self::attach(conn, place_id, specialty_ids).await
    }

    /// Move every tag of one place onto another
    pub async fn copy(
        conn: &mut SqliteConnection,
        from_place: i64,
        to_place: i64,
    ) -> Result<(), DirectoryError> {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO place_specialties (place_id, specialty_id)
            SELECT ?, specialty_id FROM place_specialties WHERE place_id = ?
            "#,
        )
        .bind(to_place)
        .bind(from_place)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{test_pool, PlaceRepository};
    use crate::models::CreatePlaceRequest;

    #[tokio::test]
    async fn test_ancestry_walks_to_root() {
        let pool = test_pool().await;
        let silver = SpecialtyRepository::create(&pool, "Silver", "silver", None)
            .await
            .unwrap();
        let scottish = SpecialtyRepository::create(&pool, "Scottish Silver", "scottish-silver", Some(silver.id))
            .await
            .unwrap();
        let quaichs = SpecialtyRepository::create(&pool, "Quaichs", "quaichs", Some(scottish.id))
            .await
            .unwrap();

        let mut ancestry = SpecialtyRepository::ancestry(&pool, quaichs.id).await.unwrap();
        ancestry.sort();
        assert_eq!(ancestry, vec![silver.id, scottish.id, quaichs.id]);
    }

    #[tokio::test]
    async fn test_delete_orphans_children() {
        let pool = test_pool().await;
        let parent = SpecialtyRepository::create(&pool, "Clocks", "clocks", None)
            .await
            .unwrap();
        let child = SpecialtyRepository::create(&pool, "Longcase", "longcase", Some(parent.id))
            .await
            .unwrap();

        SpecialtyRepository::delete(&pool, parent.id).await.unwrap();

        let child = SpecialtyRepository::get(&pool, child.id).await.unwrap();
        assert_eq!(child.parent_id, None);
    }

    #[tokio::test]
    async fn test_replace_for_place() {
        let pool = test_pool().await;
        let a = SpecialtyRepository::create(&pool, "Maps", "maps", None).await.unwrap();
        let b = SpecialtyRepository::create(&pool, "Prints", "prints", None).await.unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let req = CreatePlaceRequest {
            name: "Paper Shop".into(),
            ..Default::default()
        };
        let place = PlaceRepository::insert(&mut conn, &req, "paper-shop", None)
            .await
            .unwrap();
        SpecialtyRepository::attach(&mut conn, place, &[a.id]).await.unwrap();
        SpecialtyRepository::replace_for_place(&mut conn, place, &[b.id]).await.unwrap();
        drop(conn);

        let tags = SpecialtyRepository::for_place(&pool, place).await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].slug, "prints");
        assert_eq!(SpecialtyRepository::count_existing(&pool, &[a.id, 999]).await.unwrap(), 1);
    }
}
