// src/db/place_type_repository.rs
// DOCUMENTATION: Place type database operations
// PURPOSE: CRUD for venue categories

use crate::errors::DirectoryError;
use crate::models::PlaceType;
use sqlx::SqlitePool;

pub struct PlaceTypeRepository;

impl PlaceTypeRepository {
    pub async fn list(pool: &SqlitePool) -> Result<Vec<PlaceType>, DirectoryError> {
        let types = sqlx::query_as::<_, PlaceType>(
            "SELECT id, name, slug, description FROM place_types ORDER BY name COLLATE NOCASE",
        )
        .fetch_all(pool)
        .await
        .map_err(|e| {
            log::error!("Failed to list place types: {}", e);
            DirectoryError::from(e)
        })?;
        Ok(types)
    }

    pub async fn get(pool: &SqlitePool, id: i64) -> Result<PlaceType, DirectoryError> {
        sqlx::query_as::<_, PlaceType>(
            "SELECT id, name, slug, description FROM place_types WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DirectoryError::NotFound(format!("place type {}", id)))
    }

    pub async fn create(
        pool: &SqlitePool,
        name: &str,
        slug: &str,
        description: Option<&str>,
    ) -> Result<PlaceType, DirectoryError> {
        let id = sqlx::query("INSERT INTO place_types (name, slug, description) VALUES (?, ?, ?)")
            .bind(name)
            .bind(slug)
            .bind(description)
            .execute(pool)
            .await
            .map_err(|e| {
                log::error!("Failed to create place type {}: {}", name, e);
                DirectoryError::from(e)
            })?
            .last_insert_rowid();

        log::info!("Created place type {} ({})", slug, id);
        Self::get(pool, id).await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        name: &str,
        slug: &str,
        description: Option<&str>,
    ) -> Result<PlaceType, DirectoryError> {
        let rows = sqlx::query(
            "UPDATE place_types SET name = ?, slug = ?, description = COALESCE(?, description) WHERE id = ?",
        )
        .bind(name)
        .bind(slug)
        .bind(description)
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(DirectoryError::NotFound(format!("place type {}", id)));
        }
        Self::get(pool, id).await
    }

    /// Number of places (active or not) still pointing at the type
    pub async fn usage(pool: &SqlitePool, id: i64) -> Result<i64, DirectoryError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM places WHERE place_type_id = ?")
                .bind(id)
                .fetch_one(pool)
                .await?;
        Ok(count)
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<(), DirectoryError> {
        let in_use = Self::usage(pool, id).await?;
        if in_use > 0 {
            return Err(DirectoryError::Conflict(format!(
                "place type {} is used by {} place(s)",
                id, in_use
            )));
        }

        let rows = sqlx::query("DELETE FROM place_types WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(DirectoryError::NotFound(format!("place type {}", id)));
        }

        log::info!("Deleted place type {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{test_pool, PlaceRepository};
    use crate::models::CreatePlaceRequest;

    #[tokio::test]
    async fn test_create_and_list() {
        let pool = test_pool().await;
        PlaceTypeRepository::create(&pool, "Auction House", "auction-house", None)
            .await
            .unwrap();
        PlaceTypeRepository::create(&pool, "Antique Shop", "antique-shop", Some("Retail"))
            .await
            .unwrap();

        let types = PlaceTypeRepository::list(&pool).await.unwrap();
        assert_eq!(types.len(), 2);
        assert_eq!(types[0].slug, "antique-shop");
    }

    #[tokio::test]
    async fn test_duplicate_name_conflicts() {
        let pool = test_pool().await;
        PlaceTypeRepository::create(&pool, "Centre", "centre", None)
            .await
            .unwrap();
        let err = PlaceTypeRepository::create(&pool, "Centre", "centre", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DirectoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_delete_in_use_conflicts() {
        let pool = test_pool().await;
        let shop = PlaceTypeRepository::create(&pool, "Shop", "shop", None)
            .await
            .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let req = CreatePlaceRequest {
            name: "Typed".into(),
            place_type_id: Some(shop.id),
            ..Default::default()
        };
        PlaceRepository::insert(&mut conn, &req, "typed", None)
            .await
            .unwrap();
        drop(conn);

        assert!(matches!(
            PlaceTypeRepository::delete(&pool, shop.id).await,
            Err(DirectoryError::Conflict(_))
        ));
        assert!(matches!(
            PlaceTypeRepository::delete(&pool, 999).await,
            Err(DirectoryError::NotFound(_))
        ));
    }
}
