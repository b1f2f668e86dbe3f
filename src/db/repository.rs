// src/db/repository.rs
// DOCUMENTATION: Database access layer for places
// PURPOSE: Abstract database operations from business logic

use crate::errors::DirectoryError;
use crate::models::*;
use chrono::Utc;
use sqlx::{Executor, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

/// Column list shared by every place query (table alias `p`)
const PLACE_COLUMNS: &str = r#"
    p.id, p.name, p.slug, p.description, p.place_type_id,
    p.address, p.town, p.postcode, p.phone, p.email, p.website,
    p.latitude, p.longitude, p.hours_text,
    p.is_active, p.merged_into, p.created_at, p.updated_at
"#;

/// PlaceRepository: All database operations for places
/// DOCUMENTATION: Single-query helpers are generic over the executor so they
/// work on the pool and inside a transaction alike
pub struct PlaceRepository;

impl PlaceRepository {
    /// Insert a new place and return its id
    /// DOCUMENTATION: Caller has already normalised contact fields and picked a free slug
    pub async fn insert(
        conn: &mut SqliteConnection,
        req: &CreatePlaceRequest,
        slug: &str,
        hours_text: Option<&str>,
    ) -> Result<i64, DirectoryError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO places (
                name, slug, description, place_type_id,
                address, town, postcode, phone, email, website,
                latitude, longitude, hours_text,
                is_active, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(&req.name)
        .bind(slug)
        .bind(&req.description)
        .bind(req.place_type_id)
        .bind(&req.address)
        .bind(&req.town)
        .bind(&req.postcode)
        .bind(&req.phone)
        .bind(&req.email)
        .bind(&req.website)
        .bind(req.latitude)
        .bind(req.longitude)
        .bind(hours_text)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            log::error!("Failed to create place {}: {}", req.name, e);
            DirectoryError::from(e)
        })?;

        let id = result.last_insert_rowid();
        log::info!("Created place {} with id: {}", slug, id);
        Ok(id)
    }

    /// Fetch a place whether or not it is still active
    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Place>, DirectoryError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("SELECT {} FROM places p WHERE p.id = ?", PLACE_COLUMNS);
        sqlx::query_as::<_, Place>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
            .map_err(|e| {
                log::error!("Database error fetching place {}: {}", id, e);
                DirectoryError::from(e)
            })
    }

    /// Retrieve an active place by ID
    /// DOCUMENTATION: Used for GET /places/{id}; deleted and merged places are not found
    pub async fn get_by_id<'e, E>(executor: E, id: i64) -> Result<Place, DirectoryError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        match Self::find_by_id(executor, id).await? {
            Some(place) if place.is_active => Ok(place),
            _ => {
                log::warn!("Place not found: {}", id);
                Err(DirectoryError::NotFound(format!("place {}", id)))
            }
        }
    }

    /// Retrieve an active place by slug
    pub async fn get_by_slug(pool: &SqlitePool, slug: &str) -> Result<Place, DirectoryError> {
        let sql = format!(
            "SELECT {} FROM places p WHERE p.slug = ? AND p.is_active = 1",
            PLACE_COLUMNS
        );
        sqlx::query_as::<_, Place>(&sql)
            .bind(slug)
            .fetch_optional(pool)
            .await
            .map_err(|e| {
                log::error!("Failed to get place by slug {}: {}", slug, e);
                DirectoryError::from(e)
            })?
            .ok_or_else(|| {
                log::warn!("Place not found with slug: {}", slug);
                DirectoryError::NotFound(format!("place '{}'", slug))
            })
    }

    /// Whether a slug is taken, by active or retired places alike
    pub async fn slug_exists<'e, E>(executor: E, slug: &str) -> Result<bool, DirectoryError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let found: Option<(i64,)> = sqlx::query_as("SELECT id FROM places WHERE slug = ?")
            .bind(slug)
            .fetch_optional(executor)
            .await?;
        Ok(found.is_some())
    }

    /// Active places matching the SQL-side filters of a listing, ordered by name
    /// DOCUMENTATION: Proximity and open-now filters need Rust-side evaluation
    /// and are applied by PlaceService on the result
    pub async fn list_filtered(
        pool: &SqlitePool,
        query: &ListQuery,
    ) -> Result<Vec<Place>, DirectoryError> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM places p LEFT JOIN place_types t ON t.id = p.place_type_id WHERE p.is_active = 1",
            PLACE_COLUMNS
        ));

        // Text search
        if let Some(q) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let pattern = format!("%{}%", q);
            qb.push(" AND (p.name LIKE ")
                .push_bind(pattern.clone())
                .push(" OR p.description LIKE ")
                .push_bind(pattern.clone())
                .push(" OR p.town LIKE ")
                .push_bind(pattern)
                .push(")");
        }

        // Town filter
        if let Some(town) = query.town.as_deref().filter(|t| !t.trim().is_empty()) {
            qb.push(" AND p.town LIKE ")
                .push_bind(format!("%{}%", town.trim()));
        }

        // Type filter
        if let Some(type_slug) = &query.type_ {
            qb.push(" AND t.slug = ").push_bind(type_slug.clone());
        }

        // Specialty filter, descendants included
        if let Some(specialty) = &query.specialty {
            qb.push(
                r#" AND p.id IN (
                    SELECT ps.place_id FROM place_specialties ps
                    WHERE ps.specialty_id IN (
                        WITH RECURSIVE tree(id) AS (
                            SELECT id FROM specialties WHERE slug = "#,
            )
            .push_bind(specialty.clone())
            .push(
                r#"
                            UNION
                            SELECT s.id FROM specialties s JOIN tree ON s.parent_id = tree.id
                        )
                        SELECT id FROM tree
                    )
                )"#,
            );
        }

        qb.push(" ORDER BY p.name COLLATE NOCASE ASC");

        let sql = qb.sql().to_string();
        log::debug!("Executing listing query: {}", sql);

        let places = qb
            .build_query_as::<Place>()
            .fetch_all(pool)
            .await
            .map_err(|e| {
                log::error!("Listing query error: {}", e);
                DirectoryError::from(e)
            })?;

        Ok(places)
    }

    /// All active places, used by maintenance passes and the map feed
    pub async fn list_active(pool: &SqlitePool) -> Result<Vec<Place>, DirectoryError> {
        Self::list_filtered(pool, &ListQuery::default()).await
    }

    /// Active places sharing a postcode (NULL matches NULL)
    pub async fn find_by_postcode(
        pool: &SqlitePool,
        postcode: Option<&str>,
    ) -> Result<Vec<Place>, DirectoryError> {
        let sql = format!(
            "SELECT {} FROM places p WHERE p.postcode IS ? AND p.is_active = 1",
            PLACE_COLUMNS
        );
        let places = sqlx::query_as::<_, Place>(&sql)
            .bind(postcode)
            .fetch_all(pool)
            .await?;
        Ok(places)
    }

    /// Partial update - only provided fields are modified
    /// DOCUMENTATION: hours_text is written separately by the hours sync
    pub async fn update(
        conn: &mut SqliteConnection,
        id: i64,
        req: &UpdatePlaceRequest,
    ) -> Result<(), DirectoryError> {
        let rows = sqlx::query(
            r#"
            UPDATE places
            SET name = COALESCE(?, name),
                description = COALESCE(?, description),
                place_type_id = COALESCE(?, place_type_id),
                address = COALESCE(?, address),
                town = COALESCE(?, town),
                postcode = COALESCE(?, postcode),
                phone = COALESCE(?, phone),
                email = COALESCE(?, email),
                website = COALESCE(?, website),
                latitude = COALESCE(?, latitude),
                longitude = COALESCE(?, longitude),
                updated_at = ?
            WHERE id = ? AND is_active = 1
            "#,
        )
        .bind(&req.name)
        .bind(&req.description)
        .bind(req.place_type_id)
        .bind(&req.address)
        .bind(&req.town)
        .bind(&req.postcode)
        .bind(&req.phone)
        .bind(&req.email)
        .bind(&req.website)
        .bind(req.latitude)
        .bind(req.longitude)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            log::error!("Update failed for place {}: {}", id, e);
            DirectoryError::from(e)
        })?
        .rows_affected();

        if rows == 0 {
            return Err(DirectoryError::NotFound(format!("place {}", id)));
        }

        log::info!("Updated place: {}", id);
        Ok(())
    }

    /// Store the rendered hours text
    pub async fn set_hours_text<'e, E>(
        executor: E,
        id: i64,
        hours_text: Option<&str>,
    ) -> Result<(), DirectoryError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("UPDATE places SET hours_text = ?, updated_at = ? WHERE id = ?")
            .bind(hours_text)
            .bind(Utc::now())
            .bind(id)
            .execute(executor)
            .await
            .map_err(|e| {
                log::error!("Failed to store hours text for place {}: {}", id, e);
                DirectoryError::from(e)
            })?;
        Ok(())
    }

    /// Overwrite phone and postcode with their normalised forms
    pub async fn set_contacts<'e, E>(
        executor: E,
        id: i64,
        phone: Option<&str>,
        postcode: Option<&str>,
    ) -> Result<(), DirectoryError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("UPDATE places SET phone = ?, postcode = ?, updated_at = ? WHERE id = ?")
            .bind(phone)
            .bind(postcode)
            .bind(Utc::now())
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Soft delete place
    /// DOCUMENTATION: Sets is_active=false instead of physical deletion
    pub async fn soft_delete(pool: &SqlitePool, id: i64) -> Result<(), DirectoryError> {
        let rows = sqlx::query(
            "UPDATE places SET is_active = 0, updated_at = ? WHERE id = ? AND is_active = 1",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| {
            log::error!("Delete failed for place {}: {}", id, e);
            DirectoryError::from(e)
        })?
        .rows_affected();

        if rows == 0 {
            return Err(DirectoryError::NotFound(format!("place {}", id)));
        }

        log::info!("Deleted place: {}", id);
        Ok(())
    }

    /// Copy every blank field of `keep_id` from `merge_id`
    pub async fn fill_blanks_from(
        conn: &mut SqliteConnection,
        keep_id: i64,
        merge_id: i64,
    ) -> Result<(), DirectoryError> {
        sqlx::query(
            r#"
            UPDATE places
            SET description = COALESCE(NULLIF(description, ''), (SELECT description FROM places WHERE id = ?2)),
                place_type_id = COALESCE(place_type_id, (SELECT place_type_id FROM places WHERE id = ?2)),
                address = COALESCE(NULLIF(address, ''), (SELECT address FROM places WHERE id = ?2)),
                town = COALESCE(NULLIF(town, ''), (SELECT town FROM places WHERE id = ?2)),
                postcode = COALESCE(NULLIF(postcode, ''), (SELECT postcode FROM places WHERE id = ?2)),
                phone = COALESCE(NULLIF(phone, ''), (SELECT phone FROM places WHERE id = ?2)),
                email = COALESCE(NULLIF(email, ''), (SELECT email FROM places WHERE id = ?2)),
                website = COALESCE(NULLIF(website, ''), (SELECT website FROM places WHERE id = ?2)),
                latitude = CASE WHEN latitude IS NULL OR longitude IS NULL
                    THEN (SELECT latitude FROM places WHERE id = ?2) ELSE latitude END,
                longitude = CASE WHEN latitude IS NULL OR longitude IS NULL
                    THEN (SELECT longitude FROM places WHERE id = ?2) ELSE longitude END,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(keep_id)
        .bind(merge_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            log::error!("Failed to fill place {} from {}: {}", keep_id, merge_id, e);
            DirectoryError::from(e)
        })?;
        Ok(())
    }

    /// Retire a duplicate in favour of its survivor
    pub async fn mark_merged(
        conn: &mut SqliteConnection,
        merge_id: i64,
        keep_id: i64,
    ) -> Result<(), DirectoryError> {
        sqlx::query(
            "UPDATE places SET is_active = 0, merged_into = ?, updated_at = ? WHERE id = ?",
        )
        .bind(keep_id)
        .bind(Utc::now())
        .bind(merge_id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Active place counts grouped by type name ("untyped" for NULL)
    pub async fn count_by_type(pool: &SqlitePool) -> Result<Vec<(String, i64)>, DirectoryError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT COALESCE(t.name, 'untyped') AS type_name, COUNT(*) AS count
            FROM places p
            LEFT JOIN place_types t ON t.id = p.place_type_id
            WHERE p.is_active = 1
            GROUP BY type_name
            ORDER BY count DESC, type_name ASC
            "#,
        )
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// (total, active, active without coordinates, active without hours rows)
    pub async fn counts(pool: &SqlitePool) -> Result<(i64, i64, i64, i64), DirectoryError> {
        let row = sqlx::query_as::<_, (i64, i64, i64, i64)>(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN is_active = 1 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN is_active = 1 AND (latitude IS NULL OR longitude IS NULL) THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN is_active = 1 AND NOT EXISTS (
                    SELECT 1 FROM opening_hours h WHERE h.place_id = places.id
                ) THEN 1 ELSE 0 END), 0)
            FROM places
            "#,
        )
        .fetch_one(pool)
        .await?;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn request(name: &str) -> CreatePlaceRequest {
        CreatePlaceRequest {
            name: name.to_string(),
            town: Some("Leith".to_string()),
            postcode: Some("EH6 6QU".to_string()),
            latitude: Some(55.975),
            longitude: Some(-3.172),
            ..Default::default()
        }
    }

    async fn insert(pool: &SqlitePool, name: &str, slug: &str) -> i64 {
        let mut conn = pool.acquire().await.unwrap();
        PlaceRepository::insert(&mut conn, &request(name), slug, None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_fetch() {
        let pool = test_pool().await;
        let id = insert(&pool, "Leith Antiques", "leith-antiques").await;

        let place = PlaceRepository::get_by_id(&pool, id).await.unwrap();
        assert_eq!(place.name, "Leith Antiques");
        assert!(place.is_active);

        let by_slug = PlaceRepository::get_by_slug(&pool, "leith-antiques").await.unwrap();
        assert_eq!(by_slug.id, id);
        assert!(PlaceRepository::slug_exists(&pool, "leith-antiques").await.unwrap());
    }

    #[tokio::test]
    async fn test_soft_delete_hides_place() {
        let pool = test_pool().await;
        let id = insert(&pool, "Gone", "gone").await;

        PlaceRepository::soft_delete(&pool, id).await.unwrap();

        assert!(matches!(
            PlaceRepository::get_by_id(&pool, id).await,
            Err(DirectoryError::NotFound(_))
        ));
        // still present for slug uniqueness
        assert!(PlaceRepository::slug_exists(&pool, "gone").await.unwrap());
        assert!(matches!(
            PlaceRepository::soft_delete(&pool, id).await,
            Err(DirectoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_partial_update_keeps_other_fields() {
        let pool = test_pool().await;
        let id = insert(&pool, "Before", "before").await;

        let mut conn = pool.acquire().await.unwrap();
        let req = UpdatePlaceRequest {
            phone: Some("01315551234".to_string()),
            ..Default::default()
        };
        PlaceRepository::update(&mut conn, id, &req).await.unwrap();
        drop(conn);

        let place = PlaceRepository::get_by_id(&pool, id).await.unwrap();
        assert_eq!(place.name, "Before");
        assert_eq!(place.phone.as_deref(), Some("01315551234"));
        assert_eq!(place.town.as_deref(), Some("Leith"));
    }

    #[tokio::test]
    async fn test_list_filtered_text_search() {
        let pool = test_pool().await;
        insert(&pool, "Silver Vaults", "silver-vaults").await;
        insert(&pool, "Book Barn", "book-barn").await;

        let query = ListQuery {
            q: Some("silver".to_string()),
            ..Default::default()
        };
        let places = PlaceRepository::list_filtered(&pool, &query).await.unwrap();
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].slug, "silver-vaults");

        let all = PlaceRepository::list_active(&pool).await.unwrap();
        assert_eq!(all.len(), 2);
        // ordered by name
        assert_eq!(all[0].slug, "book-barn");
    }

    #[tokio::test]
    async fn test_fill_blanks_from() {
        let pool = test_pool().await;
        let keep = {
            let mut conn = pool.acquire().await.unwrap();
            let req = CreatePlaceRequest {
                name: "Keep".to_string(),
                ..Default::default()
            };
            PlaceRepository::insert(&mut conn, &req, "keep", None).await.unwrap()
        };
        let other = insert(&pool, "Other", "other").await;

        let mut conn = pool.acquire().await.unwrap();
        PlaceRepository::fill_blanks_from(&mut conn, keep, other).await.unwrap();
        drop(conn);

        let place = PlaceRepository::get_by_id(&pool, keep).await.unwrap();
        assert_eq!(place.name, "Keep");
        assert_eq!(place.town.as_deref(), Some("Leith"));
        assert_eq!(place.latitude, Some(55.975));
    }
}
