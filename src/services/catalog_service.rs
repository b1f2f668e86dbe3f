// src/services/catalog_service.rs
// DOCUMENTATION: Place types and the specialty hierarchy
// PURPOSE: Slug derivation, parent checks and tree assembly over the catalog repositories

use crate::db::{PlaceTypeRepository, SpecialtyRepository};
use crate::errors::DirectoryError;
use crate::models::{
    CreateSpecialtyRequest, PlaceTypeRequest, PlaceTypeResponse, Specialty, SpecialtyNode,
    SpecialtyResponse, UpdateSpecialtyRequest,
};
use crate::services::normalize::slugify;
use sqlx::SqlitePool;
use std::collections::HashMap;
use validator::Validate;

pub struct CatalogService;

impl CatalogService {
    pub async fn list_place_types(
        pool: &SqlitePool,
    ) -> Result<Vec<PlaceTypeResponse>, DirectoryError> {
        let types = PlaceTypeRepository::list(pool).await?;
        Ok(types.iter().map(|t| t.to_response()).collect())
    }

    pub async fn get_place_type(
        pool: &SqlitePool,
        id: i64,
    ) -> Result<PlaceTypeResponse, DirectoryError> {
        Ok(PlaceTypeRepository::get(pool, id).await?.to_response())
    }

    pub async fn create_place_type(
        pool: &SqlitePool,
        req: PlaceTypeRequest,
    ) -> Result<PlaceTypeResponse, DirectoryError> {
        req.validate()?;
        let name = req.name.trim();
        let created =
            PlaceTypeRepository::create(pool, name, &slugify(name), req.description.as_deref())
                .await?;
        Ok(created.to_response())
    }

    /// Rename a place type; its slug follows the new name
    pub async fn update_place_type(
        pool: &SqlitePool,
        id: i64,
        req: PlaceTypeRequest,
    ) -> Result<PlaceTypeResponse, DirectoryError> {
        req.validate()?;
        let name = req.name.trim();
        let updated = PlaceTypeRepository::update(
            pool,
            id,
            name,
            &slugify(name),
            req.description.as_deref(),
        )
        .await?;
        Ok(updated.to_response())
    }

    /// Refused while any place still uses the type
    pub async fn delete_place_type(pool: &SqlitePool, id: i64) -> Result<(), DirectoryError> {
        PlaceTypeRepository::delete(pool, id).await
    }

    pub async fn list_specialties(
        pool: &SqlitePool,
    ) -> Result<Vec<SpecialtyResponse>, DirectoryError> {
        let specialties = SpecialtyRepository::list(pool).await?;
        Ok(specialties.iter().map(|s| s.to_response()).collect())
    }

    pub async fn get_specialty(
        pool: &SqlitePool,
        id: i64,
    ) -> Result<SpecialtyResponse, DirectoryError> {
        Ok(SpecialtyRepository::get(pool, id).await?.to_response())
    }

    /// Specialties nested under their parents, roots and siblings by name
    pub async fn specialty_tree(pool: &SqlitePool) -> Result<Vec<SpecialtyNode>, DirectoryError> {
        let specialties = SpecialtyRepository::list(pool).await?;
        Ok(build_tree(&specialties))
    }

    pub async fn create_specialty(
        pool: &SqlitePool,
        req: CreateSpecialtyRequest,
    ) -> Result<SpecialtyResponse, DirectoryError> {
        req.validate()?;
        if let Some(parent_id) = req.parent_id {
            Self::require_parent(pool, parent_id).await?;
        }

        let name = req.name.trim();
        let created = SpecialtyRepository::create(pool, name, &slugify(name), req.parent_id).await?;
        Ok(created.to_response())
    }

    /// Rename and/or move a specialty
    /// DOCUMENTATION: A move under itself or one of its descendants is rejected
    pub async fn update_specialty(
        pool: &SqlitePool,
        id: i64,
        req: UpdateSpecialtyRequest,
    ) -> Result<SpecialtyResponse, DirectoryError> {
        req.validate()?;
        let current = SpecialtyRepository::get(pool, id).await?;

        let parent_id = match req.parent_id {
            Some(Some(parent_id)) => {
                Self::require_parent(pool, parent_id).await?;
                let ancestry = SpecialtyRepository::ancestry(pool, parent_id).await?;
                if ancestry.contains(&id) {
                    return Err(DirectoryError::InvalidInput(format!(
                        "specialty {} cannot be placed under its own descendant {}",
                        id, parent_id
                    )));
                }
                Some(parent_id)
            }
            Some(None) => None,
            None => current.parent_id,
        };

        let name = req
            .name
            .as_deref()
            .map(str::trim)
            .unwrap_or(current.name.as_str())
            .to_string();
        let updated =
            SpecialtyRepository::update(pool, id, &name, &slugify(&name), parent_id).await?;

        log::info!("Updated specialty {} (parent {:?})", id, parent_id);
        Ok(updated.to_response())
    }

    /// Children of a deleted specialty become roots
    pub async fn delete_specialty(pool: &SqlitePool, id: i64) -> Result<(), DirectoryError> {
        SpecialtyRepository::delete(pool, id).await
    }

    async fn require_parent(pool: &SqlitePool, parent_id: i64) -> Result<(), DirectoryError> {
        SpecialtyRepository::get(pool, parent_id)
            .await
            .map(|_| ())
            .map_err(|_| {
                DirectoryError::InvalidInput(format!("unknown parent specialty {}", parent_id))
            })
    }
}

/// Assemble the forest; a dangling parent id makes the node a root
pub fn build_tree(specialties: &[Specialty]) -> Vec<SpecialtyNode> {
    let known: HashMap<i64, &Specialty> = specialties.iter().map(|s| (s.id, s)).collect();
    let mut children: HashMap<Option<i64>, Vec<&Specialty>> = HashMap::new();

    for specialty in specialties {
        let parent = specialty.parent_id.filter(|p| known.contains_key(p));
        children.entry(parent).or_default().push(specialty);
    }

    fn attach(
        parent: Option<i64>,
        children: &HashMap<Option<i64>, Vec<&Specialty>>,
    ) -> Vec<SpecialtyNode> {
        children
            .get(&parent)
            .map(|list| {
                list.iter()
                    .map(|s| SpecialtyNode {
                        specialty: s.to_response(),
                        children: attach(Some(s.id), children),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    attach(None, &children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn new_specialty(name: &str, parent: Option<i64>) -> CreateSpecialtyRequest {
        CreateSpecialtyRequest {
            name: name.to_string(),
            parent_id: parent,
        }
    }

    #[test]
    fn test_build_tree_nests_children() {
        let flat = vec![
            Specialty { id: 1, name: "Ceramics".into(), slug: "ceramics".into(), parent_id: None },
            Specialty { id: 2, name: "Silver".into(), slug: "silver".into(), parent_id: None },
            Specialty { id: 3, name: "Scottish Silver".into(), slug: "scottish-silver".into(), parent_id: Some(2) },
            Specialty { id: 4, name: "Quaichs".into(), slug: "quaichs".into(), parent_id: Some(3) },
        ];

        let tree = build_tree(&flat);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[1].specialty.name, "Silver");
        assert_eq!(tree[1].children[0].children[0].specialty.id, 4);
        assert!(tree[0].children.is_empty());
    }

    #[tokio::test]
    async fn test_place_type_slug_from_name() {
        let pool = test_pool().await;
        let created = CatalogService::create_place_type(
            &pool,
            PlaceTypeRequest {
                name: " Auction House ".into(),
                description: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(created.name, "Auction House");
        assert_eq!(created.slug, "auction-house");

        let duplicate = CatalogService::create_place_type(
            &pool,
            PlaceTypeRequest {
                name: "Auction House".into(),
                description: None,
            },
        )
        .await;
        assert!(matches!(duplicate, Err(DirectoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_specialty_cycle_rejected() {
        let pool = test_pool().await;
        let silver = CatalogService::create_specialty(&pool, new_specialty("Silver", None)).await.unwrap();
        let scottish = CatalogService::create_specialty(&pool, new_specialty("Scottish Silver", Some(silver.id)))
            .await
            .unwrap();

        let req = UpdateSpecialtyRequest {
            name: None,
            parent_id: Some(Some(scottish.id)),
        };
        let err = CatalogService::update_specialty(&pool, silver.id, req).await.unwrap_err();
        assert!(matches!(err, DirectoryError::InvalidInput(_)));

        let self_parent = UpdateSpecialtyRequest {
            name: None,
            parent_id: Some(Some(silver.id)),
        };
        assert!(CatalogService::update_specialty(&pool, silver.id, self_parent).await.is_err());
    }

    #[tokio::test]
    async fn test_specialty_move_and_delete() {
        let pool = test_pool().await;
        let silver = CatalogService::create_specialty(&pool, new_specialty("Silver", None)).await.unwrap();
        let clocks = CatalogService::create_specialty(&pool, new_specialty("Clocks", Some(silver.id)))
            .await
            .unwrap();

        let to_root = UpdateSpecialtyRequest {
            name: Some("Clocks & Watches".into()),
            parent_id: Some(None),
        };
        let moved = CatalogService::update_specialty(&pool, clocks.id, to_root).await.unwrap();
        assert_eq!(moved.parent_id, None);
        assert_eq!(moved.slug, "clocks-watches");

        let child = CatalogService::create_specialty(&pool, new_specialty("Quaichs", Some(silver.id)))
            .await
            .unwrap();
        CatalogService::delete_specialty(&pool, silver.id).await.unwrap();

        let tree = CatalogService::specialty_tree(&pool).await.unwrap();
        assert_eq!(tree.len(), 2);
        assert!(tree.iter().any(|n| n.specialty.id == child.id && n.specialty.parent_id.is_none()));
    }

    #[tokio::test]
    async fn test_unknown_parent_rejected() {
        let pool = test_pool().await;
        let result = CatalogService::create_specialty(&pool, new_specialty("Orphan", Some(99))).await;
        assert!(matches!(result, Err(DirectoryError::InvalidInput(_))));
    }
}
