// src/handlers/catalog.rs
// DOCUMENTATION: HTTP handlers for place types and specialties
// PURPOSE: Reads are public; writes require the admin token and invalidate the map feed

use super::admin::verify_admin_token;
use crate::config::Config;
use crate::errors::DirectoryError;
use crate::models::{CreateSpecialtyRequest, PlaceTypeRequest, UpdateSpecialtyRequest};
use crate::services::{CatalogService, FeedCache};
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct SpecialtyListQuery {
    /// Nest children under their parents
    #[serde(default)]
    pub tree: bool,
}

/// GET /place-types
pub async fn list_place_types(
    pool: web::Data<SqlitePool>,
) -> Result<impl Responder, DirectoryError> {
    let types = CatalogService::list_place_types(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(types))
}

/// GET /place-types/{id}
pub async fn get_place_type(
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<impl Responder, DirectoryError> {
    let place_type = CatalogService::get_place_type(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(place_type))
}

/// POST /place-types
pub async fn create_place_type(
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    req: HttpRequest,
    body: web::Json<PlaceTypeRequest>,
) -> Result<impl Responder, DirectoryError> {
    verify_admin_token(&req, &config)?;

    let place_type = CatalogService::create_place_type(pool.get_ref(), body.into_inner()).await?;
    Ok(HttpResponse::Created().json(place_type))
}

/// PUT /place-types/{id}
pub async fn update_place_type(
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    cache: web::Data<Arc<FeedCache>>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<PlaceTypeRequest>,
) -> Result<impl Responder, DirectoryError> {
    verify_admin_token(&req, &config)?;

    let place_type =
        CatalogService::update_place_type(pool.get_ref(), path.into_inner(), body.into_inner())
            .await?;
    cache.invalidate().await;
    Ok(HttpResponse::Ok().json(place_type))
}

/// DELETE /place-types/{id}
/// 409 while places still use the type
pub async fn delete_place_type(
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<impl Responder, DirectoryError> {
    verify_admin_token(&req, &config)?;

    CatalogService::delete_place_type(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /specialties
/// Flat list, or the nested tree with ?tree=true
pub async fn list_specialties(
    pool: web::Data<SqlitePool>,
    query: web::Query<SpecialtyListQuery>,
) -> Result<impl Responder, DirectoryError> {
    if query.tree {
        let tree = CatalogService::specialty_tree(pool.get_ref()).await?;
        return Ok(HttpResponse::Ok().json(tree));
    }
    let specialties = CatalogService::list_specialties(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(specialties))
}

/// GET /specialties/{id}
pub async fn get_specialty(
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<impl Responder, DirectoryError> {
    let specialty = CatalogService::get_specialty(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(specialty))
}

/// POST /specialties
pub async fn create_specialty(
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    req: HttpRequest,
    body: web::Json<CreateSpecialtyRequest>,
) -> Result<impl Responder, DirectoryError> {
    verify_admin_token(&req, &config)?;

    let specialty = CatalogService::create_specialty(pool.get_ref(), body.into_inner()).await?;
    Ok(HttpResponse::Created().json(specialty))
}

/// PUT /specialties/{id}
pub async fn update_specialty(
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    cache: web::Data<Arc<FeedCache>>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<UpdateSpecialtyRequest>,
) -> Result<impl Responder, DirectoryError> {
    verify_admin_token(&req, &config)?;

    let specialty =
        CatalogService::update_specialty(pool.get_ref(), path.into_inner(), body.into_inner())
            .await?;
    cache.invalidate().await;
    Ok(HttpResponse::Ok().json(specialty))
}

/// DELETE /specialties/{id}
pub async fn delete_specialty(
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    cache: web::Data<Arc<FeedCache>>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<impl Responder, DirectoryError> {
    verify_admin_token(&req, &config)?;

    CatalogService::delete_specialty(pool.get_ref(), path.into_inner()).await?;
    cache.invalidate().await;
    Ok(HttpResponse::NoContent().finish())
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/place-types")
            .route("", web::get().to(list_place_types))
            .route("", web::post().to(create_place_type))
            .route("/{id}", web::get().to(get_place_type))
            .route("/{id}", web::put().to(update_place_type))
            .route("/{id}", web::delete().to(delete_place_type)),
    )
    .service(
        web::scope("/specialties")
            .route("", web::get().to(list_specialties))
            .route("", web::post().to(create_specialty))
            .route("/{id}", web::get().to(get_specialty))
            .route("/{id}", web::put().to(update_specialty))
            .route("/{id}", web::delete().to(delete_specialty)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use actix_web::{http::StatusCode, test, App};
    use serde_json::{json, Value};

    #[actix_web::test]
    async fn test_specialty_tree_endpoint() {
        let pool = test_pool().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pool.clone()))
                .app_data(web::Data::new(Config::for_tests()))
                .app_data(web::Data::new(Arc::new(FeedCache::new(60))))
                .configure(config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/specialties")
            .insert_header(("X-Admin-Token", "test-token"))
            .set_json(json!({"name": "Silver"}))
            .to_request();
        let silver: Value = test::call_and_read_body_json(&app, req).await;

        let req = test::TestRequest::post()
            .uri("/specialties")
            .insert_header(("X-Admin-Token", "test-token"))
            .set_json(json!({"name": "Scottish Silver", "parent_id": silver["id"]}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = test::TestRequest::get().uri("/specialties?tree=true").to_request();
        let tree: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(tree[0]["name"], "Silver");
        assert_eq!(tree[0]["children"][0]["slug"], "scottish-silver");
    }

    #[actix_web::test]
    async fn test_place_type_in_use_is_409() {
        let pool = test_pool().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pool.clone()))
                .app_data(web::Data::new(Config::for_tests()))
                .app_data(web::Data::new(Arc::new(FeedCache::new(60))))
                .configure(config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/place-types")
            .insert_header(("X-Admin-Token", "test-token"))
            .set_json(json!({"name": "Antique Shop"}))
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        let type_id = created["id"].as_i64().unwrap();

        sqlx::query(
            "INSERT INTO places (name, slug, place_type_id, created_at, updated_at) VALUES ('Shop', 'shop', ?, '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
        )
        .bind(type_id)
        .execute(&pool)
        .await
        .unwrap();

        let req = test::TestRequest::delete()
            .uri(&format!("/place-types/{}", type_id))
            .insert_header(("X-Admin-Token", "test-token"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }
}
