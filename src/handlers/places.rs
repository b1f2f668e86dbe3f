// src/handlers/places.rs
// DOCUMENTATION: HTTP handlers for place operations
// PURPOSE: Parse requests, call services, return responses

use super::admin::verify_admin_token;
use crate::config::Config;
use crate::errors::DirectoryError;
use crate::models::{
    AssignSpecialtiesRequest, CreatePlaceRequest, ListQuery, ReplaceHoursRequest,
    UpdatePlaceRequest,
};
use crate::services::{FeedCache, PlaceService};
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use chrono::NaiveDateTime;
use serde::Deserialize;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Query string of GET /places/{id_or_slug}
#[derive(Debug, Deserialize)]
pub struct DetailQuery {
    /// Local time used for `open_now`
    pub at: Option<NaiveDateTime>,
}

/// GET /places
/// Browse places with filters
pub async fn list_places(
    pool: web::Data<SqlitePool>,
    query: web::Query<ListQuery>,
) -> Result<impl Responder, DirectoryError> {
    let result = PlaceService::list_places(pool.get_ref(), query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(result))
}

/// POST /places
/// Create a new place
pub async fn create_place(
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    cache: web::Data<Arc<FeedCache>>,
    req: HttpRequest,
    body: web::Json<CreatePlaceRequest>,
) -> Result<impl Responder, DirectoryError> {
    verify_admin_token(&req, &config)?;

    let place = PlaceService::create_place(pool.get_ref(), body.into_inner()).await?;
    cache.invalidate().await;
    Ok(HttpResponse::Created().json(place))
}

/// GET /places/{id_or_slug}
/// Retrieve a place by numeric ID or slug
pub async fn get_place(
    pool: web::Data<SqlitePool>,
    path: web::Path<String>,
    query: web::Query<DetailQuery>,
) -> Result<impl Responder, DirectoryError> {
    let identifier = path.into_inner();
    let place = PlaceService::get_place(pool.get_ref(), &identifier, query.at).await?;
    Ok(HttpResponse::Ok().json(place))
}

/// PUT /places/{id}
/// Update a place
pub async fn update_place(
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    cache: web::Data<Arc<FeedCache>>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<UpdatePlaceRequest>,
) -> Result<impl Responder, DirectoryError> {
    verify_admin_token(&req, &config)?;

    let place =
        PlaceService::update_place(pool.get_ref(), path.into_inner(), body.into_inner()).await?;
    cache.invalidate().await;
    Ok(HttpResponse::Ok().json(place))
}

/// DELETE /places/{id}
/// Soft delete a place
pub async fn delete_place(
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    cache: web::Data<Arc<FeedCache>>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<impl Responder, DirectoryError> {
    verify_admin_token(&req, &config)?;

    PlaceService::delete_place(pool.get_ref(), path.into_inner()).await?;
    cache.invalidate().await;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /places/{id}/hours
pub async fn get_hours(
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<impl Responder, DirectoryError> {
    let hours = PlaceService::get_hours(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(hours))
}

/// PUT /places/{id}/hours
/// Replace structured hours; the text is regenerated from them
pub async fn replace_hours(
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    cache: web::Data<Arc<FeedCache>>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<ReplaceHoursRequest>,
) -> Result<impl Responder, DirectoryError> {
    verify_admin_token(&req, &config)?;

    let hours =
        PlaceService::replace_hours(pool.get_ref(), path.into_inner(), body.into_inner()).await?;
    cache.invalidate().await;
    Ok(HttpResponse::Ok().json(hours))
}

/// PUT /places/{id}/specialties
pub async fn assign_specialties(
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    cache: web::Data<Arc<FeedCache>>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<AssignSpecialtiesRequest>,
) -> Result<impl Responder, DirectoryError> {
    verify_admin_token(&req, &config)?;

    let specialties = PlaceService::assign_specialties(
        pool.get_ref(),
        path.into_inner(),
        body.into_inner().specialty_ids,
    )
    .await?;
    cache.invalidate().await;
    Ok(HttpResponse::Ok().json(specialties))
}

/// Configuration for place routes
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/places")
            .route("", web::get().to(list_places))
            .route("", web::post().to(create_place))
            .route("/{id}/hours", web::get().to(get_hours))
            .route("/{id}/hours", web::put().to(replace_hours))
            .route("/{id}/specialties", web::put().to(assign_specialties))
            .route("/{id}", web::get().to(get_place))
            .route("/{id}", web::put().to(update_place))
            .route("/{id}", web::delete().to(delete_place)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use actix_web::{http::StatusCode, test, App};
    use serde_json::{json, Value};

    macro_rules! app {
        ($pool:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($pool.clone()))
                    .app_data(web::Data::new(Config::for_tests()))
                    .app_data(web::Data::new(Arc::new(FeedCache::new(60))))
                    .configure(config),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_create_requires_admin_token() {
        let pool = test_pool().await;
        let app = app!(pool);

        let req = test::TestRequest::post()
            .uri("/places")
            .set_json(json!({"name": "No Token"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post()
            .uri("/places")
            .insert_header(("X-Admin-Token", "wrong"))
            .set_json(json!({"name": "Bad Token"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_create_then_fetch_by_slug() {
        let pool = test_pool().await;
        let app = app!(pool);

        let req = test::TestRequest::post()
            .uri("/places")
            .insert_header(("X-Admin-Token", "test-token"))
            .set_json(json!({
                "name": "Grassmarket Curios",
                "town": "Old Town",
                "hours_text": "Mon-Fri 10-5; Sat, Sun closed"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = test::TestRequest::get()
            .uri("/places/grassmarket-curios?at=2024-01-06T12:00:00")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["name"], "Grassmarket Curios");
        assert_eq!(body["hours_text"], "Mon-Fri 10:00-17:00; Sat, Sun closed");
        assert_eq!(body["open_now"], false);
        assert_eq!(body["opening_hours"].as_array().map(Vec::len), Some(7));
    }

    #[actix_web::test]
    async fn test_bad_hours_is_400_with_error_body() {
        let pool = test_pool().await;
        let app = app!(pool);

        let req = test::TestRequest::post()
            .uri("/places")
            .insert_header(("X-Admin-Token", "test-token"))
            .set_json(json!({"name": "Odd Hours", "hours_text": "Funday 10-5"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[actix_web::test]
    async fn test_replace_hours_rejects_duplicate_day() {
        let pool = test_pool().await;
        let app = app!(pool);

        let req = test::TestRequest::post()
            .uri("/places")
            .insert_header(("X-Admin-Token", "test-token"))
            .set_json(json!({"name": "Twice"}))
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        let id = created["id"].as_i64().unwrap();

        let req = test::TestRequest::put()
            .uri(&format!("/places/{}/hours", id))
            .insert_header(("X-Admin-Token", "test-token"))
            .set_json(json!({"hours": [
                {"day": "monday", "status": "closed"},
                {"day": "monday", "status": "appointment"}
            ]}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_unknown_place_is_404() {
        let pool = test_pool().await;
        let app = app!(pool);

        let req = test::TestRequest::get().uri("/places/nowhere").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
