// src/handlers/admin.rs
// DOCUMENTATION: Admin handlers for maintenance operations
// PURPOSE: Expose import, duplicate, hours and contact passes via REST endpoints

use crate::config::Config;
use crate::errors::DirectoryError;
use crate::models::CreatePlaceRequest;
use crate::services::{FeedCache, MaintenanceService, MergeRequest, RepairRequest};
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct DuplicateQuery {
    /// Maximum distance for same-postcode pairs, in metres
    pub radius_m: Option<f64>,
}

/// POST /admin/import
/// Import a batch of place records
///
/// DOCUMENTATION: Existing places (same name slug and postcode) are skipped
pub async fn import_places(
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    cache: web::Data<Arc<FeedCache>>,
    req: HttpRequest,
    body: web::Json<Vec<CreatePlaceRequest>>,
) -> Result<impl Responder, DirectoryError> {
    verify_admin_token(&req, &config)?;

    let records = body.into_inner();
    log::info!("Admin import requested for {} records", records.len());

    let stats = MaintenanceService::import(pool.get_ref(), records).await?;
    if stats.created > 0 {
        cache.invalidate().await;
    }
    Ok(HttpResponse::Ok().json(stats))
}

/// GET /admin/duplicates
pub async fn find_duplicates(
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    req: HttpRequest,
    query: web::Query<DuplicateQuery>,
) -> Result<impl Responder, DirectoryError> {
    verify_admin_token(&req, &config)?;

    let radius_m = query.radius_m.unwrap_or(config.duplicate_radius_m);
    let pairs = MaintenanceService::find_duplicates(pool.get_ref(), radius_m).await?;
    Ok(HttpResponse::Ok().json(pairs))
}

/// POST /admin/merge
pub async fn merge_places(
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    cache: web::Data<Arc<FeedCache>>,
    req: HttpRequest,
    body: web::Json<MergeRequest>,
) -> Result<impl Responder, DirectoryError> {
    verify_admin_token(&req, &config)?;

    let place = MaintenanceService::merge(pool.get_ref(), body.into_inner()).await?;
    cache.invalidate().await;
    Ok(HttpResponse::Ok().json(place))
}

/// GET /admin/hours/audit
pub async fn hours_audit(
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    req: HttpRequest,
) -> Result<impl Responder, DirectoryError> {
    verify_admin_token(&req, &config)?;

    let entries = MaintenanceService::hours_audit(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(entries))
}

/// POST /admin/hours/repair
pub async fn hours_repair(
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    cache: web::Data<Arc<FeedCache>>,
    req: HttpRequest,
    body: Option<web::Json<RepairRequest>>,
) -> Result<impl Responder, DirectoryError> {
    verify_admin_token(&req, &config)?;

    let prefer = body.map(|b| b.into_inner().prefer).unwrap_or_default();
    let report = MaintenanceService::hours_repair(pool.get_ref(), prefer).await?;
    if !report.repaired.is_empty() {
        cache.invalidate().await;
    }
    Ok(HttpResponse::Ok().json(report))
}

/// POST /admin/normalize-contacts
pub async fn normalize_contacts(
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    req: HttpRequest,
) -> Result<impl Responder, DirectoryError> {
    verify_admin_token(&req, &config)?;

    let report = MaintenanceService::normalize_contacts(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(report))
}

/// GET /admin/stats
/// Directory statistics plus the state of the map feed cache
pub async fn directory_stats(
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    cache: web::Data<Arc<FeedCache>>,
    req: HttpRequest,
) -> Result<impl Responder, DirectoryError> {
    verify_admin_token(&req, &config)?;

    let stats = MaintenanceService::stats(pool.get_ref()).await?;
    let cache_stats = cache.stats().await;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "directory": stats,
        "map_cache": cache_stats,
    })))
}

/// Helper function to verify admin authentication
/// DOCUMENTATION: Checks X-Admin-Token header against configured admin token
pub(crate) fn verify_admin_token(req: &HttpRequest, config: &Config) -> Result<(), DirectoryError> {
    let token = req
        .headers()
        .get("X-Admin-Token")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            log::warn!("Admin request without token");
            DirectoryError::Unauthorized
        })?;

    if token != config.admin_token {
        log::warn!("Admin request with invalid token");
        return Err(DirectoryError::Forbidden);
    }

    Ok(())
}

/// Configuration for admin routes
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/import", web::post().to(import_places))
            .route("/duplicates", web::get().to(find_duplicates))
            .route("/merge", web::post().to(merge_places))
            .route("/hours/audit", web::get().to(hours_audit))
            .route("/hours/repair", web::post().to(hours_repair))
            .route("/normalize-contacts", web::post().to(normalize_contacts))
            .route("/stats", web::get().to(directory_stats)),
    );
}
