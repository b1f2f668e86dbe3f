// src/handlers/map.rs
// DOCUMENTATION: Map feed handler
// PURPOSE: Serve the GeoJSON feed, rebuilt only when the cache has no fresh copy

use crate::errors::DirectoryError;
use crate::services::{FeedCache, MapService};
use actix_web::{http::header, web, HttpResponse, Responder};
use serde::Deserialize;
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct MapQuery {
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub specialty: Option<String>,
}

/// GET /map/places.geojson
pub async fn places_geojson(
    pool: web::Data<SqlitePool>,
    cache: web::Data<Arc<FeedCache>>,
    query: web::Query<MapQuery>,
) -> Result<impl Responder, DirectoryError> {
    let query = query.into_inner();
    let key = FeedCache::key(query.type_.as_deref(), query.specialty.as_deref());

    let body = match cache.get(&key).await {
        Some(body) => body,
        None => {
            let generation = cache.generation();
            let collection =
                MapService::feature_collection(pool.get_ref(), query.type_, query.specialty)
                    .await?;
            let body = collection.to_string();
            cache.set(key, body.clone(), generation).await;
            body
        }
    };

    Ok(HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, "application/geo+json"))
        .body(body))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/map/places.geojson", web::get().to(places_geojson));
}
