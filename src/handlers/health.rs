// src/handlers/health.rs
// DOCUMENTATION: Health check handler
// PURPOSE: Report service status, including whether the database answers

use actix_web::{web, HttpResponse, Responder};
use serde_json::json;
use sqlx::SqlitePool;

pub async fn health_check(pool: web::Data<SqlitePool>) -> impl Responder {
    let status = match sqlx::query("SELECT 1").execute(pool.get_ref()).await {
        Ok(_) => "ok",
        Err(e) => {
            log::error!("Health check database query failed: {}", e);
            "degraded"
        }
    };

    HttpResponse::Ok().json(json!({
        "status": status,
        "service": "antiques-trail",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check));
}
