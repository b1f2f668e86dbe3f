// src/config/env.rs
// DOCUMENTATION: Environment variable management
// PURPOSE: Load and validate configuration from .env files

use dotenv::dotenv;
use std::env;
use std::str::FromStr;

/// Application configuration loaded from environment variables
/// DOCUMENTATION: Centralizes all configuration in one struct
/// Load with Config::from_env() at application startup
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite connection string
    /// Format: sqlite://path/to/file.db
    pub database_url: String,

    /// Server bind address (e.g., "127.0.0.1")
    pub server_address: String,

    /// Server listen port (default 8080)
    pub server_port: u16,

    /// Environment: development, staging, production
    pub environment: String,

    /// Log level: debug, info, warn, error
    pub log_level: String,

    /// Admin authentication token (required for every write endpoint)
    pub admin_token: String,

    /// Maximum connections in database pool
    pub db_max_connections: u32,

    /// Connection timeout in seconds
    pub db_connection_timeout: u64,

    /// How long a rendered map feed stays cached
    pub map_cache_ttl_seconds: u64,

    /// Default distance under which two places with the same postcode count as duplicates
    pub duplicate_radius_m: f64,
}

fn var_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    /// DOCUMENTATION: Reads from .env or process environment
    /// Called once at application startup
    pub fn from_env() -> Self {
        dotenv().ok();

        Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://antiques.db".to_string()),

            server_address: env::var("SERVER_ADDRESS").unwrap_or_else(|_| "127.0.0.1".to_string()),

            server_port: var_or("SERVER_PORT", 8080),

            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            log_level: env::var("LOG_LEVEL")
                .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".to_string()),

            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "admin-token-dev".to_string()),

            db_max_connections: var_or("DB_MAX_CONNECTIONS", 5),

            db_connection_timeout: var_or("DB_CONNECTION_TIMEOUT", 30),

            map_cache_ttl_seconds: var_or("MAP_CACHE_TTL_SECONDS", 300),

            duplicate_radius_m: var_or("DUPLICATE_RADIUS_M", 25.0),
        }
    }

    /// Validate critical configuration
    /// DOCUMENTATION: Ensures application can start safely
    pub fn validate(&self) -> Result<(), String> {
        if self.database_url.is_empty() {
            return Err("DATABASE_URL is required".to_string());
        }

        if self.db_max_connections == 0 {
            return Err("DB_MAX_CONNECTIONS must be at least 1".to_string());
        }

        if self.admin_token == "admin-token-dev" && self.environment == "production" {
            log::warn!("ADMIN_TOKEN is the development default in production");
        }

        if self.duplicate_radius_m <= 0.0 {
            log::warn!("DUPLICATE_RADIUS_M is not positive - proximity duplicates disabled");
        }

        Ok(())
    }
}

#[cfg(test)]
impl Config {
    /// Configuration used by handler tests
    pub fn for_tests() -> Self {
        Config {
            database_url: "sqlite::memory:".to_string(),
            server_address: "127.0.0.1".to_string(),
            server_port: 0,
            environment: "test".to_string(),
            log_level: "debug".to_string(),
            admin_token: "test-token".to_string(),
            db_max_connections: 1,
            db_connection_timeout: 5,
            map_cache_ttl_seconds: 60,
            duplicate_radius_m: 25.0,
        }
    }
}
