// src/models/place_type.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Category of venue (antique shop, auction house, centre, ...)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PlaceType {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

/// Request to create or rename a place type
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PlaceTypeRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Place type as exposed via the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceTypeResponse {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

impl PlaceType {
    pub fn to_response(&self) -> PlaceTypeResponse {
        PlaceTypeResponse {
            id: self.id,
            name: self.name.clone(),
            slug: self.slug.clone(),
            description: self.description.clone(),
        }
    }
}
