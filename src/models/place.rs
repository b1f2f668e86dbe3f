// src/models/place.rs
// DOCUMENTATION: Core data structures for places
// PURPOSE: Defines all serialization/deserialization models for API and database

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

use super::{HoursEntry, PlaceTypeResponse, SpecialtyResponse};

/// Represents a complete place record from the database
/// DOCUMENTATION: This struct maps directly to the places table
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Place {
    /// Row identifier
    pub id: i64,

    /// Shop or venue name
    pub name: String,

    /// URL-safe unique name, derived from `name`
    pub slug: String,

    /// Optional detailed description
    pub description: Option<String>,

    /// Category (antique shop, auction house, ...)
    pub place_type_id: Option<i64>,

    /// Street address
    pub address: Option<String>,

    /// Town or district (Leith, Stockbridge, ...)
    pub town: Option<String>,

    /// UK postcode, normalised ("EH6 6QU")
    pub postcode: Option<String>,

    /// Phone number, normalised with leading zero
    pub phone: Option<String>,

    /// Contact email
    pub email: Option<String>,

    /// Website URL
    pub website: Option<String>,

    /// WGS84 latitude
    pub latitude: Option<f64>,

    /// WGS84 longitude
    pub longitude: Option<f64>,

    /// Human-readable opening hours, kept in sync with the opening_hours rows
    pub hours_text: Option<String>,

    /// Soft delete flag (true = active, false = deleted or merged)
    pub is_active: bool,

    /// Survivor of a duplicate merge
    pub merged_into: Option<i64>,

    /// When record was created
    pub created_at: DateTime<Utc>,

    /// When record was last modified
    pub updated_at: DateTime<Utc>,
}

impl Place {
    /// Both coordinates, if the place has been geolocated
    pub fn coordinates(&self) -> Option<geo_types::Point<f64>> {
        match (self.longitude, self.latitude) {
            (Some(lon), Some(lat)) => Some(geo_types::Point::new(lon, lat)),
            _ => None,
        }
    }

    /// Convert Place to PlaceResponse for API
    pub fn to_response(&self) -> PlaceResponse {
        PlaceResponse {
            id: self.id,
            name: self.name.clone(),
            slug: self.slug.clone(),
            description: self.description.clone(),
            place_type_id: self.place_type_id,
            address: self.address.clone(),
            town: self.town.clone(),
            postcode: self.postcode.clone(),
            phone: self.phone.clone(),
            email: self.email.clone(),
            website: self.website.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
            hours_text: self.hours_text.clone(),
            distance_km: None,
            open_now: None,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

fn check_coordinates(latitude: Option<f64>, longitude: Option<f64>) -> Result<(), ValidationError> {
    if latitude.is_some_and(|lat| !(-90.0..=90.0).contains(&lat)) {
        return Err(ValidationError::new("latitude_out_of_range"));
    }
    if longitude.is_some_and(|lon| !(-180.0..=180.0).contains(&lon)) {
        return Err(ValidationError::new("longitude_out_of_range"));
    }
    Ok(())
}

fn validate_new_coordinates(req: &CreatePlaceRequest) -> Result<(), ValidationError> {
    if req.latitude.is_some() != req.longitude.is_some() {
        return Err(ValidationError::new("latitude_and_longitude_go_together"));
    }
    check_coordinates(req.latitude, req.longitude)
}

fn validate_updated_coordinates(req: &UpdatePlaceRequest) -> Result<(), ValidationError> {
    check_coordinates(req.latitude, req.longitude)
}

/// Request DTO for creating a new place
/// DOCUMENTATION: Data transfer object for POST /places and admin import
#[derive(Debug, Serialize, Deserialize, Validate, Clone, Default)]
#[validate(schema(function = "validate_new_coordinates"))]
pub struct CreatePlaceRequest {
    /// Place name (required)
    #[validate(length(min = 1, max = 255))]
    pub name: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// Category id
    #[serde(default)]
    pub place_type_id: Option<i64>,

    #[serde(default)]
    pub address: Option<String>,

    #[serde(default)]
    pub town: Option<String>,

    #[serde(default)]
    pub postcode: Option<String>,

    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default)]
    #[validate(email)]
    pub email: Option<String>,

    #[serde(default)]
    #[validate(url)]
    pub website: Option<String>,

    #[serde(default)]
    pub latitude: Option<f64>,

    #[serde(default)]
    pub longitude: Option<f64>,

    /// Free-text hours; parsed into the structured table on save
    #[serde(default)]
    pub hours_text: Option<String>,

    /// Specialties to tag the place with
    #[serde(default)]
    pub specialty_ids: Vec<i64>,
}

/// Request DTO for updating an existing place
/// DOCUMENTATION: Data transfer object for PUT /places/{id} endpoint
/// All fields are optional - only provided fields are updated
#[derive(Debug, Serialize, Deserialize, Validate, Default)]
#[validate(schema(function = "validate_updated_coordinates"))]
pub struct UpdatePlaceRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub place_type_id: Option<i64>,
    pub address: Option<String>,
    pub town: Option<String>,
    pub postcode: Option<String>,
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(url)]
    pub website: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Replaces the structured hours when present
    pub hours_text: Option<String>,
}

/// Response DTO for API responses
#[derive(Debug, Serialize, Deserialize)]
pub struct PlaceResponse {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub place_type_id: Option<i64>,

    /// Address and contact
    pub address: Option<String>,
    pub town: Option<String>,
    pub postcode: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,

    /// Geographic coordinates
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    pub hours_text: Option<String>,

    /// Distance from the search point, proximity searches only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,

    /// Open at the requested instant; null when the day's hours are unknown
    pub open_now: Option<bool>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Detailed response DTO
/// DOCUMENTATION: Used for GET /places/{id_or_slug}
#[derive(Debug, Serialize)]
pub struct PlaceDetailResponse {
    #[serde(flatten)]
    pub place: PlaceResponse,
    pub place_type: Option<PlaceTypeResponse>,
    pub opening_hours: Vec<HoursEntry>,
    pub specialties: Vec<SpecialtyResponse>,
}

/// Listing query parameters
/// DOCUMENTATION: DTO for parsing query string in GET /places
/// All parameters are optional for flexible browsing
#[derive(Debug, Deserialize, Default)]
pub struct ListQuery {
    /// Text search over name, description and town
    pub q: Option<String>,

    /// Filter by town
    pub town: Option<String>,

    /// Filter by place type slug
    #[serde(rename = "type")]
    pub type_: Option<String>,

    /// Filter by specialty slug (descendants included)
    pub specialty: Option<String>,

    /// Geographic latitude (for proximity search)
    pub lat: Option<f64>,

    /// Geographic longitude (for proximity search)
    pub lon: Option<f64>,

    /// Search radius in kilometers
    pub radius_km: Option<f64>,

    /// Only places open at `at` (or now)
    pub open_now: Option<bool>,

    /// Local time used for `open_now`, e.g. 2024-05-04T14:30:00
    pub at: Option<NaiveDateTime>,

    /// Page number (1-based)
    pub page: Option<i64>,

    /// Results per page (max 100)
    pub limit: Option<i64>,
}

impl ListQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(20).clamp(1, 100)
    }

    /// Proximity filter, only when all three parts are given
    pub fn proximity(&self) -> Option<(f64, f64, f64)> {
        match (self.lat, self.lon, self.radius_km) {
            (Some(lat), Some(lon), Some(radius)) => Some((lat, lon, radius)),
            _ => None,
        }
    }
}

/// Paginated listing response
#[derive(Debug, Serialize)]
pub struct ListResponse {
    /// Array of place results
    pub data: Vec<PlaceResponse>,

    /// Total number of matches (regardless of pagination)
    pub total_count: i64,

    /// Current page number
    pub page: i64,

    /// Results per page
    pub limit: i64,

    /// Whether more results exist on next page
    pub has_more: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_validation() {
        let ok = CreatePlaceRequest {
            name: "Georgian Antiques".into(),
            latitude: Some(55.97),
            longitude: Some(-3.17),
            website: Some("https://example.com".into()),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());

        let empty_name = CreatePlaceRequest::default();
        assert!(empty_name.validate().is_err());

        let half_located = CreatePlaceRequest {
            name: "Half".into(),
            latitude: Some(55.9),
            ..Default::default()
        };
        assert!(half_located.validate().is_err());

        let bad_email = CreatePlaceRequest {
            name: "Mail".into(),
            email: Some("not-an-email".into()),
            ..Default::default()
        };
        assert!(bad_email.validate().is_err());

        let off_planet = CreatePlaceRequest {
            name: "Far".into(),
            latitude: Some(95.0),
            longitude: Some(-3.0),
            ..Default::default()
        };
        assert!(off_planet.validate().is_err());
    }

    #[test]
    fn test_list_query_bounds() {
        let q = ListQuery {
            page: Some(0),
            limit: Some(1000),
            ..Default::default()
        };
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), 100);
        assert!(q.proximity().is_none());
    }
}
