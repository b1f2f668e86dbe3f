// src/services/map_service.rs
// DOCUMENTATION: GeoJSON feed of geolocated places for the trail map

use crate::db::{PlaceRepository, PlaceTypeRepository};
use crate::errors::DirectoryError;
use crate::models::{ListQuery, Place};
use geojson::{feature::Id, Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde_json::json;
use sqlx::SqlitePool;
use std::collections::HashMap;

pub struct MapService;

impl MapService {
    /// Active places with coordinates as Point features
    pub async fn feature_collection(
        pool: &SqlitePool,
        place_type: Option<String>,
        specialty: Option<String>,
    ) -> Result<FeatureCollection, DirectoryError> {
        let query = ListQuery {
            type_: place_type,
            specialty,
            ..Default::default()
        };
        let places = PlaceRepository::list_filtered(pool, &query).await?;
        let type_slugs: HashMap<i64, String> = PlaceTypeRepository::list(pool)
            .await?
            .into_iter()
            .map(|t| (t.id, t.slug))
            .collect();

        let features: Vec<Feature> = places
            .iter()
            .filter_map(|place| to_feature(place, &type_slugs))
            .collect();

        log::info!("Built map feed with {} features", features.len());
        Ok(FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        })
    }
}

fn to_feature(place: &Place, type_slugs: &HashMap<i64, String>) -> Option<Feature> {
    let point = place.coordinates()?;

    let mut properties = JsonObject::new();
    properties.insert("id".to_string(), json!(place.id));
    properties.insert("name".to_string(), json!(place.name));
    properties.insert("slug".to_string(), json!(place.slug));
    properties.insert(
        "type".to_string(),
        json!(place.place_type_id.and_then(|id| type_slugs.get(&id))),
    );
    properties.insert("town".to_string(), json!(place.town));
    properties.insert("hours_text".to_string(), json!(place.hours_text));

    Some(Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(vec![point.x(), point.y()]))),
        id: Some(Id::Number(place.id.into())),
        properties: Some(properties),
        foreign_members: None,
    })
}
