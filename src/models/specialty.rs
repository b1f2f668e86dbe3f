// src/models/specialty.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// What a place sells; specialties nest (Silver > Scottish Silver)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Specialty {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<i64>,
}

/// Request to create a specialty
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateSpecialtyRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

/// Request to rename and/or re-parent a specialty
///
/// `parent_id` distinguishes "leave alone" (absent) from "make root" (null).
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct UpdateSpecialtyRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[serde(default, with = "double_option")]
    pub parent_id: Option<Option<i64>>,
}

/// Replace the full set of specialties on a place
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignSpecialtiesRequest {
    pub specialty_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecialtyResponse {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<i64>,
}

/// Nested view used by GET /specialties?tree=true
#[derive(Debug, Clone, Serialize)]
pub struct SpecialtyNode {
    #[serde(flatten)]
    pub specialty: SpecialtyResponse,
    pub children: Vec<SpecialtyNode>,
}

impl Specialty {
    pub fn to_response(&self) -> SpecialtyResponse {
        SpecialtyResponse {
            id: self.id,
            name: self.name.clone(),
            slug: self.slug.clone(),
            parent_id: self.parent_id,
        }
    }
}

mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(value: &Option<Option<i64>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.flatten().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Option<i64>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<i64>::deserialize(deserializer).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_distinguishes_null_parent() {
        let absent: UpdateSpecialtyRequest = serde_json::from_str(r#"{"name":"Silver"}"#).unwrap();
        assert_eq!(absent.parent_id, None);

        let root: UpdateSpecialtyRequest = serde_json::from_str(r#"{"parent_id":null}"#).unwrap();
        assert_eq!(root.parent_id, Some(None));

        let moved: UpdateSpecialtyRequest = serde_json::from_str(r#"{"parent_id":4}"#).unwrap();
        assert_eq!(moved.parent_id, Some(Some(4)));
    }
}
