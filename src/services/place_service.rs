// src/services/place_service.rs
// DOCUMENTATION: Business logic for places
// PURPOSE: Intermediary between handlers and repositories; owns the hours text/rows sync

use crate::db::{HoursRepository, PlaceRepository, PlaceTypeRepository, SpecialtyRepository};
use crate::errors::DirectoryError;
use crate::models::{
    entries_from_schedule, schedule_from_entries, schedule_from_rows, CreatePlaceRequest,
    HoursEntry, HoursResponse, ListQuery, ListResponse, OpeningHoursRow, Place,
    PlaceDetailResponse, PlaceResponse, ReplaceHoursRequest, SpecialtyResponse,
    UpdatePlaceRequest,
};
use crate::services::geo::haversine_km;
use crate::services::normalize::{clean, normalize_phone, normalize_postcode, slugify};
use crate::services::opening_hours::{self, WeekSchedule};
use chrono::{Local, NaiveDateTime};
use geo_types::Point;
use sqlx::{SqliteConnection, SqlitePool};
use std::cmp::Ordering;
use validator::Validate;

pub struct PlaceService;

/// Canonical text for a schedule; nothing known means no text
pub fn render_hours(schedule: &WeekSchedule) -> Option<String> {
    if schedule.is_empty() {
        None
    } else {
        Some(opening_hours::format(schedule))
    }
}

impl PlaceService {
    /// Create a new place
    /// DOCUMENTATION: hours_text is parsed up front so a bad value rejects the whole request
    pub async fn create_place(
        pool: &SqlitePool,
        req: CreatePlaceRequest,
    ) -> Result<PlaceDetailResponse, DirectoryError> {
        req.validate()?;
        let req = Self::normalize_create(req);

        let schedule = match req.hours_text.as_deref() {
            Some(text) => opening_hours::parse(text)?,
            None => WeekSchedule::new(),
        };
        Self::check_references(pool, req.place_type_id, &req.specialty_ids).await?;

        let mut tx = pool.begin().await?;
        let slug = Self::unique_slug(&mut tx, &req.name).await?;
        let hours_text = render_hours(&schedule);

        let id = PlaceRepository::insert(&mut tx, &req, &slug, hours_text.as_deref()).await?;
        HoursRepository::replace(&mut tx, id, &schedule).await?;
        SpecialtyRepository::attach(&mut tx, id, &req.specialty_ids).await?;
        tx.commit().await?;

        Self::get_detail(pool, id, None).await
    }

    /// Get a place by numeric id or slug
    /// DOCUMENTATION: An all-digit identifier is tried as an id first, then as a slug
    pub async fn get_place(
        pool: &SqlitePool,
        identifier: &str,
        at: Option<NaiveDateTime>,
    ) -> Result<PlaceDetailResponse, DirectoryError> {
        if let Ok(id) = identifier.parse::<i64>() {
            match Self::get_detail(pool, id, at).await {
                Err(DirectoryError::NotFound(_)) => {}
                found => return found,
            }
        }
        let id = PlaceRepository::get_by_slug(pool, identifier).await?.id;
        Self::get_detail(pool, id, at).await
    }

    /// Full view of an active place: type, hours rows, tags and open-now flag
    pub async fn get_detail(
        pool: &SqlitePool,
        id: i64,
        at: Option<NaiveDateTime>,
    ) -> Result<PlaceDetailResponse, DirectoryError> {
        let place = PlaceRepository::get_by_id(pool, id).await?;

        let place_type = match place.place_type_id {
            Some(type_id) => Some(PlaceTypeRepository::get(pool, type_id).await?.to_response()),
            None => None,
        };

        let rows = HoursRepository::for_place(pool, id).await?;
        let specialties = SpecialtyRepository::for_place(pool, id).await?;

        let mut response = place.to_response();
        response.open_now = open_at(&rows, at.unwrap_or_else(local_now));

        Ok(PlaceDetailResponse {
            place: response,
            place_type,
            opening_hours: Self::entries_for_display(&place, &rows),
            specialties: specialties.iter().map(|s| s.to_response()).collect(),
        })
    }

    /// Browse places with filters and pagination
    /// DOCUMENTATION: SQL narrows by text/type/specialty; distance and open-now
    /// are evaluated here, so pagination happens after them
    pub async fn list_places(
        pool: &SqlitePool,
        query: ListQuery,
    ) -> Result<ListResponse, DirectoryError> {
        let places = PlaceRepository::list_filtered(pool, &query).await?;
        let hours = HoursRepository::for_active_places(pool).await?;
        let at = query.at.unwrap_or_else(local_now);
        let proximity = query.proximity();

        let mut results: Vec<PlaceResponse> = Vec::with_capacity(places.len());
        for place in &places {
            let mut response = place.to_response();

            if let Some((lat, lon, radius_km)) = proximity {
                let Some(point) = place.coordinates() else {
                    continue;
                };
                let distance = haversine_km(Point::new(lon, lat), point);
                if distance > radius_km {
                    continue;
                }
                response.distance_km = Some((distance * 1000.0).round() / 1000.0);
            }

            response.open_now = hours
                .get(&place.id)
                .and_then(|rows| open_at(rows, at));
            // open_now=false keeps everything not known to be open
            match query.open_now {
                Some(true) if response.open_now != Some(true) => continue,
                Some(false) if response.open_now == Some(true) => continue,
                _ => {}
            }

            results.push(response);
        }

        if proximity.is_some() {
            results.sort_by(|a, b| {
                a.distance_km
                    .partial_cmp(&b.distance_km)
                    .unwrap_or(Ordering::Equal)
            });
        }

        let page = query.page();
        let limit = query.limit();
        let total_count = results.len() as i64;
        let data: Vec<PlaceResponse> = results
            .into_iter()
            .skip(((page - 1) * limit) as usize)
            .take(limit as usize)
            .collect();

        log::info!(
            "Listing completed: {} results, {} total (page {})",
            data.len(),
            total_count,
            page
        );

        Ok(ListResponse {
            data,
            total_count,
            page,
            limit,
            has_more: total_count > page * limit,
        })
    }

    /// Update a place
    /// DOCUMENTATION: A new hours_text replaces the structured rows too.
    /// A lone latitude or longitude is accepted only when it moves a located place
    pub async fn update_place(
        pool: &SqlitePool,
        id: i64,
        req: UpdatePlaceRequest,
    ) -> Result<PlaceDetailResponse, DirectoryError> {
        req.validate()?;
        let req = Self::normalize_update(req);

        let schedule = match req.hours_text.as_deref() {
            Some(text) => Some(opening_hours::parse(text)?),
            None => None,
        };
        Self::check_references(pool, req.place_type_id, &[]).await?;

        if req.latitude.is_some() != req.longitude.is_some() {
            let current = PlaceRepository::get_by_id(pool, id).await?;
            let latitude = req.latitude.or(current.latitude);
            let longitude = req.longitude.or(current.longitude);
            if latitude.is_some() != longitude.is_some() {
                return Err(DirectoryError::InvalidInput(
                    "latitude and longitude must be given together".to_string(),
                ));
            }
        }

        let mut tx = pool.begin().await?;
        PlaceRepository::update(&mut tx, id, &req).await?;
        if let Some(schedule) = &schedule {
            Self::write_schedule(&mut tx, id, schedule).await?;
        }
        tx.commit().await?;

        Self::get_detail(pool, id, None).await
    }

    /// Delete a place
    pub async fn delete_place(pool: &SqlitePool, id: i64) -> Result<(), DirectoryError> {
        PlaceRepository::soft_delete(pool, id).await
    }

    /// Structured hours of a place
    pub async fn get_hours(pool: &SqlitePool, id: i64) -> Result<HoursResponse, DirectoryError> {
        let place = PlaceRepository::get_by_id(pool, id).await?;
        let rows = HoursRepository::for_place(pool, id).await?;

        Ok(HoursResponse {
            place_id: id,
            hours: Self::entries_for_display(&place, &rows),
            hours_text: place.hours_text,
        })
    }

    /// Replace the structured hours and regenerate the text from them
    pub async fn replace_hours(
        pool: &SqlitePool,
        id: i64,
        req: ReplaceHoursRequest,
    ) -> Result<HoursResponse, DirectoryError> {
        let schedule = schedule_from_entries(&req.hours)?;
        PlaceRepository::get_by_id(pool, id).await?;

        let mut tx = pool.begin().await?;
        let hours_text = Self::write_schedule(&mut tx, id, &schedule).await?;
        tx.commit().await?;

        log::info!("Replaced hours for place {}: {:?}", id, hours_text);
        Ok(HoursResponse {
            place_id: id,
            hours_text,
            hours: entries_from_schedule(&schedule),
        })
    }

    /// Make `specialty_ids` the complete tag set of a place
    pub async fn assign_specialties(
        pool: &SqlitePool,
        id: i64,
        specialty_ids: Vec<i64>,
    ) -> Result<Vec<SpecialtyResponse>, DirectoryError> {
        let specialty_ids = dedup(specialty_ids);
        PlaceRepository::get_by_id(pool, id).await?;
        Self::check_references(pool, None, &specialty_ids).await?;

        let mut tx = pool.begin().await?;
        SpecialtyRepository::replace_for_place(&mut tx, id, &specialty_ids).await?;
        tx.commit().await?;

        let specialties = SpecialtyRepository::for_place(pool, id).await?;
        Ok(specialties.iter().map(|s| s.to_response()).collect())
    }

    /// Store rows and matching text together; returns the text written
    pub(crate) async fn write_schedule(
        conn: &mut SqliteConnection,
        id: i64,
        schedule: &WeekSchedule,
    ) -> Result<Option<String>, DirectoryError> {
        let hours_text = render_hours(schedule);
        HoursRepository::replace(&mut *conn, id, schedule).await?;
        PlaceRepository::set_hours_text(&mut *conn, id, hours_text.as_deref()).await?;
        Ok(hours_text)
    }

    /// First free slug for a name: "x", "x-2", "x-3", ...
    pub(crate) async fn unique_slug(
        conn: &mut SqliteConnection,
        name: &str,
    ) -> Result<String, DirectoryError> {
        let base = slugify(name);
        let mut candidate = base.clone();
        let mut n = 1;
        while PlaceRepository::slug_exists(&mut *conn, &candidate).await? {
            n += 1;
            candidate = format!("{}-{}", base, n);
        }
        Ok(candidate)
    }

    async fn check_references(
        pool: &SqlitePool,
        place_type_id: Option<i64>,
        specialty_ids: &[i64],
    ) -> Result<(), DirectoryError> {
        if let Some(type_id) = place_type_id {
            PlaceTypeRepository::get(pool, type_id).await.map_err(|_| {
                DirectoryError::InvalidInput(format!("unknown place type {}", type_id))
            })?;
        }

        if !specialty_ids.is_empty() {
            let found = SpecialtyRepository::count_existing(pool, specialty_ids).await?;
            if found != specialty_ids.len() {
                return Err(DirectoryError::InvalidInput(format!(
                    "unknown specialty id in {:?}",
                    specialty_ids
                )));
            }
        }
        Ok(())
    }

    /// Rows as API entries; rows that no longer read back are logged and left out
    fn entries_for_display(place: &Place, rows: &[OpeningHoursRow]) -> Vec<HoursEntry> {
        rows.iter()
            .filter_map(|row| match row.to_entry() {
                Ok(entry) => Some(entry),
                Err(e) => {
                    log::warn!("Skipping bad hours row for place {}: {}", place.id, e);
                    None
                }
            })
            .collect()
    }

    fn normalize_create(req: CreatePlaceRequest) -> CreatePlaceRequest {
        CreatePlaceRequest {
            name: req.name.trim().to_string(),
            description: clean(req.description.as_deref()),
            place_type_id: req.place_type_id,
            address: clean(req.address.as_deref()),
            town: clean(req.town.as_deref()),
            postcode: req.postcode.as_deref().and_then(normalize_postcode),
            phone: req.phone.as_deref().and_then(normalize_phone),
            email: clean(req.email.as_deref()),
            website: clean(req.website.as_deref()),
            latitude: req.latitude,
            longitude: req.longitude,
            hours_text: clean(req.hours_text.as_deref()),
            specialty_ids: dedup(req.specialty_ids),
        }
    }

    fn normalize_update(req: UpdatePlaceRequest) -> UpdatePlaceRequest {
        UpdatePlaceRequest {
            name: req.name.map(|n| n.trim().to_string()),
            postcode: req.postcode.as_deref().and_then(normalize_postcode),
            phone: req.phone.as_deref().and_then(normalize_phone),
            ..req
        }
    }
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Open-now for stored rows; unreadable rows count as unknown
fn open_at(rows: &[OpeningHoursRow], at: NaiveDateTime) -> Option<bool> {
    schedule_from_rows(rows).ok()?.is_open_at(at)
}

fn dedup(mut ids: Vec<i64>) -> Vec<i64> {
    ids.sort_unstable();
    ids.dedup();
    ids
}
