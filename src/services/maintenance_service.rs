// src/services/maintenance_service.rs
// DOCUMENTATION: Bulk import and data-quality passes over the directory
// PURPOSE: Repeatable admin operations: import, duplicates, merge, hours audit/repair, contacts, stats

use crate::db::{HoursRepository, PlaceRepository, SpecialtyRepository};
use crate::errors::DirectoryError;
use crate::models::{schedule_from_rows, CreatePlaceRequest, OpeningHoursRow, Place, PlaceDetailResponse};
use crate::services::geo::haversine_m;
use crate::services::normalize::{comparable_name, normalize_phone, normalize_postcode, slugify};
use crate::services::opening_hours::{self, WeekSchedule};
use crate::services::place_service::{render_hours, PlaceService};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::time::Instant;

/// Import statistics
/// DOCUMENTATION: Tracks results of one import batch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportStats {
    /// Records in the batch
    pub received: u32,
    /// Places successfully created
    pub created: u32,
    /// Records matching an existing place
    pub skipped: u32,
    /// Records rejected (validation or database error)
    pub failed: u32,
    /// One message per failed record
    pub errors: Vec<String>,
    /// Total import duration in milliseconds
    pub duration_ms: u64,
    /// Timestamp when import started
    pub started_at: String,
    /// Timestamp when import completed
    pub completed_at: Option<String>,
}

impl ImportStats {
    pub fn new(received: usize) -> Self {
        Self {
            received: received as u32,
            started_at: Utc::now().to_rfc3339(),
            ..Default::default()
        }
    }

    /// Mark import as completed
    pub fn complete(&mut self, duration_ms: u64) {
        self.duration_ms = duration_ms;
        self.completed_at = Some(Utc::now().to_rfc3339());
    }
}

/// Minimal place view used in maintenance reports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceRef {
    pub id: i64,
    pub name: String,
    pub postcode: Option<String>,
}

impl From<&Place> for PlaceRef {
    fn from(place: &Place) -> Self {
        PlaceRef {
            id: place.id,
            name: place.name.clone(),
            postcode: place.postcode.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DuplicatePair {
    pub first: PlaceRef,
    pub second: PlaceRef,
    /// "same_name" and/or "same_postcode_nearby"
    pub reasons: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum HoursProblem {
    /// hours_text differs from the text rendered from the rows
    TextMismatch,
    /// Rows stored with unpadded or stray times
    NonCanonicalRows,
    /// Rows that cannot be read back at all
    InvalidRows(String),
    /// Text present but not parseable
    UnparsableText(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct HoursAuditEntry {
    pub place: PlaceRef,
    pub stored_text: Option<String>,
    pub rendered_text: Option<String>,
    pub problems: Vec<HoursProblem>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepairPreference {
    Structured,
    Text,
    #[default]
    Auto,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepairRequest {
    #[serde(default)]
    pub prefer: RepairPreference,
}

#[derive(Debug, Clone, Serialize)]
pub struct RepairOutcome {
    pub place: PlaceRef,
    pub source: RepairPreference,
    pub before: Option<String>,
    pub after: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RepairFailure {
    pub place: PlaceRef,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RepairReport {
    pub examined: usize,
    pub repaired: Vec<RepairOutcome>,
    pub failed: Vec<RepairFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContactReport {
    pub examined: usize,
    pub updated: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeCount {
    pub place_type: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DirectoryStats {
    pub total_places: i64,
    pub active_places: i64,
    pub places_by_type: Vec<TypeCount>,
    pub missing_coordinates: i64,
    pub missing_hours: i64,
    pub inconsistent_hours: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MergeRequest {
    pub keep_id: i64,
    pub merge_id: i64,
}

/// Maintenance service for the directory
/// DOCUMENTATION: Every operation here is safe to run repeatedly
pub struct MaintenanceService;

impl MaintenanceService {
    /// Import a batch of place records
    /// DOCUMENTATION: A record is a duplicate when an active place with the
    /// same name slug and normalised postcode already exists
    pub async fn import(
        pool: &SqlitePool,
        records: Vec<CreatePlaceRequest>,
    ) -> Result<ImportStats, DirectoryError> {
        let start = Instant::now();
        let mut stats = ImportStats::new(records.len());

        log::info!("Starting import of {} records", records.len());

        for record in records {
            let slug = slugify(record.name.trim());
            let postcode = record.postcode.as_deref().and_then(normalize_postcode);

            let existing = PlaceRepository::find_by_postcode(pool, postcode.as_deref()).await?;
            if existing.iter().any(|p| slugify(&p.name) == slug) {
                log::debug!("Skipping existing place: {}", record.name);
                stats.skipped += 1;
                continue;
            }

            let name = record.name.clone();
            match PlaceService::create_place(pool, record).await {
                Ok(_) => stats.created += 1,
                Err(e) => {
                    log::warn!("Failed to import {}: {}", name, e);
                    stats.failed += 1;
                    stats.errors.push(format!("{}: {}", name, e));
                }
            }
        }

        stats.complete(start.elapsed().as_millis() as u64);
        log::info!(
            "Import completed: {} created, {} skipped, {} failed in {}ms",
            stats.created,
            stats.skipped,
            stats.failed,
            stats.duration_ms
        );
        Ok(stats)
    }

    /// Pairs of active places that look like the same business
    pub async fn find_duplicates(
        pool: &SqlitePool,
        radius_m: f64,
    ) -> Result<Vec<DuplicatePair>, DirectoryError> {
        let places = PlaceRepository::list_active(pool).await?;
        let names: Vec<String> = places.iter().map(|p| comparable_name(&p.name)).collect();

        let mut pairs = Vec::new();
        for i in 0..places.len() {
            for j in (i + 1)..places.len() {
                let (a, b) = (&places[i], &places[j]);
                let mut reasons = Vec::new();

                if !names[i].is_empty() && names[i] == names[j] {
                    reasons.push("same_name".to_string());
                }

                let distance_m = match (a.coordinates(), b.coordinates()) {
                    (Some(pa), Some(pb)) => Some(haversine_m(pa, pb)),
                    _ => None,
                };
                let same_postcode = a.postcode.is_some() && a.postcode == b.postcode;
                if same_postcode && distance_m.is_some_and(|d| d <= radius_m) {
                    reasons.push("same_postcode_nearby".to_string());
                }

                if !reasons.is_empty() {
                    pairs.push(DuplicatePair {
                        first: a.into(),
                        second: b.into(),
                        reasons,
                        distance_m: distance_m.map(|d| d.round()),
                    });
                }
            }
        }

        log::info!("Duplicate scan: {} pairs among {} places", pairs.len(), places.len());
        Ok(pairs)
    }

    /// Fold `merge_id` into `keep_id`
    pub async fn merge(
        pool: &SqlitePool,
        req: MergeRequest,
    ) -> Result<PlaceDetailResponse, DirectoryError> {
        if req.keep_id == req.merge_id {
            return Err(DirectoryError::InvalidInput(
                "cannot merge a place into itself".to_string(),
            ));
        }

        let mut tx = pool.begin().await?;

        let mut places = Vec::with_capacity(2);
        for id in [req.keep_id, req.merge_id] {
            match PlaceRepository::find_by_id(&mut *tx, id).await? {
                None => return Err(DirectoryError::NotFound(format!("place {}", id))),
                Some(p) if !p.is_active => {
                    return Err(DirectoryError::InvalidInput(format!(
                        "place {} is no longer active",
                        id
                    )))
                }
                Some(p) => places.push(p),
            }
        }
        let merged_text = places.pop().and_then(|p| p.hours_text);
        let kept_text = places.pop().and_then(|p| p.hours_text);

        PlaceRepository::fill_blanks_from(&mut tx, req.keep_id, req.merge_id).await?;
        SpecialtyRepository::copy(&mut tx, req.merge_id, req.keep_id).await?;

        let keep_rows = HoursRepository::for_place(&mut *tx, req.keep_id).await?;
        if keep_rows.is_empty() {
            let copied = HoursRepository::copy(&mut tx, req.merge_id, req.keep_id).await?;
            log::debug!("Adopted {} hours rows from place {}", copied, req.merge_id);
        }

        // Without rows on either side the text is all there is
        let rows = HoursRepository::for_place(&mut *tx, req.keep_id).await?;
        if rows.is_empty() {
            if kept_text.is_none() && merged_text.is_some() {
                PlaceRepository::set_hours_text(&mut *tx, req.keep_id, merged_text.as_deref())
                    .await?;
            }
        } else {
            match schedule_from_rows(&rows) {
                Ok(schedule) => {
                    PlaceService::write_schedule(&mut tx, req.keep_id, &schedule).await?;
                }
                Err(e) => log::warn!(
                    "Place {} keeps its hours text, rows unreadable: {}",
                    req.keep_id,
                    e
                ),
            }
        }

        PlaceRepository::mark_merged(&mut tx, req.merge_id, req.keep_id).await?;
        tx.commit().await?;

        log::info!("Merged place {} into {}", req.merge_id, req.keep_id);
        PlaceService::get_detail(pool, req.keep_id, None).await
    }

    /// Active places whose hours text and rows disagree
    pub async fn hours_audit(pool: &SqlitePool) -> Result<Vec<HoursAuditEntry>, DirectoryError> {
        let places = PlaceRepository::list_active(pool).await?;
        let hours = HoursRepository::for_active_places(pool).await?;
        let no_rows = Vec::new();

        let entries: Vec<HoursAuditEntry> = places
            .iter()
            .filter_map(|place| {
                let rows = hours.get(&place.id).unwrap_or(&no_rows);
                audit_place(place, rows)
            })
            .collect();

        log::info!("Hours audit: {} of {} places inconsistent", entries.len(), places.len());
        Ok(entries)
    }

    /// Bring rows and text back in sync for every audited place
    /// DOCUMENTATION: A second run finds nothing left to do
    pub async fn hours_repair(
        pool: &SqlitePool,
        prefer: RepairPreference,
    ) -> Result<RepairReport, DirectoryError> {
        let places = PlaceRepository::list_active(pool).await?;
        let hours = HoursRepository::for_active_places(pool).await?;
        let no_rows = Vec::new();

        let mut report = RepairReport {
            examined: places.len(),
            repaired: Vec::new(),
            failed: Vec::new(),
        };

        for place in &places {
            let rows = hours.get(&place.id).unwrap_or(&no_rows);
            if audit_place(place, rows).is_none() {
                continue;
            }

            let (source, schedule) = match choose_schedule(place, rows, prefer) {
                Ok(chosen) => chosen,
                Err(reason) => {
                    log::warn!("Cannot repair hours of place {}: {}", place.id, reason);
                    report.failed.push(RepairFailure {
                        place: place.into(),
                        reason,
                    });
                    continue;
                }
            };

            let mut tx = pool.begin().await?;
            let after = PlaceService::write_schedule(&mut tx, place.id, &schedule).await?;
            tx.commit().await?;

            report.repaired.push(RepairOutcome {
                place: place.into(),
                source,
                before: place.hours_text.clone(),
                after,
            });
        }

        log::info!(
            "Hours repair: {} repaired, {} failed",
            report.repaired.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Rewrite phone numbers and postcodes into canonical form
    pub async fn normalize_contacts(pool: &SqlitePool) -> Result<ContactReport, DirectoryError> {
        let places = PlaceRepository::list_active(pool).await?;
        let mut updated = 0;

        for place in &places {
            let phone = place.phone.as_deref().and_then(normalize_phone);
            let postcode = place.postcode.as_deref().and_then(normalize_postcode);

            if phone != place.phone || postcode != place.postcode {
                PlaceRepository::set_contacts(pool, place.id, phone.as_deref(), postcode.as_deref())
                    .await?;
                updated += 1;
            }
        }

        log::info!("Normalised contacts on {} of {} places", updated, places.len());
        Ok(ContactReport {
            examined: places.len(),
            updated,
        })
    }

    pub async fn stats(pool: &SqlitePool) -> Result<DirectoryStats, DirectoryError> {
        let (total_places, active_places, missing_coordinates, missing_hours) =
            PlaceRepository::counts(pool).await?;
        let places_by_type = PlaceRepository::count_by_type(pool)
            .await?
            .into_iter()
            .map(|(place_type, count)| TypeCount { place_type, count })
            .collect();
        let inconsistent_hours = Self::hours_audit(pool).await?.len();

        Ok(DirectoryStats {
            total_places,
            active_places,
            places_by_type,
            missing_coordinates,
            missing_hours,
            inconsistent_hours,
        })
    }
}

/// Problems with one place's hours, or None when text and rows agree
fn audit_place(place: &Place, rows: &[OpeningHoursRow]) -> Option<HoursAuditEntry> {
    let mut problems = Vec::new();
    let mut rendered_text = None;

    match schedule_from_rows(rows) {
        Ok(schedule) => {
            rendered_text = render_hours(&schedule);
            if rendered_text != place.hours_text {
                problems.push(HoursProblem::TextMismatch);
            }
        }
        Err(e) => problems.push(HoursProblem::InvalidRows(e.to_string())),
    }

    if rows.iter().any(|row| !row.is_canonical()) {
        problems.push(HoursProblem::NonCanonicalRows);
    }

    if let Some(text) = place.hours_text.as_deref() {
        if let Err(e) = opening_hours::parse(text) {
            problems.push(HoursProblem::UnparsableText(e.to_string()));
        }
    }

    if problems.is_empty() {
        return None;
    }
    Some(HoursAuditEntry {
        place: place.into(),
        stored_text: place.hours_text.clone(),
        rendered_text,
        problems,
    })
}

/// Pick the side to trust; text preference keeps the rows when there is no text
fn choose_schedule(
    place: &Place,
    rows: &[OpeningHoursRow],
    prefer: RepairPreference,
) -> Result<(RepairPreference, WeekSchedule), String> {
    let from_rows = || schedule_from_rows(rows).map_err(|e| format!("stored rows: {}", e));
    let from_text = |text: &str| opening_hours::parse(text).map_err(|e| format!("hours text: {}", e));

    match (prefer, place.hours_text.as_deref()) {
        (RepairPreference::Structured, _) => Ok((RepairPreference::Structured, from_rows()?)),
        (RepairPreference::Text, Some(text)) => Ok((RepairPreference::Text, from_text(text)?)),
        (RepairPreference::Text, None) => Ok((RepairPreference::Structured, from_rows()?)),
        (RepairPreference::Auto, text) => {
            if !rows.is_empty() {
                if let Ok(schedule) = schedule_from_rows(rows) {
                    return Ok((RepairPreference::Structured, schedule));
                }
            }
            match text {
                Some(text) => Ok((RepairPreference::Text, from_text(text)?)),
                None => Ok((RepairPreference::Structured, from_rows()?)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn record(name: &str, postcode: &str) -> CreatePlaceRequest {
        CreatePlaceRequest {
            name: name.to_string(),
            postcode: Some(postcode.to_string()),
            latitude: Some(55.9760),
            longitude: Some(-3.1720),
            hours_text: Some("Tue-Sat 10-5".to_string()),
            ..Default::default()
        }
    }

    async fn corrupt_hours(pool: &SqlitePool, place_id: i64, text: Option<&str>) {
        sqlx::query("UPDATE opening_hours SET opens = '9:00' WHERE place_id = ? AND day_of_week = 1")
            .bind(place_id)
            .execute(pool)
            .await
            .unwrap();
        PlaceRepository::set_hours_text(pool, place_id, text).await.unwrap();
    }

    #[tokio::test]
    async fn test_import_dedupes_by_name_and_postcode() {
        let pool = test_pool().await;
        let batch = vec![
            record("Leith Antiques", "EH6 6QU"),
            record("Leith Antiques", "eh66qu"),
            record("Leith Antiques", "EH7 4AA"),
            CreatePlaceRequest::default(),
        ];

        let stats = MaintenanceService::import(&pool, batch).await.unwrap();
        assert_eq!(stats.received, 4);
        assert_eq!(stats.created, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.errors.len(), 1);
        assert!(stats.completed_at.is_some());

        let again = MaintenanceService::import(&pool, vec![record("Leith Antiques", "EH6 6QU")])
            .await
            .unwrap();
        assert_eq!(again.skipped, 1);
        assert_eq!(again.created, 0);
    }

    #[tokio::test]
    async fn test_duplicates_and_merge() {
        let pool = test_pool().await;
        let a = PlaceService::create_place(&pool, record("The Clock Shop", "EH6 6QU"))
            .await
            .unwrap();
        let mut b_req = record("Clock Shop Ltd", "EH6 6QU");
        b_req.phone = Some("0131 555 0000".into());
        b_req.hours_text = None;
        let b = PlaceService::create_place(&pool, b_req).await.unwrap();

        let pairs = MaintenanceService::find_duplicates(&pool, 25.0).await.unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].reasons, vec!["same_name", "same_postcode_nearby"]);

        let merged = MaintenanceService::merge(
            &pool,
            MergeRequest {
                keep_id: b.place.id,
                merge_id: a.place.id,
            },
        )
        .await
        .unwrap();
        assert_eq!(merged.place.phone.as_deref(), Some("01315550000"));
        assert_eq!(merged.place.hours_text.as_deref(), Some("Tue-Sat 10:00-17:00"));
        assert_eq!(merged.opening_hours.len(), 5);

        let retired = PlaceRepository::find_by_id(&pool, a.place.id).await.unwrap().unwrap();
        assert!(!retired.is_active);
        assert_eq!(retired.merged_into, Some(b.place.id));

        assert!(MaintenanceService::find_duplicates(&pool, 25.0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_merge_without_rows_keeps_text_hours() {
        let pool = test_pool().await;
        let mut keep_req = record("Text Only", "EH1 2AB");
        keep_req.hours_text = None;
        let keep = PlaceService::create_place(&pool, keep_req).await.unwrap();
        PlaceRepository::set_hours_text(&pool, keep.place.id, Some("Ring the bell"))
            .await
            .unwrap();

        let mut dup_req = record("Text Only Ltd", "EH1 2AB");
        dup_req.hours_text = None;
        let dup = PlaceService::create_place(&pool, dup_req).await.unwrap();

        let merged = MaintenanceService::merge(
            &pool,
            MergeRequest { keep_id: keep.place.id, merge_id: dup.place.id },
        )
        .await
        .unwrap();
        assert_eq!(merged.place.hours_text.as_deref(), Some("Ring the bell"));
        assert!(merged.opening_hours.is_empty());
    }

    #[tokio::test]
    async fn test_merge_without_rows_adopts_duplicate_text() {
        let pool = test_pool().await;
        let mut keep_req = record("Bare", "EH1 2AB");
        keep_req.hours_text = None;
        let keep = PlaceService::create_place(&pool, keep_req).await.unwrap();

        let mut dup_req = record("Bare Ltd", "EH1 2AB");
        dup_req.hours_text = None;
        let dup = PlaceService::create_place(&pool, dup_req).await.unwrap();
        PlaceRepository::set_hours_text(&pool, dup.place.id, Some("Phone ahead"))
            .await
            .unwrap();

        let merged = MaintenanceService::merge(
            &pool,
            MergeRequest { keep_id: keep.place.id, merge_id: dup.place.id },
        )
        .await
        .unwrap();
        assert_eq!(merged.place.hours_text.as_deref(), Some("Phone ahead"));
    }

    #[tokio::test]
    async fn test_merge_rejects_self_and_inactive() {
        let pool = test_pool().await;
        let a = PlaceService::create_place(&pool, record("One", "EH1 1AA")).await.unwrap();
        let b = PlaceService::create_place(&pool, record("Two", "EH1 1AA")).await.unwrap();

        let same = MaintenanceService::merge(&pool, MergeRequest { keep_id: a.place.id, merge_id: a.place.id }).await;
        assert!(matches!(same, Err(DirectoryError::InvalidInput(_))));

        PlaceService::delete_place(&pool, b.place.id).await.unwrap();
        let inactive = MaintenanceService::merge(&pool, MergeRequest { keep_id: a.place.id, merge_id: b.place.id }).await;
        assert!(matches!(inactive, Err(DirectoryError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_hours_audit_and_repair_idempotent() {
        let pool = test_pool().await;
        let place = PlaceService::create_place(&pool, record("Drifted", "EH3 6SD"))
            .await
            .unwrap();
        assert!(MaintenanceService::hours_audit(&pool).await.unwrap().is_empty());

        corrupt_hours(&pool, place.place.id, Some("Tue-Sat 10am-4pm")).await;

        let audit = MaintenanceService::hours_audit(&pool).await.unwrap();
        assert_eq!(audit.len(), 1);
        assert!(audit[0].problems.contains(&HoursProblem::TextMismatch));
        assert!(audit[0].problems.contains(&HoursProblem::NonCanonicalRows));

        let report = MaintenanceService::hours_repair(&pool, RepairPreference::Text)
            .await
            .unwrap();
        assert_eq!(report.repaired.len(), 1);
        assert_eq!(report.repaired[0].after.as_deref(), Some("Tue-Sat 10:00-16:00"));

        assert!(MaintenanceService::hours_audit(&pool).await.unwrap().is_empty());
        let second = MaintenanceService::hours_repair(&pool, RepairPreference::Auto)
            .await
            .unwrap();
        assert!(second.repaired.is_empty());
        assert!(second.failed.is_empty());
    }

    #[tokio::test]
    async fn test_auto_repair_prefers_rows() {
        let pool = test_pool().await;
        let place = PlaceService::create_place(&pool, record("Rows Win", "EH3 6SD"))
            .await
            .unwrap();
        corrupt_hours(&pool, place.place.id, Some("Sun 12-4")).await;

        let report = MaintenanceService::hours_repair(&pool, RepairPreference::Auto)
            .await
            .unwrap();
        assert_eq!(report.repaired[0].source, RepairPreference::Structured);
        assert_eq!(
            report.repaired[0].after.as_deref(),
            Some("Tue 09:00-17:00; Wed-Sat 10:00-17:00")
        );
    }

    #[tokio::test]
    async fn test_normalize_contacts_and_stats() {
        let pool = test_pool().await;
        let place = PlaceService::create_place(&pool, record("Messy", "EH3 6SD"))
            .await
            .unwrap();
        PlaceRepository::set_contacts(&pool, place.place.id, Some("131 225 1234"), Some("eh36sd"))
            .await
            .unwrap();

        let report = MaintenanceService::normalize_contacts(&pool).await.unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(MaintenanceService::normalize_contacts(&pool).await.unwrap().updated, 0);

        let stats = MaintenanceService::stats(&pool).await.unwrap();
        assert_eq!(stats.total_places, 1);
        assert_eq!(stats.active_places, 1);
        assert_eq!(stats.missing_coordinates, 0);
        assert_eq!(stats.missing_hours, 0);
        assert_eq!(stats.inconsistent_hours, 0);
        assert_eq!(stats.places_by_type[0].place_type, "untyped");
    }
}
