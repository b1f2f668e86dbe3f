// src/models/hours.rs
// DOCUMENTATION: Structured opening hours rows and their API shape
// PURPOSE: Bridge between the opening_hours table and WeekSchedule

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::services::opening_hours::{
    format_time, normalize_time, Day, DayHours, HoursParseError, HoursStatus, WeekSchedule,
};

/// One row of the opening_hours table
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OpeningHoursRow {
    pub place_id: i64,
    pub day_of_week: i64,
    pub status: String,
    pub opens: Option<String>,
    pub closes: Option<String>,
}

/// Opening hours for a single day as sent and received over the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoursEntry {
    pub day: Day,
    pub status: HoursStatus,
    #[serde(default)]
    pub opens: Option<String>,
    #[serde(default)]
    pub closes: Option<String>,
}

/// Body of PUT /places/{id}/hours
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceHoursRequest {
    pub hours: Vec<HoursEntry>,
}

/// Stored hours after a write: rows plus the regenerated text
#[derive(Debug, Clone, Serialize)]
pub struct HoursResponse {
    pub place_id: i64,
    pub hours_text: Option<String>,
    pub hours: Vec<HoursEntry>,
}

impl HoursEntry {
    pub fn to_day_hours(&self) -> Result<DayHours, HoursParseError> {
        match self.status {
            HoursStatus::Closed => Ok(DayHours::Closed),
            HoursStatus::Appointment => Ok(DayHours::ByAppointment),
            HoursStatus::Open => {
                let (Some(opens), Some(closes)) = (&self.opens, &self.closes) else {
                    return Err(HoursParseError::MissingHours(format!("{:?}", self.day)));
                };
                let opens = normalize_time(opens)?;
                let closes = normalize_time(closes)?;
                if closes <= opens {
                    return Err(HoursParseError::InvalidRange(format!(
                        "{}-{}",
                        format_time(opens),
                        format_time(closes)
                    )));
                }
                Ok(DayHours::Open { opens, closes })
            }
        }
    }

    pub fn from_day_hours(day: Day, hours: DayHours) -> Self {
        let (opens, closes) = match hours {
            DayHours::Open { opens, closes } => (Some(format_time(opens)), Some(format_time(closes))),
            DayHours::Closed | DayHours::ByAppointment => (None, None),
        };
        HoursEntry {
            day,
            status: hours.status(),
            opens,
            closes,
        }
    }
}

impl OpeningHoursRow {
    pub fn to_entry(&self) -> Result<HoursEntry, HoursParseError> {
        Ok(HoursEntry {
            day: Day::from_index(self.day_of_week)?,
            status: HoursStatus::parse(&self.status)?,
            opens: self.opens.clone(),
            closes: self.closes.clone(),
        })
    }

    /// Times present exactly when open, and already zero-padded `HH:MM`
    pub fn is_canonical(&self) -> bool {
        let canonical = |v: &Option<String>| {
            v.as_deref()
                .map(|s| normalize_time(s).map(format_time).as_deref() == Ok(s))
                .unwrap_or(false)
        };
        match self.status.as_str() {
            "open" => canonical(&self.opens) && canonical(&self.closes),
            _ => self.opens.is_none() && self.closes.is_none(),
        }
    }
}

/// Build a schedule from API entries, rejecting a day given twice
pub fn schedule_from_entries(entries: &[HoursEntry]) -> Result<WeekSchedule, HoursParseError> {
    let mut schedule = WeekSchedule::new();
    for entry in entries {
        if schedule.get(entry.day).is_some() {
            return Err(HoursParseError::DuplicateDay(entry.day));
        }
        schedule.set(entry.day, entry.to_day_hours()?);
    }
    Ok(schedule)
}

/// Build a schedule from stored rows; the first bad row aborts
pub fn schedule_from_rows(rows: &[OpeningHoursRow]) -> Result<WeekSchedule, HoursParseError> {
    let entries = rows
        .iter()
        .map(OpeningHoursRow::to_entry)
        .collect::<Result<Vec<_>, _>>()?;
    schedule_from_entries(&entries)
}

pub fn entries_from_schedule(schedule: &WeekSchedule) -> Vec<HoursEntry> {
    schedule
        .iter()
        .map(|(day, hours)| HoursEntry::from_day_hours(day, hours))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(day: i64, status: &str, opens: Option<&str>, closes: Option<&str>) -> OpeningHoursRow {
        OpeningHoursRow {
            place_id: 1,
            day_of_week: day,
            status: status.to_string(),
            opens: opens.map(str::to_string),
            closes: closes.map(str::to_string),
        }
    }

    #[test]
    fn test_rows_to_schedule_accepts_unpadded_times() {
        let rows = vec![
            row(0, "open", Some("9:30"), Some("17:00")),
            row(6, "closed", None, None),
        ];
        let schedule = schedule_from_rows(&rows).unwrap();
        assert_eq!(
            crate::services::opening_hours::format(&schedule),
            "Mon 09:30-17:00; Sun closed"
        );
    }

    #[test]
    fn test_canonical_detection() {
        assert!(row(0, "open", Some("09:30"), Some("17:00")).is_canonical());
        assert!(!row(0, "open", Some("9:30"), Some("17:00")).is_canonical());
        assert!(!row(0, "open", None, Some("17:00")).is_canonical());
        assert!(row(2, "appointment", None, None).is_canonical());
        assert!(!row(2, "closed", Some("10:00"), None).is_canonical());
    }

    #[test]
    fn test_duplicate_day_rejected() {
        let entries = vec![
            HoursEntry::from_day_hours(Day::Monday, DayHours::Closed),
            HoursEntry::from_day_hours(Day::Monday, DayHours::ByAppointment),
        ];
        assert_eq!(
            schedule_from_entries(&entries),
            Err(HoursParseError::DuplicateDay(Day::Monday))
        );
    }

    #[test]
    fn test_open_entry_needs_both_times() {
        let entry = HoursEntry {
            day: Day::Friday,
            status: HoursStatus::Open,
            opens: Some("10:00".into()),
            closes: None,
        };
        assert!(entry.to_day_hours().is_err());
    }

    #[test]
    fn test_bad_day_index_reported() {
        let rows = vec![row(7, "closed", None, None)];
        assert_eq!(
            schedule_from_rows(&rows),
            Err(HoursParseError::InvalidDayIndex(7))
        );
    }
}
