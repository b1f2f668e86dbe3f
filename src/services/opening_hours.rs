// src/services/opening_hours.rs
// DOCUMENTATION: Opening hours text <-> structured week conversion
// PURPOSE: Keep the free-text hours on a place and its per-day rows in agreement

use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while reading opening hours
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HoursParseError {
    #[error("unknown day '{0}'")]
    UnknownDay(String),

    #[error("invalid time '{0}'")]
    InvalidTime(String),

    #[error("closing time must be after opening time in '{0}'")]
    InvalidRange(String),

    #[error("no days given in '{0}'")]
    MissingDays(String),

    #[error("no hours given in '{0}'")]
    MissingHours(String),

    #[error("{0:?} is listed more than once")]
    DuplicateDay(Day),

    #[error("day index {0} is outside 0..=6")]
    InvalidDayIndex(i64),

    #[error("unknown status '{0}'")]
    UnknownStatus(String),
}

/// Day of the week, Monday first (index 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Day {
    pub const ALL: [Day; 7] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
        Day::Sunday,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: i64) -> Result<Day, HoursParseError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or(HoursParseError::InvalidDayIndex(index))
    }

    pub fn short_name(self) -> &'static str {
        match self {
            Day::Monday => "Mon",
            Day::Tuesday => "Tue",
            Day::Wednesday => "Wed",
            Day::Thursday => "Thu",
            Day::Friday => "Fri",
            Day::Saturday => "Sat",
            Day::Sunday => "Sun",
        }
    }

    fn full_name(self) -> &'static str {
        match self {
            Day::Monday => "monday",
            Day::Tuesday => "tuesday",
            Day::Wednesday => "wednesday",
            Day::Thursday => "thursday",
            Day::Friday => "friday",
            Day::Saturday => "saturday",
            Day::Sunday => "sunday",
        }
    }

    /// Accepts full names and any prefix of two letters or more ("tu", "thurs", "sat.")
    fn from_token(token: &str) -> Option<Day> {
        let token = token.trim().trim_end_matches('.');
        if token == "weds" {
            return Some(Day::Wednesday);
        }
        if token.len() < 2 {
            return None;
        }
        Self::ALL
            .iter()
            .copied()
            .find(|d| d.full_name().starts_with(token))
    }

    /// Inclusive range, wrapping past Sunday
    fn range(from: Day, to: Day) -> Vec<Day> {
        let mut days = Vec::new();
        let mut i = from.index();
        loop {
            days.push(Self::ALL[i]);
            if i == to.index() {
                break;
            }
            i = (i + 1) % 7;
        }
        days
    }
}

impl From<Weekday> for Day {
    fn from(w: Weekday) -> Self {
        Day::ALL[w.num_days_from_monday() as usize]
    }
}

/// Stored status of a single day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HoursStatus {
    Open,
    Closed,
    Appointment,
}

impl HoursStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            HoursStatus::Open => "open",
            HoursStatus::Closed => "closed",
            HoursStatus::Appointment => "appointment",
        }
    }

    pub fn parse(value: &str) -> Result<HoursStatus, HoursParseError> {
        match value {
            "open" => Ok(HoursStatus::Open),
            "closed" => Ok(HoursStatus::Closed),
            "appointment" => Ok(HoursStatus::Appointment),
            other => Err(HoursParseError::UnknownStatus(other.to_string())),
        }
    }
}

/// What a place does on one day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayHours {
    Open { opens: NaiveTime, closes: NaiveTime },
    Closed,
    ByAppointment,
}

impl DayHours {
    pub fn status(&self) -> HoursStatus {
        match self {
            DayHours::Open { .. } => HoursStatus::Open,
            DayHours::Closed => HoursStatus::Closed,
            DayHours::ByAppointment => HoursStatus::Appointment,
        }
    }

    fn render(&self) -> String {
        match self {
            DayHours::Open { opens, closes } => {
                format!("{}-{}", format_time(*opens), format_time(*closes))
            }
            DayHours::Closed => "closed".to_string(),
            DayHours::ByAppointment => "by appointment".to_string(),
        }
    }
}

/// Canonical zero-padded 24h rendering
pub fn format_time(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

/// One optional entry per day; a missing entry means the hours are unknown
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeekSchedule {
    days: [Option<DayHours>; 7],
}

impl WeekSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, day: Day) -> Option<DayHours> {
        self.days[day.index()]
    }

    pub fn set(&mut self, day: Day, hours: DayHours) {
        self.days[day.index()] = Some(hours);
    }

    pub fn is_empty(&self) -> bool {
        self.days.iter().all(Option::is_none)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Day, DayHours)> + '_ {
        Day::ALL
            .iter()
            .filter_map(move |d| self.get(*d).map(|h| (*d, h)))
    }

    /// `None` when nothing is known about that day
    pub fn is_open_at(&self, at: NaiveDateTime) -> Option<bool> {
        let t = at.time();
        self.get(Day::from(at.weekday())).map(|hours| match hours {
            DayHours::Open { opens, closes } => opens <= t && t < closes,
            DayHours::Closed | DayHours::ByAppointment => false,
        })
    }
}

/// Parse free-text opening hours such as
/// `Mon-Fri 10am-5pm; Sat 10:00-16:00; Sun closed; Thu by appointment`.
///
/// Entries are separated by `;` or newlines and later entries win for the
/// same day, so `Daily 10-5; Sun closed` works as expected.
pub fn parse(text: &str) -> Result<WeekSchedule, HoursParseError> {
    let mut schedule = WeekSchedule::new();

    for entry in text.split(|c| c == ';' || c == '\n') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }

        let (days, hours) = parse_entry(entry)?;
        for day in days {
            schedule.set(day, hours);
        }
    }

    Ok(schedule)
}

/// Render a schedule in the canonical form accepted by [`parse`]
pub fn format(schedule: &WeekSchedule) -> String {
    // (first day index, last day index, hours)
    let mut runs: Vec<(usize, usize, DayHours)> = Vec::new();

    for (i, slot) in schedule.days.iter().enumerate() {
        let Some(hours) = slot else { continue };

        match runs.last_mut() {
            Some((_, end, last)) if *end + 1 == i && *last == *hours => *end = i,
            _ => runs.push((i, i, *hours)),
        }
    }

    runs.iter()
        .map(|(start, end, hours)| format!("{} {}", day_label(*start, *end), hours.render()))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Lenient single time reader, used to repair stored values like `9:30`
pub fn normalize_time(raw: &str) -> Result<NaiveTime, HoursParseError> {
    parse_clock(raw).map(|(t, _)| t)
}

fn day_label(start: usize, end: usize) -> String {
    let first = Day::ALL[start].short_name();
    let last = Day::ALL[end].short_name();
    match end - start {
        0 => first.to_string(),
        1 => format!("{}, {}", first, last),
        _ => format!("{}-{}", first, last),
    }
}

fn parse_entry(entry: &str) -> Result<(Vec<Day>, DayHours), HoursParseError> {
    let lowered: String = entry
        .to_lowercase()
        .chars()
        .map(|c| if c == '\u{2013}' || c == '\u{2014}' { '-' } else { c })
        .collect();

    let split = hours_start(&lowered)
        .ok_or_else(|| HoursParseError::MissingHours(entry.to_string()))?;
    let (day_part, hours_part) = lowered.split_at(split);

    let day_part = day_part.trim().trim_end_matches(':').trim();
    if day_part.is_empty() {
        return Err(HoursParseError::MissingDays(entry.to_string()));
    }

    let days = parse_days(day_part)?;
    let hours = parse_hours(hours_part.trim())?;
    Ok((days, hours))
}

/// Byte offset where the hours half of an entry begins
fn hours_start(entry: &str) -> Option<usize> {
    let digit = entry.find(|c: char| c.is_ascii_digit());
    let keyword = ["closed", "by appointment", "appointment", "noon", "midday"]
        .iter()
        .filter_map(|k| entry.find(k))
        .min();

    match (digit, keyword) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn parse_days(part: &str) -> Result<Vec<Day>, HoursParseError> {
    let normalized = part
        .replace(" and ", ",")
        .replace('&', ",")
        .replace(" to ", "-");

    let mut days = Vec::new();
    for token in normalized.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        match token {
            "daily" | "every day" | "everyday" => days.extend(Day::ALL),
            "weekdays" => days.extend(&Day::ALL[..5]),
            "weekends" | "weekend" => days.extend(&Day::ALL[5..]),
            _ => match token.split_once('-') {
                Some((from, to)) => days.extend(Day::range(parse_day(from)?, parse_day(to)?)),
                None => days.push(parse_day(token)?),
            },
        }
    }

    if days.is_empty() {
        return Err(HoursParseError::MissingDays(part.to_string()));
    }
    Ok(days)
}

fn parse_day(token: &str) -> Result<Day, HoursParseError> {
    Day::from_token(token).ok_or_else(|| HoursParseError::UnknownDay(token.trim().to_string()))
}

fn parse_hours(part: &str) -> Result<DayHours, HoursParseError> {
    if part.contains("appointment") {
        return Ok(DayHours::ByAppointment);
    }
    if part.starts_with("closed") {
        return Ok(DayHours::Closed);
    }

    let normalized = part.replace(" to ", "-");
    let (open_raw, close_raw) = normalized
        .split_once('-')
        .ok_or_else(|| HoursParseError::InvalidRange(part.to_string()))?;

    let (opens, _) = parse_clock(open_raw)?;
    let (mut closes, close_has_meridiem) = parse_clock(close_raw)?;

    // "10-5" means 10:00-17:00
    if !close_has_meridiem && closes <= opens && closes.hour() < 12 {
        closes += Duration::hours(12);
    }

    if closes <= opens {
        return Err(HoursParseError::InvalidRange(part.to_string()));
    }

    Ok(DayHours::Open { opens, closes })
}

/// Returns the time and whether an am/pm marker was present
fn parse_clock(raw: &str) -> Result<(NaiveTime, bool), HoursParseError> {
    let invalid = || HoursParseError::InvalidTime(raw.trim().to_string());

    let compact: String = raw
        .trim()
        .to_lowercase()
        .replace("a.m.", "am")
        .replace("p.m.", "pm")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    if compact == "noon" || compact == "midday" || compact == "12noon" {
        return Ok((NaiveTime::from_hms_opt(12, 0, 0).ok_or_else(invalid)?, true));
    }

    let (digits, pm) = if let Some(rest) = compact.strip_suffix("am") {
        (rest, Some(false))
    } else if let Some(rest) = compact.strip_suffix("pm") {
        (rest, Some(true))
    } else {
        (compact.as_str(), None)
    };

    let digits = digits.replace('.', ":");
    let (mut hour, minute): (u32, u32) = match digits.split_once(':') {
        Some((h, m)) if m.len() == 2 => (
            h.parse().map_err(|_| invalid())?,
            m.parse().map_err(|_| invalid())?,
        ),
        Some(_) => return Err(invalid()),
        None => match digits.len() {
            1 | 2 => (digits.parse().map_err(|_| invalid())?, 0),
            3 | 4 => {
                let (h, m) = digits.split_at(digits.len() - 2);
                (
                    h.parse().map_err(|_| invalid())?,
                    m.parse().map_err(|_| invalid())?,
                )
            }
            _ => return Err(invalid()),
        },
    };

    if let Some(pm) = pm {
        if !(1..=12).contains(&hour) {
            return Err(invalid());
        }
        hour = match (pm, hour) {
            (false, 12) => 0,
            (true, h) if h < 12 => h + 12,
            (_, h) => h,
        };
    }

    let time = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(invalid)?;
    Ok((time, pm.is_some()))
}
