//! Availability slot rules and weekly template expansion
//!
//! All times are UTC.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};

use creatorhub_common::{Error, Result};

pub const MIN_SLOT_MINUTES: i64 = 15;
pub const MAX_SLOT_MINUTES: i64 = 8 * 60;
pub const MAX_TEMPLATE_WEEKS: u32 = 12;

/// Check a single slot: ordered, 15 min to 8 h long, not in the past
pub fn validate_slot(
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<()> {
    if ends_at <= starts_at {
        return Err(Error::InvalidInput("ends_at must be after starts_at".to_string()));
    }
    let minutes = (ends_at - starts_at).num_minutes();
    if minutes < MIN_SLOT_MINUTES || minutes > MAX_SLOT_MINUTES {
        return Err(Error::InvalidInput(format!(
            "Slot length must be between {} and {} minutes",
            MIN_SLOT_MINUTES, MAX_SLOT_MINUTES
        )));
    }
    if starts_at < now {
        return Err(Error::InvalidInput("Slot cannot start in the past".to_string()));
    }
    Ok(())
}

/// Recurring weekly availability
#[derive(Debug, Clone)]
pub struct WeeklyTemplate {
    pub weekday: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_minutes: i64,
    pub weeks: u32,
}

/// Expand a template into concrete slots starting from `today`
///
/// The window `[start_time, end_time)` is cut into back-to-back slots of
/// `slot_minutes`; a trailing remainder shorter than one slot is dropped.
/// Slots that would start before `now` are skipped.
pub fn expand_weekly(
    template: &WeeklyTemplate,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<Vec<(DateTime<Utc>, DateTime<Utc>)>> {
    if template.slot_minutes < MIN_SLOT_MINUTES || template.slot_minutes > MAX_SLOT_MINUTES {
        return Err(Error::InvalidInput(format!(
            "slot_minutes must be between {} and {}",
            MIN_SLOT_MINUTES, MAX_SLOT_MINUTES
        )));
    }
    if template.weeks == 0 || template.weeks > MAX_TEMPLATE_WEEKS {
        return Err(Error::InvalidInput(format!(
            "weeks must be between 1 and {}",
            MAX_TEMPLATE_WEEKS
        )));
    }
    if template.end_time <= template.start_time {
        return Err(Error::InvalidInput("end_time must be after start_time".to_string()));
    }

    let offset = (7 + template.weekday.num_days_from_monday() as i64
        - today.weekday().num_days_from_monday() as i64)
        % 7;
    let first_day = today + Duration::days(offset);
    let step = Duration::minutes(template.slot_minutes);

    let mut slots = Vec::new();
    for week in 0..template.weeks {
        let day = first_day + Duration::weeks(week as i64);
        let window_end = day.and_time(template.end_time).and_utc();
        let mut start = day.and_time(template.start_time).and_utc();
        while start + step <= window_end {
            if start >= now {
                slots.push((start, start + step));
            }
            start += step;
        }
    }
    Ok(slots)
}

/// Parse a weekday name or number (`monday` / `mon` / `1`..`7`, Monday = 1)
pub fn parse_weekday(value: &str) -> Result<Weekday> {
    let value = value.trim();
    if let Ok(n) = value.parse::<u8>() {
        return match n {
            1..=7 => Weekday::try_from(n - 1).map_err(|_| bad_weekday(value)),
            _ => Err(bad_weekday(value)),
        };
    }
    value.parse::<Weekday>().map_err(|_| bad_weekday(value))
}

fn bad_weekday(value: &str) -> Error {
    Error::InvalidInput(format!("Unknown weekday '{}'", value))
}
