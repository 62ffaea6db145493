use super::token::MONTH;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use regex::Regex;
use std::sync::OnceLock;

struct Patterns {
    mdy: Regex,
    hms: Regex,
}

fn patterns() -> Option<&'static Patterns> {
    static PATTERNS: OnceLock<Option<Patterns>> = OnceLock::new();

    PATTERNS
        .get_or_init(|| {
            Some(Patterns {
                mdy: Regex::new(&format!(
                    r"(?i)^({MONTH}|\d\d|\d)[-/](\d\d|\d)(?:[-/](\d\d\d\d|\d\d))?(?:[|.](.+))?$"
                ))
                .ok()?,
                hms: Regex::new(r"(?i)^(\d\d|\d)(?::(\d\d)(?::(\d\d))?)?(am|pm)?$").ok()?,
            })
        })
        .as_ref()
}

/// Reads a date/time literal such as `3/15`, `mar-15-05|4pm` or `10:30`.
///
/// A date without a year falls in the year that puts it closest to `now`.
/// A time without a date falls on the day of `now`.
pub(crate) fn parse(text: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let patterns = patterns()?;

    if let Some(caps) = patterns.mdy.captures(text) {
        let month = month_number(&caps[1])?;
        let day: u32 = caps[2].parse().ok()?;

        let time = match caps.get(4) {
            Some(time) => parse_time(patterns, time.as_str())?,
            None => NaiveTime::MIN,
        };

        let date = match caps.get(3) {
            Some(year) => {
                let digits = year.as_str();
                let mut year: i32 = digits.parse().ok()?;
                if digits.len() == 2 {
                    year += if year >= 69 { 1900 } else { 2000 };
                }
                NaiveDate::from_ymd_opt(year, month, day)?
            }
            None => closest_year(month, day, now)?,
        };

        return Some(date.and_time(time));
    }

    let time = parse_time(patterns, text)?;
    Some(now.date().and_time(time))
}

/// Seconds since the epoch of a date/time literal, read as local time.
pub(crate) fn to_epoch(text: &str, now: NaiveDateTime) -> Option<i64> {
    let local = parse(text, now)?;
    Local
        .from_local_datetime(&local)
        .earliest()
        .map(|time| time.timestamp())
}

fn parse_time(patterns: &Patterns, text: &str) -> Option<NaiveTime> {
    let caps = patterns.hms.captures(text)?;

    let mut hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps.get(2).map_or(Some(0), |m| m.as_str().parse().ok())?;
    let second: u32 = caps.get(3).map_or(Some(0), |m| m.as_str().parse().ok())?;

    match caps.get(4).map(|m| m.as_str().to_lowercase()).as_deref() {
        Some("pm") if hour < 12 => hour += 12,
        Some("am") if hour == 12 => hour = 0,
        _ => {}
    }

    NaiveTime::from_hms_opt(hour, minute, second)
}

fn month_number(text: &str) -> Option<u32> {
    if let Ok(month) = text.parse() {
        return Some(month);
    }

    const NAMES: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];

    let prefix = text.get(..3)?.to_lowercase();
    NAMES
        .iter()
        .position(|name| *name == prefix)
        .map(|index| index as u32 + 1)
}

fn closest_year(month: u32, day: u32, now: NaiveDateTime) -> Option<NaiveDate> {
    let today = now.date();
    let year = chrono::Datelike::year(&today);

    [year - 1, year, year + 1]
        .into_iter()
        .filter_map(|year| NaiveDate::from_ymd_opt(year, month, day))
        .min_by_key(|date| (*date - today).num_days().abs())
}
