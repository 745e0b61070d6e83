use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::phrases;

/// Storage format for every recognised date.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// How ambiguous numeric dates such as `03/04` are read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DateOrder {
    #[default]
    MonthFirst,
    DayFirst,
}

/// Heuristic free-text to calendar-date resolution.
///
/// Two-digit years always resolve to `20YY`, and dates written without a year
/// take the reference date's year even when that puts them in the past.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateRecognizer {
    order: DateOrder,
}

impl DateRecognizer {
    pub fn new(order: DateOrder) -> Self {
        Self { order }
    }

    pub fn recognize(&self, text: &str, reference: NaiveDate) -> Option<NaiveDate> {
        let normalized = text.trim().to_lowercase();
        if normalized.is_empty() {
            return None;
        }

        if let Some(date) = keyword_date(&normalized, reference) {
            return Some(date);
        }

        if let Some(rest) = normalized.strip_prefix("next ") {
            if let Some(weekday) = rest.split_whitespace().next().and_then(parse_weekday) {
                return Some(next_weekday_after(reference, weekday));
            }
        }

        phrases::detect(&normalized, reference, self.order)
    }

    /// Recognises `text` and renders the result as `YYYY-MM-DD`.
    pub fn recognize_formatted(&self, text: &str, reference: NaiveDate) -> Option<String> {
        self.recognize(text, reference).map(format_date)
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// True when `value` is a complete `YYYY-MM-DD` calendar date.
pub fn is_iso_date(value: &str) -> bool {
    value.len() == 10 && NaiveDate::parse_from_str(value, DATE_FORMAT).is_ok()
}

pub(crate) fn keyword_date(word: &str, reference: NaiveDate) -> Option<NaiveDate> {
    match word {
        "today" | "tod" => Some(reference),
        "tomorrow" | "tom" | "tmr" => Some(reference + Duration::days(1)),
        "yesterday" => Some(reference - Duration::days(1)),
        _ => None,
    }
}

pub(crate) fn parse_weekday(word: &str) -> Option<Weekday> {
    match word {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" | "tues" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" | "thur" | "thurs" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Next occurrence strictly after `reference`; a matching weekday yields +7 days.
pub(crate) fn next_weekday_after(reference: NaiveDate, weekday: Weekday) -> NaiveDate {
    let ahead = days_until(reference, weekday);
    reference + Duration::days(if ahead == 0 { 7 } else { ahead })
}

/// Next occurrence on or after `reference`.
pub(crate) fn upcoming_weekday(reference: NaiveDate, weekday: Weekday) -> NaiveDate {
    reference + Duration::days(days_until(reference, weekday))
}

fn days_until(reference: NaiveDate, weekday: Weekday) -> i64 {
    let from = reference.weekday().num_days_from_monday() as i64;
    let to = weekday.num_days_from_monday() as i64;
    (to - from).rem_euclid(7)
}
