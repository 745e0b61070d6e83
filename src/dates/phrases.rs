//! Fallback detection of date phrases inside free text.
//!
//! Every matcher reports the byte offset of its first valid match; the
//! earliest span in the text wins, mirroring how a data detector returns the
//! first date it finds.

use std::sync::OnceLock;

use chrono::{Datelike, Duration, Months, NaiveDate};
use regex::{Captures, Regex};

use super::recognizer::{keyword_date, next_weekday_after, parse_weekday, upcoming_weekday};
use super::DateOrder;

const MONTH: &str = r"(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)";
const WEEKDAY: &str = r"(monday|tuesday|wednesday|thursday|friday|saturday|sunday|mon|tues|tue|wed|thurs|thur|thu|fri|sat|sun)";
const COUNT: &str = r"(\d{1,3}|a|an|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve)";

struct Patterns {
    iso: Regex,
    slashed: Regex,
    dotted: Regex,
    month_day: Regex,
    day_month: Regex,
    relative_in: Regex,
    relative_from_now: Regex,
    next_unit: Regex,
    keyword: Regex,
    weekday: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let compile = |pattern: &str| {
            Regex::new(pattern).unwrap_or_else(|err| panic!("invalid date pattern {pattern}: {err}"))
        };
        Patterns {
            iso: compile(r"\b(\d{4})[-/](\d{1,2})[-/](\d{1,2})\b"),
            slashed: compile(r"\b(\d{1,2})/(\d{1,2})(?:/(\d{4}|\d{2}))?\b"),
            dotted: compile(r"\b(\d{1,2})[.-](\d{1,2})[.-](\d{4}|\d{2})\b"),
            month_day: compile(&format!(
                r"\b{MONTH}\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?(?:,?\s+(\d{{4}}))?\b"
            )),
            day_month: compile(&format!(
                r"\b(\d{{1,2}})(?:st|nd|rd|th)?\s+(?:of\s+)?{MONTH}\.?(?:,?\s+(\d{{4}}))?\b"
            )),
            relative_in: compile(&format!(r"\bin\s+{COUNT}\s+(day|week|month)s?\b")),
            relative_from_now: compile(&format!(
                r"\b{COUNT}\s+(day|week|month)s?\s+from\s+(?:now|today)\b"
            )),
            next_unit: compile(r"\bnext\s+(week|month)\b"),
            keyword: compile(r"\b(today|tonight|tomorrow|tmr|yesterday)\b"),
            weekday: compile(&format!(r"\b(next\s+)?{WEEKDAY}\b")),
        }
    })
}

/// Returns the start of the first date span found in `text` (already lowercased).
pub(crate) fn detect(text: &str, reference: NaiveDate, order: DateOrder) -> Option<NaiveDate> {
    let patterns = patterns();
    let candidates = [
        first_match(&patterns.iso, text, |caps| {
            ymd(number(caps, 1)?, number(caps, 2)?, number(caps, 3)?)
        }),
        first_match(&patterns.slashed, text, |caps| {
            numeric_date(caps, order, reference)
        }),
        first_match(&patterns.dotted, text, |caps| {
            numeric_date(caps, order, reference)
        }),
        first_match(&patterns.month_day, text, |caps| {
            let month = month_number(caps.get(1)?.as_str())?;
            let year = year_or_reference(caps.get(3).map(|m| m.as_str()), reference)?;
            ymd(year, month, number(caps, 2)?)
        }),
        first_match(&patterns.day_month, text, |caps| {
            let month = month_number(caps.get(2)?.as_str())?;
            let year = year_or_reference(caps.get(3).map(|m| m.as_str()), reference)?;
            ymd(year, month, number(caps, 1)?)
        }),
        first_match(&patterns.relative_in, text, |caps| {
            shift(reference, count(caps.get(1)?.as_str())?, caps.get(2)?.as_str())
        }),
        first_match(&patterns.relative_from_now, text, |caps| {
            shift(reference, count(caps.get(1)?.as_str())?, caps.get(2)?.as_str())
        }),
        first_match(&patterns.next_unit, text, |caps| {
            shift(reference, 1, caps.get(1)?.as_str())
        }),
        first_match(&patterns.keyword, text, |caps| match caps.get(1)?.as_str() {
            "tonight" => Some(reference),
            word => keyword_date(word, reference),
        }),
        first_match(&patterns.weekday, text, |caps| {
            let weekday = parse_weekday(caps.get(2)?.as_str())?;
            Some(if caps.get(1).is_some() {
                next_weekday_after(reference, weekday)
            } else {
                upcoming_weekday(reference, weekday)
            })
        }),
    ];

    candidates
        .into_iter()
        .flatten()
        .min_by_key(|(start, _)| *start)
        .map(|(_, date)| date)
}

fn first_match<F>(regex: &Regex, text: &str, resolve: F) -> Option<(usize, NaiveDate)>
where
    F: Fn(&Captures<'_>) -> Option<NaiveDate>,
{
    regex.captures_iter(text).find_map(|caps| {
        let start = caps.get(0)?.start();
        resolve(&caps).map(|date| (start, date))
    })
}

fn numeric_date(caps: &Captures<'_>, order: DateOrder, reference: NaiveDate) -> Option<NaiveDate> {
    let first: u32 = number(caps, 1)?;
    let second: u32 = number(caps, 2)?;
    let year = year_or_reference(caps.get(3).map(|m| m.as_str()), reference)?;
    let (month, day) = match order {
        DateOrder::MonthFirst => (first, second),
        DateOrder::DayFirst => (second, first),
    };
    ymd(year, month, day)
}

fn number<T: std::str::FromStr>(caps: &Captures<'_>, index: usize) -> Option<T> {
    caps.get(index)?.as_str().parse().ok()
}

fn ymd(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

fn year_or_reference(raw: Option<&str>, reference: NaiveDate) -> Option<i32> {
    match raw {
        None => Some(reference.year()),
        Some(digits) if digits.len() == 2 => digits.parse::<i32>().ok().map(|yy| 2000 + yy),
        Some(digits) => digits.parse().ok(),
    }
}

fn month_number(name: &str) -> Option<u32> {
    let month = match name.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn count(word: &str) -> Option<u32> {
    let value = match word {
        "a" | "an" | "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        digits => return digits.parse().ok(),
    };
    Some(value)
}

fn shift(reference: NaiveDate, amount: u32, unit: &str) -> Option<NaiveDate> {
    match unit {
        "day" => reference.checked_add_signed(Duration::days(amount as i64)),
        "week" => reference.checked_add_signed(Duration::weeks(amount as i64)),
        "month" => reference.checked_add_months(Months::new(amount)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Friday.
    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).expect("valid date")
    }

    fn detect_us(text: &str) -> Option<String> {
        detect(text, reference(), DateOrder::MonthFirst).map(|d| d.to_string())
    }

    #[test]
    fn iso_and_numeric_forms() {
        assert_eq!(detect_us("due 2026-11-02").as_deref(), Some("2026-11-02"));
        assert_eq!(detect_us("ship on 11/2").as_deref(), Some("2026-11-02"));
        assert_eq!(detect_us("11/2/27").as_deref(), Some("2027-11-02"));
        assert_eq!(
            detect("2.11.2027", reference(), DateOrder::DayFirst).map(|d| d.to_string()),
            Some("2027-11-02".to_string())
        );
        assert_eq!(
            detect("2/11", reference(), DateOrder::DayFirst).map(|d| d.to_string()),
            Some("2026-11-02".to_string())
        );
    }

    #[test]
    fn month_names_in_either_position() {
        assert_eq!(detect_us("october 20th").as_deref(), Some("2026-10-20"));
        assert_eq!(detect_us("dec. 1, 2027").as_deref(), Some("2027-12-01"));
        assert_eq!(detect_us("the 3rd of march").as_deref(), Some("2026-03-03"));
        assert_eq!(detect_us("4 jul 2030").as_deref(), Some("2030-07-04"));
    }

    #[test]
    fn bare_month_day_keeps_reference_year() {
        // Already past in 2026 but no rollover is applied.
        assert_eq!(detect_us("jan 5").as_deref(), Some("2026-01-05"));
    }

    #[test]
    fn relative_phrases() {
        assert_eq!(detect_us("in 3 days").as_deref(), Some("2026-10-19"));
        assert_eq!(detect_us("in two weeks").as_deref(), Some("2026-10-30"));
        assert_eq!(detect_us("in a month").as_deref(), Some("2026-11-16"));
        assert_eq!(detect_us("5 days from now").as_deref(), Some("2026-10-21"));
        assert_eq!(detect_us("sometime next week").as_deref(), Some("2026-10-23"));
    }

    #[test]
    fn weekday_words_inside_text() {
        assert_eq!(detect_us("call bob on friday").as_deref(), Some("2026-10-16"));
        assert_eq!(detect_us("review next friday").as_deref(), Some("2026-10-23"));
        assert_eq!(detect_us("lunch tomorrow at noon").as_deref(), Some("2026-10-17"));
    }

    #[test]
    fn earliest_span_wins() {
        assert_eq!(detect_us("tomorrow or 2026-12-01").as_deref(), Some("2026-10-17"));
        assert_eq!(detect_us("2026-12-01 or tomorrow").as_deref(), Some("2026-12-01"));
    }

    #[test]
    fn invalid_calendar_dates_are_ignored() {
        assert_eq!(detect_us("13/45"), None);
        assert_eq!(detect_us("feb 30"), None);
        assert_eq!(detect_us("version 3.5"), None);
    }
}
