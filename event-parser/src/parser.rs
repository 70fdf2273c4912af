use chrono::{Datelike, NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::{Schedule, Slot};

macro_rules! regex {
    ($pattern:expr) => {{
        static RE: Lazy<Regex> = Lazy::new(|| Regex::new($pattern).unwrap());
        &RE
    }};
}

// Single date, e.g. `8.29(金)` / `8.29` / `8/29`.
const DATE: &str = r"(?P<m>\d{1,2})[./](?P<d>\d{1,2})(?:\([^)]*\))?";

// The same shape as `DATE`, anchored to a whole whitespace token.
const DATE_TOKEN: &str = r"^(?P<m>\d{1,2})[./](?P<d>\d{1,2})(?:\([^)]*\))?$";

// Date range, e.g. `8.13(水)～8.31(日)` / `8/13-8/31` / `9.3(水)～7(日)`.
// The end month is optional and inherits the start month when omitted.
const RANGE: &str = r"(?P<m1>\d{1,2})[./](?P<d1>\d{1,2})(?:\([^)]*\))?\s*[～\-]\s*(?:(?P<m2>\d{1,2})[./])?(?P<d2>\d{1,2})(?:\([^)]*\))?";

// Clock time anywhere in a token, tolerant of trailing glyphs (`10:00～`).
const TIME: &str = r"(?P<h>\d{1,2}):(?P<mi>\d{2})";

/// Recognizes the date/time expression in one scraped field.
///
/// The text is truncated at the first `|`, which separates hall remarks from
/// the date portion on several venue pages, and wave-dash/dash variants are
/// unified before matching. Two grammars are tried in order:
///
/// 1. a range (`8.13(水)～8.31(日) 10:00～18:00`), expanded day by day with
///    the first clock time in the text as the shared start time;
/// 2. whitespace tokens scanned left to right (`8.29(金) 10:30～ 14:00～`),
///    where each date token opens a day and each following time token emits
///    one slot for it. If that produces nothing, every date in the text
///    yields one time-less slot.
///
/// All parse ambiguity degrades to omission: invalid calendar dates and
/// out-of-range clock times are dropped, an inverted range expands to zero
/// days, and text without any date yields [`Schedule::Empty`]. The year is
/// always the caller's `year`; ranges are assumed not to cross a year
/// boundary.
#[must_use]
pub fn parse_schedule(datetime_text: &str, year: i32) -> Schedule {
    let left = match datetime_text.split_once('|') {
        Some((left, _remark)) => left,
        None => datetime_text,
    };
    let left = left.trim().replace(['〜', '~'], "～");
    let left = left.replace(['－', '–', '—', '―'], "-");

    if let Some(caps) = regex!(RANGE).captures(&left) {
        return span_schedule(&caps, &left, year);
    }

    let mut slots = Vec::new();
    let mut current: Option<NaiveDate> = None;

    for token in left.split_whitespace() {
        if let Some(caps) = regex!(DATE_TOKEN).captures(token) {
            current = month_day(&caps, "m", "d", year);
            continue;
        }
        if let Some(date) = current {
            if let Some(time) = first_time(token) {
                slots.push(Slot {
                    date,
                    time: Some(time),
                });
            }
        }
    }

    // No recognizable time at all: fall back to one time-less slot per date.
    if slots.is_empty() {
        for caps in regex!(DATE).captures_iter(&left) {
            if let Some(date) = month_day(&caps, "m", "d", year) {
                slots.push(Slot { date, time: None });
            }
        }
    }

    if slots.is_empty() {
        Schedule::Empty
    } else {
        Schedule::Slots(slots)
    }
}

fn span_schedule(caps: &Captures, text: &str, year: i32) -> Schedule {
    let days = (|| {
        let first = month_day(caps, "m1", "d1", year)?;
        // An omitted end month inherits the start month.
        let end_month = match caps.name("m2") {
            Some(month) => month.as_str().parse().ok()?,
            None => first.month(),
        };
        let end_day = caps.name("d2")?.as_str().parse().ok()?;
        let last = NaiveDate::from_ymd_opt(year, end_month, end_day)?;
        Some(expand_days(first, last))
    })()
    .unwrap_or_default();

    Schedule::Span {
        days,
        start: first_time(text),
    }
}

/// Every day from `start` to `end` inclusive; empty when inverted.
fn expand_days(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut cursor = start;
    while cursor <= end {
        days.push(cursor);
        match cursor.succ_opt() {
            Some(next) => cursor = next,
            None => break,
        }
    }
    days
}

fn month_day(caps: &Captures, month: &str, day: &str, year: i32) -> Option<NaiveDate> {
    let month = caps.name(month)?.as_str().parse().ok()?;
    let day = caps.name(day)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// First in-range `HH:MM` in `text`; malformed tokens (hour ≥ 24, minute ≥
/// 60) fail the pattern and are skipped.
fn first_time(text: &str) -> Option<NaiveTime> {
    regex!(TIME).captures_iter(text).find_map(|caps| {
        let hour = caps.name("h")?.as_str().parse().ok()?;
        let minute = caps.name("mi")?.as_str().parse().ok()?;
        NaiveTime::from_hms_opt(hour, minute, 0)
    })
}
