use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use event_parser::IdentifiedEvent;

pub const SCHEMA_VERSION: &str = "1.0";

/// One persisted event record: the identified event plus the fields this
/// layer appends (schema version and source URL).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub schema_version: String,
    #[serde(flatten)]
    pub event: IdentifiedEvent,
    pub source: String,
}

/// Storage root, `./storage` unless `EVENT_NOTIFY_STORAGE` overrides it.
pub fn storage_dir() -> PathBuf {
    env::var_os("EVENT_NOTIFY_STORAGE")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("storage"))
}

pub fn day_path(dir: &Path, date: NaiveDate, code: &str) -> PathBuf {
    dir.join(format!("{date}_{code}.json"))
}

/// Writes one venue's batch for one day. Empty batches are written too, so
/// a day with no events is distinguishable from a failed scrape.
pub fn write_day(dir: &Path, date: NaiveDate, code: &str, events: &[StoredEvent]) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create storage dir {}", dir.display()))?;

    let path = day_path(dir, date, code);
    let json = serde_json::to_vec_pretty(events).context("failed to serialize events")?;
    fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;

    Ok(path)
}

pub fn read_day(dir: &Path, date: NaiveDate, code: &str) -> Result<Vec<StoredEvent>> {
    let path = day_path(dir, date, code);
    let bytes =
        fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;

    serde_json::from_slice(&bytes).with_context(|| format!("failed to parse {}", path.display()))
}

/// Remembers the digest of the last dispatched message body.
pub fn write_last_sent(dir: &Path, body: &str) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create storage dir {}", dir.display()))?;

    let path = dir.join("last_sent.txt");
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());

    fs::write(&path, hex::encode(hasher.finalize()))
        .with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveTime, TimeZone, Utc};

    use super::*;

    fn sample() -> StoredEvent {
        StoredEvent {
            schema_version: SCHEMA_VERSION.to_string(),
            event: IdentifiedEvent {
                date: NaiveDate::from_ymd_opt(2025, 8, 29).unwrap(),
                time: NaiveTime::from_hms_opt(10, 30, 0),
                title: "ディズニー・オン・アイス".to_string(),
                venue: "マリンメッセA館".to_string(),
                hash: "deadbeef".to_string(),
                extracted_at: Utc
                    .with_ymd_and_hms(2025, 8, 29, 0, 15, 0)
                    .unwrap()
                    .fixed_offset(),
            },
            source: "https://www.marinemesse.or.jp/messe/event/".to_string(),
        }
    }

    #[test]
    fn day_path_is_date_underscore_code() {
        let path = day_path(Path::new("storage"), NaiveDate::from_ymd_opt(2025, 8, 29).unwrap(), "a");
        assert_eq!(path, Path::new("storage/2025-08-29_a.json"));
    }

    #[test]
    fn stored_events_round_trip() {
        let event = sample();
        let json = serde_json::to_string(&event).unwrap();

        assert!(json.contains("\"time\":\"10:30\""));
        assert!(json.contains("\"date\":\"2025-08-29\""));

        let back: StoredEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn undetermined_time_serializes_as_null() {
        let mut event = sample();
        event.event.time = None;

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"time\":null"));

        let back: StoredEvent = serde_json::from_str(&json).unwrap();
        assert!(back.event.time.is_none());
    }
}
