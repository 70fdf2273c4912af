use std::collections::HashSet;

use chrono::{DateTime, FixedOffset};
use sha2::{Digest, Sha256};

use crate::text::canonicalize;
use crate::{EventDraft, IdentifiedEvent};

/// Identity of a draft for dedup and hashing: `date|time|title|venue` with
/// the text fields canonicalized and an absent time as the empty string.
fn canonical_key(draft: &EventDraft) -> String {
    let time = draft
        .time
        .map(|time| time.format("%H:%M").to_string())
        .unwrap_or_default();

    format!(
        "{}|{}|{}|{}",
        draft.date.format("%Y-%m-%d"),
        time,
        canonicalize(&draft.title),
        canonicalize(&draft.venue),
    )
}

/// Drops drafts whose canonical key already appeared earlier in the batch
/// (first occurrence wins, so callers control priority through input order)
/// and stamps each survivor with the SHA-256 of its key and the given
/// extraction timestamp.
///
/// Deduplication is a whole-batch operation: collect every draft of a run
/// before calling this, or later duplicates cannot be detected.
#[must_use]
pub fn dedupe_and_hash(
    drafts: Vec<EventDraft>,
    extracted_at: DateTime<FixedOffset>,
) -> Vec<IdentifiedEvent> {
    let mut seen = HashSet::new();
    let mut events = Vec::with_capacity(drafts.len());

    for draft in drafts {
        let key = canonical_key(&draft);
        if !seen.insert(key.clone()) {
            continue;
        }

        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());

        events.push(IdentifiedEvent {
            date: draft.date,
            time: draft.time,
            title: draft.title,
            venue: draft.venue,
            hash: hex::encode(hasher.finalize()),
            extracted_at,
        });
    }

    events
}

/// Stable order for persistence: date, then time with undetermined times
/// after all clock times, then title. Applied as the last step so repeated
/// runs over unchanged sources serialize byte-identically.
pub fn sort_events(events: &mut [IdentifiedEvent]) {
    events.sort_by(|a, b| {
        (a.date, a.time.is_none(), a.time, &a.title).cmp(&(
            b.date,
            b.time.is_none(),
            b.time,
            &b.title,
        ))
    });
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};

    use super::*;

    fn draft(date: (i32, u32, u32), time: Option<(u32, u32)>, title: &str) -> EventDraft {
        EventDraft {
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            time: time.map(|(h, m)| NaiveTime::from_hms_opt(h, m, 0).unwrap()),
            title: title.to_string(),
            venue: "マリンメッセA館".to_string(),
        }
    }

    fn at() -> DateTime<FixedOffset> {
        Utc.with_ymd_and_hms(2025, 8, 13, 0, 0, 0).unwrap().fixed_offset()
    }

    #[test]
    fn punctuation_width_variants_collapse() {
        let drafts = vec![
            draft((2025, 8, 29), Some((10, 30)), "ＬＩＶＥ　２０２５"),
            draft((2025, 8, 29), Some((10, 30)), "LIVE 2025"),
        ];

        let events = dedupe_and_hash(drafts, at());

        assert_eq!(events.len(), 1);
        // First occurrence wins, raw spelling included.
        assert_eq!(events[0].title, "ＬＩＶＥ　２０２５");
    }

    #[test]
    fn distinct_titles_at_one_slot_are_kept() {
        let drafts = vec![
            draft((2025, 8, 29), Some((10, 30)), "午前の部"),
            draft((2025, 8, 29), Some((10, 30)), "別公演"),
        ];

        assert_eq!(dedupe_and_hash(drafts, at()).len(), 2);
    }

    #[test]
    fn timed_and_timeless_drafts_differ() {
        let drafts = vec![
            draft((2025, 8, 29), Some((10, 30)), "公演"),
            draft((2025, 8, 29), None, "公演"),
        ];

        assert_eq!(dedupe_and_hash(drafts, at()).len(), 2);
    }

    #[test]
    fn hashes_are_deterministic() {
        let drafts = || vec![draft((2025, 8, 29), Some((10, 30)), "公演")];

        let first = dedupe_and_hash(drafts(), at());
        let second = dedupe_and_hash(drafts(), at());

        assert_eq!(first[0].hash, second[0].hash);
        assert_eq!(first[0].hash.len(), 64);
    }

    #[test]
    fn rerunning_over_own_output_changes_nothing() {
        let drafts = vec![
            draft((2025, 8, 29), Some((10, 30)), "公演"),
            draft((2025, 8, 29), Some((10, 30)), "公演"),
            draft((2025, 8, 30), None, "展示"),
        ];

        let once = dedupe_and_hash(drafts, at());
        let again = dedupe_and_hash(once.iter().map(IdentifiedEvent::draft).collect(), at());

        assert_eq!(once, again);
    }

    #[test]
    fn undetermined_time_sorts_after_clock_times() {
        let mut events = dedupe_and_hash(
            vec![
                draft((2025, 8, 30), Some((9, 0)), "翌日"),
                draft((2025, 8, 29), None, "時刻未定"),
                draft((2025, 8, 29), Some((18, 0)), "夜公演"),
                draft((2025, 8, 29), Some((10, 0)), "朝公演"),
            ],
            at(),
        );

        sort_events(&mut events);

        let titles: Vec<&str> = events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["朝公演", "夜公演", "時刻未定", "翌日"]);
    }

    #[test]
    fn title_breaks_ties_within_a_slot() {
        let mut events = dedupe_and_hash(
            vec![
                draft((2025, 8, 29), Some((10, 0)), "b公演"),
                draft((2025, 8, 29), Some((10, 0)), "a公演"),
            ],
            at(),
        );

        sort_events(&mut events);

        assert_eq!(events[0].title, "a公演");
        assert_eq!(events[1].title, "b公演");
    }
}
