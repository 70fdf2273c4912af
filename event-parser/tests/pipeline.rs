use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};

use event_parser::{dedupe_and_hash, parse_schedule, sort_events, EventDraft, IdentifiedEvent};

struct Fragment {
    datetime_text: &'static str,
    title: &'static str,
    venue: &'static str,
}

const FRAGMENTS: &[Fragment] = &[
    Fragment {
        datetime_text: "8.13(水)～8.31(日) 10:00～18:00",
        title: "夏の大恐竜展",
        venue: "マリンメッセA館",
    },
    Fragment {
        datetime_text: "8.29(金) 10:30～ 14:00～",
        title: "ディズニー・オン・アイス",
        venue: "マリンメッセA館",
    },
    // Same listing again with width/punctuation drift, as scraped from a
    // second page of the same site.
    Fragment {
        datetime_text: "8.29(金)　10:30～",
        title: "ディズニー・オン・アイス",
        venue: "マリンメッセA館",
    },
    Fragment {
        datetime_text: "9.3(水)～7(日)",
        title: "国際ギフト・ショー",
        venue: "福岡国際センター",
    },
    Fragment {
        datetime_text: "未定",
        title: "調整中の催事",
        venue: "福岡国際センター",
    },
];

fn extracted_at() -> DateTime<FixedOffset> {
    Utc.with_ymd_and_hms(2025, 8, 1, 3, 0, 0)
        .unwrap()
        .fixed_offset()
}

fn run(fragments: &[&Fragment]) -> Vec<IdentifiedEvent> {
    let mut drafts: Vec<EventDraft> = Vec::new();
    for fragment in fragments {
        drafts.extend(
            parse_schedule(fragment.datetime_text, 2025)
                .materialize(fragment.title, fragment.venue),
        );
    }

    let mut events = dedupe_and_hash(drafts, extracted_at());
    sort_events(&mut events);
    events
}

#[test]
fn batch_covers_all_fragments() {
    let events = run(&FRAGMENTS.iter().collect::<Vec<_>>());

    // 19 range days + 2 showtime slots (the drifted repeat of the 10:30
    // slot collapses) + 5 span days; the undated fragment contributes none.
    assert_eq!(events.len(), 19 + 2 + 5);

    let first = &events[0];
    assert_eq!(first.date, NaiveDate::from_ymd_opt(2025, 8, 13).unwrap());
    assert_eq!(first.title, "夏の大恐竜展");
}

#[test]
fn pipeline_is_deterministic_under_reordering() {
    let forward: Vec<&Fragment> = FRAGMENTS.iter().collect();
    let reversed: Vec<&Fragment> = FRAGMENTS.iter().rev().collect();

    let a = run(&forward);
    let b = run(&reversed);

    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(&b) {
        assert_eq!(x.date, y.date);
        assert_eq!(x.time, y.time);
        assert_eq!(x.hash, y.hash);
    }
}

#[test]
fn rerun_reproduces_hashes() {
    let fragments: Vec<&Fragment> = FRAGMENTS.iter().collect();
    let events = run(&fragments);

    let again = dedupe_and_hash(
        events.iter().map(IdentifiedEvent::draft).collect(),
        extracted_at(),
    );

    assert_eq!(events.len(), again.len());
    for (x, y) in events.iter().zip(&again) {
        assert_eq!(x.hash, y.hash);
    }
}
