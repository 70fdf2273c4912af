use std::collections::HashSet;
use std::env;
use std::io::ErrorKind;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::{info, warn};
use reqwest::Client;
use serde_json::json;

use crate::jst;
use crate::storage::{self, StoredEvent};
use crate::venues::{Venue, VENUES};

const LINE_NOTIFY_URL: &str = "https://notify-api.line.me/api/notify";

/// The day's merged schedule plus the venues whose files could not be read.
pub struct DayDigest {
    pub events: Vec<StoredEvent>,
    pub missing: Vec<&'static Venue>,
}

/// Merges the per-venue files of one day: same-hash repeats across venues
/// are dropped, and the result is ordered by time (undetermined last),
/// title, then registry order of the venue.
pub fn load_day(dir: &std::path::Path, today: NaiveDate) -> DayDigest {
    let mut events: Vec<StoredEvent> = Vec::new();
    let mut missing = Vec::new();

    for venue in VENUES {
        match storage::read_day(dir, today, venue.code) {
            Ok(batch) => {
                events.extend(batch.into_iter().filter(|ev| ev.event.date == today));
            }
            Err(err) => {
                match err.downcast_ref::<std::io::Error>() {
                    Some(io) if io.kind() == ErrorKind::NotFound => {}
                    _ => warn!("[dispatch] read fail code={} msg=\"{err:#}\"", venue.code),
                }
                missing.push(venue);
            }
        }
    }

    let mut seen = HashSet::new();
    events.retain(|ev| seen.insert(ev.event.hash.clone()));

    events.sort_by(|a, b| {
        (
            a.event.time.is_none(),
            a.event.time,
            &a.event.title,
            venue_rank(&a.event.venue),
        )
            .cmp(&(
                b.event.time.is_none(),
                b.event.time,
                &b.event.title,
                venue_rank(&b.event.venue),
            ))
    });

    DayDigest { events, missing }
}

fn venue_rank(name: &str) -> usize {
    VENUES
        .iter()
        .position(|venue| venue.name == name)
        .unwrap_or(usize::MAX)
}

/// Mobile-first notification body: two lines per event separated by blank
/// lines, venue first so the reader can skim by place.
pub fn build_message(
    today: NaiveDate,
    digest: &DayDigest,
    pages_url: Option<&str>,
) -> String {
    let mut lines = vec![format!("【本日のイベント】{today}"), String::new()];

    if digest.events.is_empty() {
        lines.push("本日の掲載イベントは見つかりませんでした。".to_string());
    } else {
        for (idx, ev) in digest.events.iter().enumerate() {
            let time = ev
                .event
                .time
                .map(|time| time.format("%H:%M").to_string())
                .unwrap_or_else(|| "（時刻未定）".to_string());

            lines.push(format!("- {time}｜{}", ev.event.venue));
            lines.push(ev.event.title.clone());

            if idx + 1 < digest.events.len() {
                lines.push(String::new());
            }
        }
    }

    if !digest.missing.is_empty() {
        let names: Vec<&str> = digest.missing.iter().map(|venue| venue.name).collect();
        lines.push(String::new());
        lines.push(format!("取得できなかった会場: {}", names.join(", ")));
    }

    if let Some(url) = pages_url {
        lines.push(String::new());
        lines.push("詳細はこちら👇".to_string());
        lines.push(url.to_string());
    }

    lines.join("\n")
}

async fn send_to_slack(client: &Client, webhook_url: &str, body: &str) -> Result<()> {
    let response = client
        .post(webhook_url)
        .json(&json!({ "text": body }))
        .send()
        .await
        .context("Slack request failed")?;

    info!("[dispatch] slack status={}", response.status());
    response.error_for_status().context("Slack rejected the message")?;
    Ok(())
}

async fn send_to_line(client: &Client, token: &str, body: &str) -> Result<()> {
    let response = client
        .post(LINE_NOTIFY_URL)
        .bearer_auth(token)
        .form(&[("message", body)])
        .send()
        .await
        .context("LINE request failed")?;

    info!("[dispatch] line status={}", response.status());
    response.error_for_status().context("LINE rejected the message")?;
    Ok(())
}

/// The `dispatch` command: load the day's files, render the digest, push
/// it to the configured webhooks.
pub async fn run(date: Option<NaiveDate>, dry_run: bool) -> Result<()> {
    let today = date.unwrap_or_else(jst::today);
    let dir = storage::storage_dir();

    let digest = load_day(&dir, today);
    info!(
        "[dispatch] gathered items={} missing={:?}",
        digest.events.len(),
        digest.missing.iter().map(|venue| venue.code).collect::<Vec<_>>(),
    );

    let pages_url = env::var("EVENT_NOTIFY_PAGES_URL").ok();
    let body = build_message(today, &digest, pages_url.as_deref());
    info!("[dispatch] preview:\n{body}");

    if dry_run || env::var("DRY_RUN").as_deref() == Ok("1") {
        info!("[dispatch] dry run, not sending");
        return Ok(());
    }

    let client = crate::fetch::client()?;
    let mut sent = false;

    match env::var("SLACK_WEBHOOK_URL") {
        Ok(url) if !url.is_empty() => match send_to_slack(&client, &url, &body).await {
            Ok(()) => sent = true,
            Err(err) => warn!("[dispatch] slack error: {err:#}"),
        },
        _ => warn!("[dispatch] SLACK_WEBHOOK_URL not set, skipping Slack"),
    }

    if let Ok(token) = env::var("LINE_NOTIFY_TOKEN") {
        if !token.is_empty() {
            match send_to_line(&client, &token, &body).await {
                Ok(()) => sent = true,
                Err(err) => warn!("[dispatch] line error: {err:#}"),
            }
        }
    }

    if sent {
        storage::write_last_sent(&dir, &body)?;
    }

    info!("[dispatch] sent={sent} venues={}", VENUES.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveTime, TimeZone, Utc};
    use event_parser::IdentifiedEvent;

    use super::*;
    use crate::storage::SCHEMA_VERSION;

    fn stored(time: Option<(u32, u32)>, title: &str, venue: &str) -> StoredEvent {
        StoredEvent {
            schema_version: SCHEMA_VERSION.to_string(),
            event: IdentifiedEvent {
                date: NaiveDate::from_ymd_opt(2025, 8, 29).unwrap(),
                time: time.map(|(h, m)| NaiveTime::from_hms_opt(h, m, 0).unwrap()),
                title: title.to_string(),
                venue: venue.to_string(),
                hash: format!("{title}-{venue}"),
                extracted_at: Utc
                    .with_ymd_and_hms(2025, 8, 29, 0, 0, 0)
                    .unwrap()
                    .fixed_offset(),
            },
            source: String::new(),
        }
    }

    fn day(events: Vec<StoredEvent>, missing: Vec<&'static Venue>) -> DayDigest {
        DayDigest { events, missing }
    }

    #[test]
    fn message_lists_each_event_on_two_lines() {
        let digest = day(
            vec![
                stored(Some((10, 30)), "ディズニー・オン・アイス", "マリンメッセA館"),
                stored(None, "国際ギフト・ショー", "福岡国際センター"),
            ],
            Vec::new(),
        );

        let body = build_message(NaiveDate::from_ymd_opt(2025, 8, 29).unwrap(), &digest, None);

        let expected = "【本日のイベント】2025-08-29\n\
                        \n\
                        - 10:30｜マリンメッセA館\n\
                        ディズニー・オン・アイス\n\
                        \n\
                        - （時刻未定）｜福岡国際センター\n\
                        国際ギフト・ショー";
        assert_eq!(body, expected);
    }

    #[test]
    fn empty_day_message_says_so() {
        let body = build_message(
            NaiveDate::from_ymd_opt(2025, 8, 29).unwrap(),
            &day(Vec::new(), Vec::new()),
            None,
        );

        assert!(body.contains("本日の掲載イベントは見つかりませんでした。"));
    }

    #[test]
    fn missing_venues_and_pages_url_are_appended() {
        let digest = day(Vec::new(), vec![&VENUES[0], &VENUES[4]]);

        let body = build_message(
            NaiveDate::from_ymd_opt(2025, 8, 29).unwrap(),
            &digest,
            Some("https://example.com/events/"),
        );

        assert!(body.contains("取得できなかった会場: マリンメッセA館, 福岡サンパレス"));
        assert!(body.ends_with("詳細はこちら👇\nhttps://example.com/events/"));
    }
}
