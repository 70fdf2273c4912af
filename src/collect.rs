use std::time::Instant;

use anyhow::Result;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate};
use log::{info, warn};
use reqwest::Client;

use event_parser::{dedupe_and_hash, parse_schedule, sort_events, EventDraft};

use crate::fetch;
use crate::jst;
use crate::storage::{self, StoredEvent, SCHEMA_VERSION};
use crate::venues::{extract_rows, Venue, VENUES};

/// Scrapes one venue and runs the full normalization pipeline over it:
/// every raw row is parsed and expanded into drafts, the drafts of the
/// whole page are deduplicated in one batch, and the result is sorted for
/// stable output.
pub async fn collect_venue(
    client: &Client,
    venue: &Venue,
    target: NaiveDate,
    include_future: bool,
    extracted_at: DateTime<FixedOffset>,
) -> Result<Vec<StoredEvent>> {
    let html = fetch::fetch_html(client, venue.url).await?;
    let rows = extract_rows(venue.layout, &html);

    let mut drafts: Vec<EventDraft> = Vec::new();
    for row in &rows {
        drafts.extend(
            parse_schedule(&row.datetime_text, target.year()).materialize(&row.title, venue.name),
        );
    }

    if !include_future {
        drafts.retain(|draft| draft.date == target);
    }

    let mut events = dedupe_and_hash(drafts, extracted_at);
    sort_events(&mut events);

    Ok(events
        .into_iter()
        .map(|event| StoredEvent {
            schema_version: SCHEMA_VERSION.to_string(),
            event,
            source: venue.url.to_string(),
        })
        .collect())
}

/// The `scrape` command: every venue in the registry, one storage file
/// each. A venue failing is logged and skipped so the others still land.
pub async fn run(date: Option<NaiveDate>, include_future: bool) -> Result<()> {
    let target = date.unwrap_or_else(jst::today);
    let extracted_at = jst::now();
    let dir = storage::storage_dir();
    let client = fetch::client()?;

    for venue in VENUES {
        let started = Instant::now();

        let events = match collect_venue(&client, venue, target, include_future, extracted_at).await
        {
            Ok(events) => events,
            Err(err) => {
                warn!("[{}] scrape failed: {err:#}", venue.code);
                continue;
            }
        };

        let path = storage::write_day(&dir, target, venue.code, &events)?;

        info!(
            "[{}] date={} items={} ms={} url=\"{}\" -> {}",
            venue.code,
            target,
            events.len(),
            started.elapsed().as_millis(),
            venue.url,
            path.display(),
        );
    }

    Ok(())
}
