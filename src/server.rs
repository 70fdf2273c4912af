use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use log::{info, warn};
use quick_cache::sync::Cache;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::time::Duration;

use event_parser::events_to_ics;

use crate::collect;
use crate::fetch;
use crate::jst;
use crate::storage::StoredEvent;
use crate::venues::VENUES;

struct AppState {
    client: reqwest::Client,
    cache: Cache<NaiveDate, (Instant, Arc<Vec<StoredEvent>>)>,
    cache_enabled: bool,
    cache_ttl: Duration,
}

#[derive(Deserialize)]
struct ScheduleQuery {
    date: Option<NaiveDate>,
    #[serde(default)]
    json: bool,
}

pub async fn run(address: SocketAddr, enable_cache: bool, cache_ttl: Duration) -> Result<()> {
    let state = Arc::new(AppState {
        client: fetch::client()?,
        cache: Cache::new(32),
        cache_enabled: enable_cache,
        cache_ttl,
    });

    let router = Router::new()
        .route("/events", get(handle_events))
        .fallback(|| async { Redirect::permanent(env!("CARGO_PKG_REPOSITORY")) })
        .with_state(state);

    let listener = TcpListener::bind(address).await?;
    info!("listening at http://{address}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
    }
}

async fn handle_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ScheduleQuery>,
) -> Response {
    let date = query.date.unwrap_or_else(jst::today);

    let Some(events) = day_events(&state, date).await else {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to aggregate events").into_response();
    };

    if query.json {
        return Json(events.as_ref()).into_response();
    }

    let name = date.to_string();
    let calendar = events_to_ics(&name, events.iter().map(|stored| &stored.event)).to_string();

    ([("content-type", "text/calendar")], calendar).into_response()
}

/// Aggregates one day across all venues, scraping on demand. Only a run
/// where every venue fails is an error; partial days are served and the
/// failures logged.
async fn day_events(state: &AppState, date: NaiveDate) -> Option<Arc<Vec<StoredEvent>>> {
    if state.cache_enabled {
        if let Some((stamp, events)) = state.cache.get(&date) {
            if stamp.elapsed() < state.cache_ttl {
                return Some(events);
            }
            state.cache.remove(&date);
        }
    }

    let extracted_at = jst::now();
    let mut merged: Vec<StoredEvent> = Vec::new();
    let mut failures = 0;

    for venue in VENUES {
        match collect::collect_venue(&state.client, venue, date, false, extracted_at).await {
            Ok(batch) => merged.extend(batch),
            Err(err) => {
                warn!("[{}] scrape failed: {err:#}", venue.code);
                failures += 1;
            }
        }
    }

    if failures == VENUES.len() {
        return None;
    }

    // Cross-venue repeats of one listing share a content hash.
    let mut seen = HashSet::new();
    merged.retain(|stored| seen.insert(stored.event.hash.clone()));

    merged.sort_by(|a, b| {
        (a.event.time.is_none(), a.event.time, &a.event.title).cmp(&(
            b.event.time.is_none(),
            b.event.time,
            &b.event.title,
        ))
    });

    let events = Arc::new(merged);

    if state.cache_enabled {
        state
            .cache
            .insert(date, (Instant::now(), Arc::clone(&events)));
    }

    Some(events)
}
