//! Event collection store.
//!
//! Mirrors the full remote `events` collection ordered by start time
//! descending. Freshness comes from a coarse invalidation strategy: the store
//! listens to the unfiltered change feed and re-fetches the whole collection
//! on any insert, update or delete. Inefficient but correctness-safe, and the
//! result set is small enough that it does not matter.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::task::JoinHandle;

use crate::backend::types::{collections, decode_row, decode_rows, EventRecord, EventStatus};
use crate::backend::{Backend, Filter, Query};
use crate::client::notify::Notifier;
use crate::common::slug::slugify;

use super::FetchError;

/// Organizer input for event creation. Tracks arrive as the comma-separated
/// string typed into the form.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub tagline: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub registration_deadline: DateTime<Utc>,
    pub tracks: String,
    pub capacity: u32,
    pub team_size_min: u32,
    pub team_size_max: u32,
    pub prize_pool: Option<String>,
    pub location: Option<String>,
    pub is_virtual: bool,
    pub organizer_id: String,
}

pub struct EventStore {
    backend: Arc<dyn Backend>,
    notifier: Notifier,
    events: Arc<Mutex<Vec<EventRecord>>>,
    alive: Arc<AtomicBool>,
    feed_task: Option<JoinHandle<()>>,
}

impl EventStore {
    pub fn new(backend: Arc<dyn Backend>, notifier: Notifier) -> Self {
        Self {
            backend,
            notifier,
            events: Arc::new(Mutex::new(Vec::new())),
            alive: Arc::new(AtomicBool::new(true)),
            feed_task: None,
        }
    }

    /// Current snapshot, newest start time first.
    pub fn events(&self) -> Vec<EventRecord> {
        self.events.lock().unwrap().clone()
    }

    /// Fetch the full collection and replace the snapshot wholesale. On
    /// failure the prior snapshot is kept and a transient notice is posted.
    pub async fn load(&self) {
        reload(&self.backend, &self.events, &self.alive, &self.notifier).await;
    }

    /// Open the unfiltered change feed and re-fetch on every delivery. Any
    /// previously opened feed is torn down first, so the listener is never
    /// duplicated.
    pub async fn subscribe(&mut self) {
        self.close_feed();

        let mut sub = self.backend.subscribe(collections::EVENTS, None).await;
        let backend = Arc::clone(&self.backend);
        let events = Arc::clone(&self.events);
        let alive = Arc::clone(&self.alive);
        let notifier = self.notifier.clone();

        self.feed_task = Some(tokio::spawn(async move {
            while let Some(change) = sub.recv().await {
                if !alive.load(Ordering::SeqCst) {
                    break;
                }
                log::debug!("events feed: {:?}, reloading collection", change.kind);
                reload(&backend, &events, &alive, &notifier).await;
            }
        }));
    }

    /// Tear the store down. The feed listener is released and any in-flight
    /// fetch completion is discarded instead of being applied.
    pub fn close(&mut self) {
        self.alive.store(false, Ordering::SeqCst);
        self.close_feed();
    }

    fn close_feed(&mut self) {
        if let Some(task) = self.feed_task.take() {
            task.abort();
        }
    }

    /// Derive the slug, parse the track list and insert. The slug is not
    /// checked for collisions; the backend surfaces any constraint violation
    /// as a query error.
    pub async fn create(&self, new_event: NewEvent) -> anyhow::Result<EventRecord> {
        let slug = slugify(&new_event.title);
        let tracks: Vec<String> = new_event
            .tracks
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        let row = json!({
            "title": new_event.title,
            "slug": slug,
            "description": new_event.description,
            "tagline": new_event.tagline,
            "cover_image": null,
            "start_at": new_event.start_at,
            "end_at": new_event.end_at,
            "registration_deadline": new_event.registration_deadline,
            "tracks": tracks,
            "capacity": new_event.capacity,
            "team_size_min": new_event.team_size_min,
            "team_size_max": new_event.team_size_max,
            "status": EventStatus::Upcoming,
            "prize_pool": new_event.prize_pool,
            "location": new_event.location,
            "is_virtual": new_event.is_virtual,
            "organizer_id": new_event.organizer_id,
        });

        match self.backend.insert(collections::EVENTS, row).await {
            Ok(stored) => {
                decode_row::<EventRecord>(stored).context("backend returned a malformed event row")
            }
            Err(e) => {
                log::error!("event creation failed: {}", e);
                self.notifier.error("Failed to create event");
                Err(e.into())
            }
        }
    }

    /// Explicit status change by the organizer. The client never recomputes
    /// status from the scheduling fields.
    pub async fn set_status(&self, event_id: &str, status: EventStatus) -> anyhow::Result<()> {
        let result = self
            .backend
            .update(
                collections::EVENTS,
                vec![Filter::eq("id", event_id)],
                json!({ "status": status }),
            )
            .await;
        if let Err(ref e) = result {
            log::error!("event status update failed: {}", e);
            self.notifier.error("Failed to update event");
        }
        result.map_err(Into::into)
    }
}

impl Drop for EventStore {
    fn drop(&mut self) {
        self.close();
    }
}

async fn reload(
    backend: &Arc<dyn Backend>,
    events: &Mutex<Vec<EventRecord>>,
    alive: &AtomicBool,
    notifier: &Notifier,
) {
    let result = backend
        .fetch(Query::table(collections::EVENTS).order_desc("start_at"))
        .await;
    match result {
        Ok(rows) => {
            if alive.load(Ordering::SeqCst) {
                *events.lock().unwrap() = decode_rows(rows);
            }
        }
        Err(e) => {
            // Keep the last known-good snapshot.
            log::warn!("event fetch failed: {}", e);
            notifier.error("Failed to load events");
        }
    }
}

/// Single-event fetch for the detail view. Not live-subscribed. Zero matching
/// rows is `NotFound`; a rejected query stays a distinct `Query` error.
pub async fn fetch_by_slug(
    backend: &Arc<dyn Backend>,
    slug: &str,
) -> Result<EventRecord, FetchError> {
    let rows = backend
        .fetch(Query::table(collections::EVENTS).eq("slug", slug))
        .await?;
    let row = rows.into_iter().next().ok_or(FetchError::NotFound)?;
    decode_row(row).ok_or_else(|| FetchError::Query("malformed event row".to_string()))
}
