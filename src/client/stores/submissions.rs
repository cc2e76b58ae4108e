//! Submission stores: event-wide listing and the single per-team fetch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::backend::types::{collections, decode_row, decode_rows, Submission};
use crate::backend::{Backend, Query};
use crate::client::notify::Notifier;

use super::FetchError;

/// Submissions for one event (or all, when unscoped), newest first.
pub struct SubmissionStore {
    backend: Arc<dyn Backend>,
    notifier: Notifier,
    submissions: Arc<Mutex<Vec<Submission>>>,
    alive: Arc<AtomicBool>,
}

impl SubmissionStore {
    pub fn new(backend: Arc<dyn Backend>, notifier: Notifier) -> Self {
        Self {
            backend,
            notifier,
            submissions: Arc::new(Mutex::new(Vec::new())),
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }

    pub async fn load(&self, event_id: Option<&str>) {
        let mut query = Query::table(collections::SUBMISSIONS).order_desc("submitted_at");
        if let Some(event_id) = event_id {
            query = query.eq("event_id", event_id);
        }
        match self.backend.fetch(query).await {
            Ok(rows) => {
                if self.alive.load(Ordering::SeqCst) {
                    *self.submissions.lock().unwrap() = decode_rows(rows);
                }
            }
            Err(e) => {
                log::warn!("submission fetch failed: {}", e);
                self.notifier.error("Failed to load submissions");
            }
        }
    }

    pub async fn refetch(&self, event_id: Option<&str>) {
        self.load(event_id).await;
    }

    pub fn close(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}

/// A team has at most one submission. Zero rows is a plain `None`, never an
/// error; more than one means the data violates the one-per-team assumption
/// and is reported as a query error.
pub async fn fetch_for_team(
    backend: &Arc<dyn Backend>,
    team_id: &str,
) -> Result<Option<Submission>, FetchError> {
    let rows = backend
        .fetch(Query::table(collections::SUBMISSIONS).eq("team_id", team_id))
        .await?;
    if rows.len() > 1 {
        return Err(FetchError::Query(format!(
            "expected at most one submission for team {}, got {}",
            team_id,
            rows.len()
        )));
    }
    match rows.into_iter().next() {
        Some(row) => decode_row(row)
            .map(Some)
            .ok_or_else(|| FetchError::Query("malformed submission row".to_string())),
        None => Ok(None),
    }
}
