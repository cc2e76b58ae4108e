//! Team and membership stores.
//!
//! One-shot scoped fetches with a manual refetch; no live subscription.
//! Overlapping loads are allowed and resolve last-write-wins: whichever
//! response completes last determines the snapshot, regardless of issue
//! order. A closed store silently discards late completions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::future::join_all;
use serde_json::json;

use crate::backend::types::{
    collections, decode_row, decode_rows, EventRecord, TeamMember, TeamRecord,
};
use crate::backend::{Backend, Filter, Query};
use crate::client::notify::Notifier;

use super::FetchError;

/// Teams for one event (or all teams when unscoped).
pub struct TeamStore {
    backend: Arc<dyn Backend>,
    notifier: Notifier,
    teams: Arc<Mutex<Vec<TeamRecord>>>,
    alive: Arc<AtomicBool>,
}

impl TeamStore {
    pub fn new(backend: Arc<dyn Backend>, notifier: Notifier) -> Self {
        Self {
            backend,
            notifier,
            teams: Arc::new(Mutex::new(Vec::new())),
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn teams(&self) -> Vec<TeamRecord> {
        self.teams.lock().unwrap().clone()
    }

    /// Fetch the team list, optionally scoped to one event. Soft failure:
    /// a notice is posted and the prior snapshot kept.
    pub async fn load(&self, event_id: Option<&str>) {
        let mut query = Query::table(collections::TEAMS);
        if let Some(event_id) = event_id {
            query = query.eq("event_id", event_id);
        }
        match self.backend.fetch(query).await {
            Ok(rows) => {
                if self.alive.load(Ordering::SeqCst) {
                    *self.teams.lock().unwrap() = decode_rows(rows);
                }
            }
            Err(e) => {
                log::warn!("team fetch failed: {}", e);
                self.notifier.error("Failed to load teams");
            }
        }
    }

    /// Identical to the initial load; callable any number of times, safe to
    /// overlap with itself.
    pub async fn refetch(&self, event_id: Option<&str>) {
        self.load(event_id).await;
    }

    /// Discard any completion that arrives from here on.
    pub fn close(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}

/// Single-team fetch for the workspace view.
pub async fn fetch_team(
    backend: &Arc<dyn Backend>,
    team_id: &str,
) -> Result<TeamRecord, FetchError> {
    let rows = backend
        .fetch(Query::table(collections::TEAMS).eq("id", team_id))
        .await?;
    let row = rows.into_iter().next().ok_or(FetchError::NotFound)?;
    decode_row(row).ok_or_else(|| FetchError::Query("malformed team row".to_string()))
}

/// Member list of one team.
pub async fn fetch_members(
    backend: &Arc<dyn Backend>,
    team_id: &str,
) -> anyhow::Result<Vec<TeamMember>> {
    let rows = backend
        .fetch(Query::table(collections::TEAM_MEMBERS).eq("team_id", team_id))
        .await?;
    Ok(decode_rows(rows))
}

/// Update the team's repository link from the workspace settings tab.
pub async fn set_repo_link(
    backend: &Arc<dyn Backend>,
    team_id: &str,
    repo_link: &str,
) -> anyhow::Result<()> {
    backend
        .update(
            collections::TEAMS,
            vec![Filter::eq("id", team_id)],
            json!({ "repo_link": repo_link }),
        )
        .await?;
    Ok(())
}

/// A team joined with its event and resolved member count, as shown on the
/// dashboard's "my teams" list.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamOverview {
    pub team: TeamRecord,
    pub event: Option<EventRecord>,
    pub member_count: u64,
}

/// All teams the user belongs to, across events.
pub struct MyTeamsStore {
    backend: Arc<dyn Backend>,
    notifier: Notifier,
    teams: Arc<Mutex<Vec<TeamOverview>>>,
    alive: Arc<AtomicBool>,
}

impl MyTeamsStore {
    pub fn new(backend: Arc<dyn Backend>, notifier: Notifier) -> Self {
        Self {
            backend,
            notifier,
            teams: Arc::new(Mutex::new(Vec::new())),
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn teams(&self) -> Vec<TeamOverview> {
        self.teams.lock().unwrap().clone()
    }

    /// Memberships, then teams with their events, then one member-count query
    /// per team issued concurrently. The aggregate snapshot is published only
    /// once every count has resolved; partial results are never shown.
    pub async fn load(&self, user_id: &str) {
        match self.fetch_overviews(user_id).await {
            Ok(overviews) => {
                if self.alive.load(Ordering::SeqCst) {
                    *self.teams.lock().unwrap() = overviews;
                }
            }
            Err(e) => {
                log::warn!("my-teams fetch failed for {}: {}", user_id, e);
                self.notifier.error("Failed to load your teams");
            }
        }
    }

    pub async fn refetch(&self, user_id: &str) {
        self.load(user_id).await;
    }

    pub fn close(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    async fn fetch_overviews(&self, user_id: &str) -> anyhow::Result<Vec<TeamOverview>> {
        let membership_rows = self
            .backend
            .fetch(Query::table(collections::TEAM_MEMBERS).eq("user_id", user_id))
            .await?;
        let memberships: Vec<TeamMember> = decode_rows(membership_rows);
        if memberships.is_empty() {
            return Ok(Vec::new());
        }
        let team_ids: Vec<serde_json::Value> =
            memberships.iter().map(|m| json!(m.team_id)).collect();

        let team_rows = self
            .backend
            .fetch(Query::table(collections::TEAMS).is_in("id", team_ids))
            .await?;
        let teams: Vec<TeamRecord> = decode_rows(team_rows);

        let event_ids: Vec<serde_json::Value> =
            teams.iter().map(|t| json!(t.event_id)).collect();
        let event_rows = self
            .backend
            .fetch(Query::table(collections::EVENTS).is_in("id", event_ids))
            .await?;
        let events: Vec<EventRecord> = decode_rows(event_rows);

        let counts = join_all(teams.iter().map(|team| {
            let backend = Arc::clone(&self.backend);
            let team_id = team.id.clone();
            async move {
                backend
                    .count(
                        collections::TEAM_MEMBERS,
                        vec![Filter::eq("team_id", team_id.as_str())],
                    )
                    .await
                    .unwrap_or(0)
            }
        }))
        .await;

        Ok(teams
            .into_iter()
            .zip(counts)
            .map(|(team, member_count)| {
                let event = events.iter().find(|e| e.id == team.event_id).cloned();
                TeamOverview {
                    team,
                    event,
                    member_count,
                }
            })
            .collect())
    }
}
