//! In-process backend used by the demo binary and the test suite.
//!
//! Tables are plain JSON row sets. Mutations dispatch change-feed events to
//! matching subscribers while the table lock is held, so delivery order is
//! commit order per collection. This is a stand-in for the managed service,
//! not a server implementation: no auth, no persistence, no isolation beyond
//! the single mutex.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use super::client::{Backend, BackendError, Filter, Query};
use super::feed::{ChangeKind, FeedSubscription, RowChange};
use super::types::collections;

struct Subscriber {
    collection: String,
    filter: Option<Filter>,
    sender: mpsc::UnboundedSender<RowChange>,
}

#[derive(Default)]
struct Tables {
    rows: HashMap<String, Vec<Value>>,
    subscribers: Vec<Subscriber>,
}

pub struct InMemoryBackend {
    tables: Mutex<Tables>,
    /// Collections whose queries and mutations are currently forced to fail.
    failing: Mutex<HashSet<String>>,
    next_sub_id: AtomicU64,
    calls: AtomicU64,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            failing: Mutex::new(HashSet::new()),
            next_sub_id: AtomicU64::new(1),
            calls: AtomicU64::new(0),
        }
    }

    /// Total query/mutation round trips issued so far.
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Force every query and mutation on a collection to fail until cleared.
    pub async fn fail_collection(&self, collection: &str) {
        self.failing.lock().await.insert(collection.to_string());
    }

    pub async fn clear_failures(&self) {
        self.failing.lock().await.clear();
    }

    /// Remove matching rows and dispatch delete events, simulating a deletion
    /// committed remotely by another client.
    pub async fn delete_rows(&self, collection: &str, filters: Vec<Filter>) {
        let mut tables = self.tables.lock().await;
        let removed: Vec<Value> = match tables.rows.get_mut(collection) {
            Some(rows) => {
                let (gone, kept): (Vec<Value>, Vec<Value>) = rows
                    .drain(..)
                    .partition(|row| filters.iter().all(|f| f.matches(row)));
                *rows = kept;
                gone
            }
            None => Vec::new(),
        };
        for row in removed {
            dispatch(&mut tables, collection, ChangeKind::Delete, row);
        }
    }

    async fn check_failing(&self, collection: &str) -> Result<(), BackendError> {
        if self.failing.lock().await.contains(collection) {
            return Err(BackendError::Query(format!(
                "injected failure for {}",
                collection
            )));
        }
        Ok(())
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn fetch(&self, query: Query) -> Result<Vec<Value>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_failing(&query.collection).await?;

        let tables = self.tables.lock().await;
        let mut rows: Vec<Value> = tables
            .rows
            .get(&query.collection)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.filters.iter().all(|f| f.matches(row)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(ref order) = query.order {
            rows.sort_by(|a, b| {
                let ord = cmp_values(a.get(&order.column), b.get(&order.column));
                if order.ascending {
                    ord
                } else {
                    ord.reverse()
                }
            });
        }
        Ok(rows)
    }

    async fn count(&self, collection: &str, filters: Vec<Filter>) -> Result<u64, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_failing(collection).await?;

        let tables = self.tables.lock().await;
        let n = tables
            .rows
            .get(collection)
            .map(|rows| {
                rows.iter()
                    .filter(|row| filters.iter().all(|f| f.matches(row)))
                    .count()
            })
            .unwrap_or(0);
        Ok(n as u64)
    }

    async fn insert(&self, collection: &str, row: Value) -> Result<Value, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_failing(collection).await?;

        let mut row = row;
        stamp_defaults(collection, &mut row);

        let mut tables = self.tables.lock().await;
        tables
            .rows
            .entry(collection.to_string())
            .or_default()
            .push(row.clone());
        dispatch(&mut tables, collection, ChangeKind::Insert, row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        collection: &str,
        filters: Vec<Filter>,
        patch: Value,
    ) -> Result<(), BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_failing(collection).await?;

        let patch = match patch {
            Value::Object(map) => map,
            other => {
                return Err(BackendError::Query(format!(
                    "update patch must be an object, got {}",
                    other
                )))
            }
        };

        let mut tables = self.tables.lock().await;
        let mut changed = Vec::new();
        if let Some(rows) = tables.rows.get_mut(collection) {
            for row in rows.iter_mut() {
                if filters.iter().all(|f| f.matches(row)) {
                    if let Value::Object(fields) = row {
                        for (key, value) in &patch {
                            fields.insert(key.clone(), value.clone());
                        }
                        if fields.contains_key("updated_at") {
                            fields.insert("updated_at".into(), json!(Utc::now()));
                        }
                    }
                    changed.push(row.clone());
                }
            }
        }
        for row in changed {
            dispatch(&mut tables, collection, ChangeKind::Update, row);
        }
        Ok(())
    }

    async fn subscribe(&self, collection: &str, filter: Option<Filter>) -> FeedSubscription {
        let id = self.next_sub_id.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut tables = self.tables.lock().await;
        tables.subscribers.push(Subscriber {
            collection: collection.to_string(),
            filter,
            sender,
        });
        log::debug!("feed subscription {} opened on {}", id, collection);
        FeedSubscription::new(id, receiver)
    }
}

/// Push one change to every live subscriber whose scope matches, pruning
/// subscribers whose receiving end is gone.
fn dispatch(tables: &mut Tables, collection: &str, kind: ChangeKind, row: Value) {
    tables.subscribers.retain(|sub| {
        if sub.collection != collection {
            return true;
        }
        if let Some(ref filter) = sub.filter {
            if !filter.matches(&row) {
                return true;
            }
        }
        sub.sender
            .send(RowChange {
                kind,
                row: row.clone(),
            })
            .is_ok()
    });
}

/// Server-assigned fields: id plus the collection's timestamp columns, only
/// where the caller did not provide them.
fn stamp_defaults(collection: &str, row: &mut Value) {
    let now = json!(Utc::now());
    if let Value::Object(fields) = row {
        if !fields.contains_key("id") {
            fields.insert("id".into(), json!(Uuid::new_v4().to_string()));
        }
        match collection {
            collections::TEAM_MESSAGES => {
                fields.entry("created_at").or_insert(now);
            }
            collections::TEAM_MEMBERS => {
                fields.entry("joined_at").or_insert(now);
            }
            collections::EVENTS | collections::TEAMS => {
                fields.entry("created_at").or_insert_with(|| now.clone());
                fields.entry("updated_at").or_insert(now);
            }
            collections::SUBMISSIONS => {
                fields.entry("submitted_at").or_insert_with(|| now.clone());
                fields.entry("updated_at").or_insert(now);
            }
            _ => {}
        }
    }
}

/// Compare two JSON column values for ordering. RFC 3339 timestamps compare
/// correctly as strings because the backend always emits UTC.
fn cmp_values(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    use std::cmp::Ordering as O;
    match (a, b) {
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(O::Equal),
        (Some(_), None) => O::Greater,
        (None, Some(_)) => O::Less,
        _ => O::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetch_applies_filters_and_order() {
        let backend = InMemoryBackend::new();
        for (id, team, at) in [
            ("m2", "t1", "2025-06-01T10:01:00Z"),
            ("m1", "t1", "2025-06-01T10:00:00Z"),
            ("m3", "t2", "2025-06-01T10:02:00Z"),
        ] {
            backend
                .insert(
                    collections::TEAM_MESSAGES,
                    json!({"id": id, "team_id": team, "user_id": "u1", "message": "x", "created_at": at}),
                )
                .await
                .unwrap();
        }

        let rows = backend
            .fetch(
                Query::table(collections::TEAM_MESSAGES)
                    .eq("team_id", "t1")
                    .order_asc("created_at"),
            )
            .await
            .unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["m1", "m2"]);
    }

    #[tokio::test]
    async fn feed_delivers_only_matching_scope_in_commit_order() {
        let backend = InMemoryBackend::new();
        let mut sub = backend
            .subscribe(
                collections::TEAM_MESSAGES,
                Some(Filter::eq("team_id", "t1")),
            )
            .await;

        for (team, body) in [("t1", "a"), ("t2", "other"), ("t1", "b")] {
            backend
                .insert(
                    collections::TEAM_MESSAGES,
                    json!({"team_id": team, "user_id": "u1", "message": body}),
                )
                .await
                .unwrap();
        }

        let first = sub.try_recv().unwrap();
        let second = sub.try_recv().unwrap();
        assert_eq!(first.row["message"], "a");
        assert_eq!(second.row["message"], "b");
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn released_subscription_is_pruned_on_next_dispatch() {
        let backend = InMemoryBackend::new();
        let mut sub = backend.subscribe(collections::EVENTS, None).await;
        sub.release();

        backend
            .insert(collections::EVENTS, json!({"title": "x"}))
            .await
            .unwrap();
        let tables = backend.tables.lock().await;
        assert!(tables.subscribers.is_empty());
    }

    #[tokio::test]
    async fn injected_failure_rejects_queries() {
        let backend = InMemoryBackend::new();
        backend.fail_collection(collections::EVENTS).await;
        let err = backend
            .fetch(Query::table(collections::EVENTS))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Query(_)));

        backend.clear_failures().await;
        assert!(backend.fetch(Query::table(collections::EVENTS)).await.is_ok());
    }
}
