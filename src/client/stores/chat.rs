//! Team chat store.
//!
//! Owns the ordered message history of exactly one team channel. Binding a
//! channel clears the previous list, runs the initial ascending fetch and
//! opens a feed subscription filtered to the team; incoming inserts append to
//! the tail unconditionally. Sending never appends locally: a sent message
//! becomes visible only when the feed delivers the corresponding insert, so
//! send-then-display carries one round trip of latency by design.

use std::sync::{Arc, Mutex};

use serde_json::json;
use tokio::task::JoinHandle;

use crate::backend::types::{collections, decode_row, decode_rows, ChatMessage};
use crate::backend::{Backend, ChangeKind, Filter, Query};
use crate::client::notify::Notifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPhase {
    /// No channel bound (no team, or no authenticated user).
    Unbound,
    /// Channel bound, initial fetch in flight.
    Loading,
    /// Initial fetch finished (successfully or not), feed active.
    Ready,
}

struct ChatState {
    phase: ChatPhase,
    messages: Vec<ChatMessage>,
    /// Binding generation. Completions tagged with a stale epoch are
    /// discarded instead of being applied to the wrong channel.
    epoch: u64,
}

struct Binding {
    team_id: String,
    user_id: String,
    task: JoinHandle<()>,
}

pub struct ChatStore {
    backend: Arc<dyn Backend>,
    notifier: Notifier,
    state: Arc<Mutex<ChatState>>,
    binding: Option<Binding>,
}

impl ChatStore {
    pub fn new(backend: Arc<dyn Backend>, notifier: Notifier) -> Self {
        Self {
            backend,
            notifier,
            state: Arc::new(Mutex::new(ChatState {
                phase: ChatPhase::Unbound,
                messages: Vec::new(),
                epoch: 0,
            })),
            binding: None,
        }
    }

    pub fn phase(&self) -> ChatPhase {
        self.state.lock().unwrap().phase
    }

    /// Snapshot of the channel history, ascending by creation time.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.state.lock().unwrap().messages.clone()
    }

    /// Bind the store to a team channel for an authenticated user. Any prior
    /// binding is torn down first and its message list cleared immediately, so
    /// no stale history is ever displayed across a channel switch.
    pub async fn bind(&mut self, team_id: &str, user_id: &str) {
        self.release_binding();

        let epoch = {
            let mut state = self.state.lock().unwrap();
            state.epoch += 1;
            state.messages.clear();
            state.phase = ChatPhase::Loading;
            state.epoch
        };

        let mut sub = self
            .backend
            .subscribe(
                collections::TEAM_MESSAGES,
                Some(Filter::eq("team_id", team_id)),
            )
            .await;

        let backend = Arc::clone(&self.backend);
        let state = Arc::clone(&self.state);
        let team = team_id.to_string();

        let task = tokio::spawn(async move {
            let fetched = backend
                .fetch(
                    Query::table(collections::TEAM_MESSAGES)
                        .eq("team_id", team.as_str())
                        .order_asc("created_at"),
                )
                .await;

            {
                let mut st = state.lock().unwrap();
                if st.epoch != epoch {
                    return;
                }
                match fetched {
                    Ok(rows) => st.messages = decode_rows(rows),
                    // Failure leaves the list empty; no automatic retry.
                    Err(e) => log::warn!("chat history fetch failed for {}: {}", team, e),
                }
                st.phase = ChatPhase::Ready;
            }

            while let Some(change) = sub.recv().await {
                if change.kind != ChangeKind::Insert {
                    continue;
                }
                let Some(message) = decode_row::<ChatMessage>(change.row) else {
                    continue;
                };
                let mut st = state.lock().unwrap();
                if st.epoch != epoch {
                    return;
                }
                // Tail append, no dedup and no re-sort: the feed is filtered
                // server-side and delivers in commit order.
                st.messages.push(message);
            }
        });

        self.binding = Some(Binding {
            team_id: team_id.to_string(),
            user_id: user_id.to_string(),
            task,
        });
    }

    /// Unbind the channel, releasing the feed subscription. Idempotent.
    pub fn unbind(&mut self) {
        self.release_binding();
        let mut state = self.state.lock().unwrap();
        state.epoch += 1;
        state.messages.clear();
        state.phase = ChatPhase::Unbound;
    }

    /// Insert a message into the bound channel. Empty bodies and unbound
    /// stores are a silent no-op with zero backend calls. The message is not
    /// appended locally; it arrives back through the feed.
    pub async fn send(&self, body: &str) {
        let text = body.trim();
        if text.is_empty() {
            return;
        }
        let Some(binding) = self.binding.as_ref() else {
            return;
        };

        let row = json!({
            "team_id": binding.team_id,
            "user_id": binding.user_id,
            "message": text,
        });
        if let Err(e) = self.backend.insert(collections::TEAM_MESSAGES, row).await {
            log::error!("send failed on channel {}: {}", binding.team_id, e);
            self.notifier.error("Failed to send message");
        }
    }

    fn release_binding(&mut self) {
        if let Some(binding) = self.binding.take() {
            // Aborting the task drops the feed subscription, which releases it.
            binding.task.abort();
        }
    }
}

impl Drop for ChatStore {
    fn drop(&mut self) {
        self.release_binding();
    }
}
