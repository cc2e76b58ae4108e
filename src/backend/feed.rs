//! Change-feed subscription types.
//!
//! A `FeedSubscription` is the consumer end of a per-collection change feed:
//! the backend pushes insert/update/delete events in commit order, filtered to
//! the scope the subscription was opened with. Every subscription must be
//! released exactly once; `release()` is idempotent and `Drop` is the backstop
//! so an unmounted scope can never keep receiving pushes.

use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One committed change to a remote collection, delivered over the feed.
/// The row is the loosely-typed remote shape; consumers decode it at the
/// boundary into the collection's schema type.
#[derive(Debug, Clone)]
pub struct RowChange {
    pub kind: ChangeKind,
    pub row: serde_json::Value,
}

pub struct FeedSubscription {
    id: u64,
    receiver: Option<mpsc::UnboundedReceiver<RowChange>>,
}

impl FeedSubscription {
    pub(crate) fn new(id: u64, receiver: mpsc::UnboundedReceiver<RowChange>) -> Self {
        Self {
            id,
            receiver: Some(receiver),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the next change. Returns `None` once the subscription has been
    /// released or the backend has dropped the feed.
    pub async fn recv(&mut self) -> Option<RowChange> {
        match self.receiver {
            Some(ref mut rx) => rx.recv().await,
            None => None,
        }
    }

    /// Pull a change without waiting, if one is already queued.
    pub fn try_recv(&mut self) -> Option<RowChange> {
        self.receiver.as_mut().and_then(|rx| rx.try_recv().ok())
    }

    /// Release the subscription. Idempotent; the backend prunes the dead
    /// sender on its next dispatch.
    pub fn release(&mut self) {
        if let Some(rx) = self.receiver.take() {
            drop(rx);
            log::debug!("feed subscription {} released", self.id);
        }
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        self.release();
    }
}
