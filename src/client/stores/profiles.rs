//! Author profile resolution for the chat display layer.
//!
//! The chat store deals only in user ids; the display layer batch-resolves
//! the distinct ids of the current message list into display-name/avatar
//! records. Resolution re-runs on every list change, so results are memoized
//! per user id: already-resolved authors cost nothing on subsequent calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::json;

use crate::backend::types::{collections, decode_rows, Profile};
use crate::backend::{Backend, Query};

pub struct ProfileResolver {
    backend: Arc<dyn Backend>,
    cache: Mutex<HashMap<String, Profile>>,
}

impl ProfileResolver {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a set of author ids (duplicates welcome) into profiles. Ids
    /// without a profile row are simply absent from the result. A failed
    /// lookup degrades to whatever the cache already holds.
    pub async fn resolve(&self, user_ids: &[String]) -> HashMap<String, Profile> {
        let mut wanted: Vec<String> = user_ids.to_vec();
        wanted.sort();
        wanted.dedup();

        let missing: Vec<serde_json::Value> = {
            let cache = self.cache.lock().unwrap();
            wanted
                .iter()
                .filter(|id| !cache.contains_key(*id))
                .map(|id| json!(id))
                .collect()
        };

        if !missing.is_empty() {
            match self
                .backend
                .fetch(Query::table(collections::PROFILES).is_in("user_id", missing))
                .await
            {
                Ok(rows) => {
                    let mut cache = self.cache.lock().unwrap();
                    for profile in decode_rows::<Profile>(rows) {
                        cache.insert(profile.user_id.clone(), profile);
                    }
                }
                Err(e) => log::warn!("profile lookup failed: {}", e),
            }
        }

        let cache = self.cache.lock().unwrap();
        wanted
            .into_iter()
            .filter_map(|id| cache.get(&id).map(|p| (id, p.clone())))
            .collect()
    }
}
