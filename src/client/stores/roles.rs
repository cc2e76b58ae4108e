//! Per-user platform role (admin / participant / judge).

use std::sync::{Arc, Mutex};

use serde_json::json;

use crate::backend::types::{collections, decode_row, Role, UserRole};
use crate::backend::{Backend, Query};

pub struct RoleStore {
    backend: Arc<dyn Backend>,
    role: Mutex<Option<Role>>,
}

impl RoleStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            role: Mutex::new(None),
        }
    }

    pub fn role(&self) -> Option<Role> {
        *self.role.lock().unwrap()
    }

    /// Single-row role fetch. No role assigned yet is `None`, not an error;
    /// a failed query leaves the current value untouched.
    pub async fn load(&self, user_id: &str) {
        match self
            .backend
            .fetch(Query::table(collections::USER_ROLES).eq("user_id", user_id))
            .await
        {
            Ok(rows) => {
                let role = rows
                    .into_iter()
                    .next()
                    .and_then(decode_row::<UserRole>)
                    .map(|r| r.role);
                *self.role.lock().unwrap() = role;
            }
            Err(e) => log::warn!("role fetch failed for {}: {}", user_id, e),
        }
    }

    /// Assign a role. The local value changes only after the insert is
    /// confirmed by the backend.
    pub async fn set_role(&self, user_id: &str, role: Role) -> anyhow::Result<()> {
        self.backend
            .insert(
                collections::USER_ROLES,
                json!({ "user_id": user_id, "role": role }),
            )
            .await?;
        *self.role.lock().unwrap() = Some(role);
        Ok(())
    }
}
