//! Per-collection row schemas.
//!
//! Remote rows cross the backend boundary as loosely-typed JSON and are
//! decoded here into explicit structs. Rows that fail to decode are dropped
//! with a warning rather than poisoning the whole result set.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub mod collections {
    pub const EVENTS: &str = "events";
    pub const TEAMS: &str = "teams";
    pub const TEAM_MEMBERS: &str = "team_members";
    pub const TEAM_MESSAGES: &str = "team_messages";
    pub const SUBMISSIONS: &str = "submissions";
    pub const PROFILES: &str = "profiles";
    pub const USER_ROLES: &str = "user_roles";
}

/// Explicit stored lifecycle of an event. Set by the organizer; the client
/// never derives it from the scheduling fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Upcoming,
    Active,
    Past,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Participant,
    Judge,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub tagline: Option<String>,
    pub cover_image: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub registration_deadline: DateTime<Utc>,
    pub tracks: Vec<String>,
    pub capacity: u32,
    pub team_size_min: u32,
    pub team_size_max: u32,
    pub status: EventStatus,
    pub prize_pool: Option<String>,
    pub location: Option<String>,
    pub is_virtual: bool,
    pub organizer_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub id: String,
    pub event_id: String,
    pub name: String,
    pub tagline: Option<String>,
    pub track: String,
    pub repo_link: Option<String>,
    pub invite_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: String,
    pub team_id: String,
    pub user_id: String,
    /// "leader" is distinguished; everyone else defaults to "member".
    #[serde(default = "default_member_role")]
    pub role: String,
    pub joined_at: DateTime<Utc>,
}

fn default_member_role() -> String {
    "member".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub team_id: String,
    pub user_id: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub team_id: String,
    pub event_id: String,
    pub title: String,
    pub description: String,
    pub repo_link: Option<String>,
    pub demo_link: Option<String>,
    pub video_link: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRole {
    pub user_id: String,
    pub role: Role,
}

/// Decode a raw result set, dropping rows that do not match the schema.
pub fn decode_rows<T: DeserializeOwned>(rows: Vec<serde_json::Value>) -> Vec<T> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        match serde_json::from_value::<T>(row) {
            Ok(decoded) => out.push(decoded),
            Err(e) => log::warn!("dropping malformed row: {}", e),
        }
    }
    out
}

/// Decode a single raw row, or `None` if it does not match the schema.
pub fn decode_row<T: DeserializeOwned>(row: serde_json::Value) -> Option<T> {
    match serde_json::from_value::<T>(row) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            log::warn!("dropping malformed row: {}", e);
            None
        }
    }
}
