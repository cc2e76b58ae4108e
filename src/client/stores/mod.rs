pub mod chat;
pub mod events;
pub mod profiles;
pub mod roles;
pub mod submissions;
pub mod teams;

pub use chat::{ChatPhase, ChatStore};
pub use events::EventStore;
pub use profiles::ProfileResolver;
pub use roles::RoleStore;
pub use submissions::SubmissionStore;
pub use teams::{MyTeamsStore, TeamOverview, TeamStore};

/// Outcome of a single-record fetch. Zero matching rows is "no data to
/// display", not a failure; a rejected query is a failure. The two are never
/// conflated.
#[derive(Debug, Clone)]
pub enum FetchError {
    NotFound,
    Query(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::NotFound => write!(f, "no matching record"),
            FetchError::Query(msg) => write!(f, "query failed: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<crate::backend::BackendError> for FetchError {
    fn from(err: crate::backend::BackendError) -> Self {
        FetchError::Query(err.to_string())
    }
}
