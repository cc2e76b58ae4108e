//! The managed-backend boundary.
//!
//! Every store consumes the remote data service through this trait: filtered
//! reads, inserts/updates, row counts and change-feed subscriptions. The
//! client instance is constructed explicitly and passed by reference into each
//! store; there is no process-wide hidden handle.

use async_trait::async_trait;
use serde_json::Value;

use super::feed::FeedSubscription;

/// Row predicate: equality or set membership on a single column.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    In(String, Vec<Value>),
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(column.to_string(), value.into())
    }

    pub fn is_in(column: &str, values: Vec<Value>) -> Self {
        Filter::In(column.to_string(), values)
    }

    /// Whether a row satisfies this predicate. Missing columns never match.
    pub fn matches(&self, row: &Value) -> bool {
        match self {
            Filter::Eq(column, value) => row.get(column) == Some(value),
            Filter::In(column, values) => row
                .get(column)
                .map(|v| values.contains(v))
                .unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// A filtered read against one named collection.
#[derive(Debug, Clone)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
}

impl Query {
    pub fn table(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            filters: Vec::new(),
            order: None,
        }
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    pub fn is_in(mut self, column: &str, values: Vec<Value>) -> Self {
        self.filters.push(Filter::is_in(column, values));
        self
    }

    pub fn order_asc(mut self, column: &str) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            ascending: true,
        });
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            ascending: false,
        });
        self
    }
}

#[derive(Debug, Clone)]
pub enum BackendError {
    /// The query or mutation itself was rejected by the service.
    Query(String),
    /// The service could not be reached.
    Connection(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::Query(msg) => write!(f, "query rejected: {}", msg),
            BackendError::Connection(msg) => write!(f, "connection failed: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

/// Capability surface of the managed backend: query/mutate plus the change
/// feed. Blob storage is consumed by components outside this layer and is
/// deliberately absent here.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Filtered read returning the raw row set.
    async fn fetch(&self, query: Query) -> Result<Vec<Value>, BackendError>;

    /// Count of rows matching the filters.
    async fn count(&self, collection: &str, filters: Vec<Filter>) -> Result<u64, BackendError>;

    /// Insert one row; returns the stored row with server-assigned fields.
    async fn insert(&self, collection: &str, row: Value) -> Result<Value, BackendError>;

    /// Patch every row matching the filters with the given object's fields.
    async fn update(
        &self,
        collection: &str,
        filters: Vec<Filter>,
        patch: Value,
    ) -> Result<(), BackendError>;

    /// Open a change-feed subscription on a collection, optionally filtered by
    /// one equality predicate. Events arrive in commit order for the scope.
    async fn subscribe(&self, collection: &str, filter: Option<Filter>) -> FeedSubscription;
}
