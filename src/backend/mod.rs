pub mod client;
pub mod feed;
pub mod memory;
pub mod types;

pub use client::{Backend, BackendError, Filter, Order, Query};
pub use feed::{ChangeKind, FeedSubscription, RowChange};
pub use memory::InMemoryBackend;
