//! Client-side synchronization layer for the CollabForge hackathon platform.
//!
//! Each store mirrors one remote collection (events, team chat, teams,
//! submissions) and keeps its in-memory snapshot fresh through a combination
//! of bulk fetches and a push-based change feed. The remote data store is the
//! source of truth; stores never mutate their snapshot without either a
//! confirmed round trip or an accepted change-feed delivery.

pub mod backend;
pub mod client;
pub mod common;
