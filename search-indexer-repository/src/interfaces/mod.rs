//! Interface definitions for the search backend.
//!
//! This module defines the abstract `SearchClient` trait that works execute
//! against, allowing for swappable backend implementations.

mod search_client;

pub use search_client::SearchClient;
