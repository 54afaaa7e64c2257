//! Catalog access: REST client, background sync and the in-memory store.

/// HTTP client for the catalog backend.
pub mod client;
/// Typed errors raised by the REST client.
pub mod error;
/// In-memory catalog snapshot with search, sorting and shelves.
pub mod store;
/// Background catalog fetching.
pub mod sync;

pub use client::CatalogClient;
pub use error::CatalogError;
pub use store::{
    group_by_rating, sort_games, CatalogSnapshot, CatalogStore, RatingShelf, SortOrder,
};
pub use sync::{CatalogSync, SyncEvent};
