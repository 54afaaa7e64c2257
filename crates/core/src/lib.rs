#![warn(clippy::all, missing_docs)]

//! Core domain logic for the GameStore storefront.
//!
//! This crate hosts the catalog data models, the pure pricing,
//! recommendation and windowing helpers, detail-page state, the REST
//! catalog client and the in-memory catalog store used by the terminal
//! storefront and any future frontends.

pub mod catalog;
pub mod config;
pub mod detail;
pub mod models;
pub mod pricing;
pub mod recommend;
pub mod window;

pub use catalog::{CatalogClient, CatalogError, CatalogSnapshot, CatalogStore, CatalogSync};
pub use config::AppConfig;
pub use models::{AgeRating, Game, GameDetail, PricedItem, Requirements};
pub use pricing::apply_discount;
pub use recommend::select_closest_to_mean;
pub use window::PageWindow;
