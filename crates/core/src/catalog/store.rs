use std::{cmp::Ordering, sync::Arc};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::{
    models::{AgeRating, Game, PricedItem},
    recommend::select_closest_to_mean,
};

/// Everything fetched for one storefront session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    /// Games in backend order.
    pub games: Vec<Game>,
    /// Age ratings in backend order.
    pub age_ratings: Vec<AgeRating>,
    /// When the snapshot was fetched; `None` before the first fetch.
    pub fetched_at: Option<DateTime<Utc>>,
    /// Backend URL the snapshot came from.
    pub source: String,
}

/// Games that share an age rating, shown as one carousel.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingShelf {
    /// The shared rating.
    pub rating: AgeRating,
    /// Games with that rating, in catalog order.
    pub games: Vec<Game>,
}

/// Listing orders offered by the store screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Backend order.
    #[default]
    Catalog,
    /// Alphabetical by name.
    Name,
    /// Cheapest discounted price first.
    PriceLowHigh,
    /// Most expensive discounted price first.
    PriceHighLow,
    /// Largest discount first.
    BiggestDiscount,
}

impl SortOrder {
    /// Next order in the cycle.
    pub fn next(self) -> Self {
        match self {
            SortOrder::Catalog => SortOrder::Name,
            SortOrder::Name => SortOrder::PriceLowHigh,
            SortOrder::PriceLowHigh => SortOrder::PriceHighLow,
            SortOrder::PriceHighLow => SortOrder::BiggestDiscount,
            SortOrder::BiggestDiscount => SortOrder::Catalog,
        }
    }

    /// Label for the status bar.
    pub fn label(self) -> &'static str {
        match self {
            SortOrder::Catalog => "catalog order",
            SortOrder::Name => "name",
            SortOrder::PriceLowHigh => "price: low to high",
            SortOrder::PriceHighLow => "price: high to low",
            SortOrder::BiggestDiscount => "biggest discount",
        }
    }
}

/// Sort `games` in place. The sort is stable.
pub fn sort_games(games: &mut [Game], order: SortOrder) {
    let by_price = |a: &Game, b: &Game| {
        a.discounted_price()
            .partial_cmp(&b.discounted_price())
            .unwrap_or(Ordering::Equal)
    };
    match order {
        SortOrder::Catalog => {}
        SortOrder::Name => games.sort_by_key(|game| game.name.to_lowercase()),
        SortOrder::PriceLowHigh => games.sort_by(by_price),
        SortOrder::PriceHighLow => games.sort_by(|a, b| by_price(b, a)),
        SortOrder::BiggestDiscount => {
            games.sort_by(|a, b| b.discount_percent.cmp(&a.discount_percent))
        }
    }
}

/// One shelf per age rating, in rating order. Ratings without games are
/// left out.
pub fn group_by_rating(age_ratings: &[AgeRating], games: &[Game]) -> Vec<RatingShelf> {
    age_ratings
        .iter()
        .filter_map(|rating| {
            let shelf_games: Vec<Game> = games
                .iter()
                .filter(|game| game.age_rating_code.as_deref() == Some(rating.code.as_str()))
                .cloned()
                .collect();
            (!shelf_games.is_empty()).then(|| RatingShelf {
                rating: rating.clone(),
                games: shelf_games,
            })
        })
        .collect()
}

/// Thread-safe handle to the current catalog snapshot.
#[derive(Clone, Default)]
pub struct CatalogStore {
    inner: Arc<RwLock<CatalogSnapshot>>,
}

impl CatalogStore {
    /// Empty store; populated by [`CatalogStore::replace`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a freshly fetched snapshot.
    pub fn replace(&self, snapshot: CatalogSnapshot) {
        *self.inner.write() = snapshot;
    }

    /// Whether a fetch has completed.
    pub fn is_loaded(&self) -> bool {
        self.inner.read().fetched_at.is_some()
    }

    /// Timestamp of the current snapshot.
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.inner.read().fetched_at
    }

    /// Number of games in the catalog.
    pub fn game_count(&self) -> usize {
        self.inner.read().games.len()
    }

    /// All games in backend order.
    pub fn games(&self) -> Vec<Game> {
        self.inner.read().games.clone()
    }

    /// Look up a game by id.
    pub fn game(&self, id: &str) -> Option<Game> {
        self.inner
            .read()
            .games
            .iter()
            .find(|game| game.id == id)
            .cloned()
    }

    /// All age ratings in backend order.
    pub fn age_ratings(&self) -> Vec<AgeRating> {
        self.inner.read().age_ratings.clone()
    }

    /// Filter games using a case-insensitive substring search over name,
    /// genres and categories.
    pub fn games_matching(&self, query: &str) -> Vec<Game> {
        let needle = query.trim().to_lowercase();
        let inner = self.inner.read();
        if needle.is_empty() {
            return inner.games.clone();
        }
        inner
            .games
            .iter()
            .filter(|game| game.matches(&needle))
            .cloned()
            .collect()
    }

    /// Age-rating shelves for the carousel screen.
    pub fn shelves(&self) -> Vec<RatingShelf> {
        let inner = self.inner.read();
        group_by_rating(&inner.age_ratings, &inner.games)
    }

    /// Up to `k` paid games priced closest to the catalog average.
    pub fn recommendations(&self, k: usize) -> Vec<Game> {
        select_closest_to_mean(&self.inner.read().games, k)
    }
}
