//! Presentation formatting kept apart from the pricing arithmetic.

use gamestore_core::{
    detail::{star_count, MAX_STARS},
    models::{Game, PricedItem},
};

/// Render an amount as Brazilian reais, e.g. `R$ 1234,50`.
pub fn format_brl(value: f64) -> String {
    format!("R$ {}", format!("{value:.2}").replace('.', ","))
}

/// Pieces of a listing card's price line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceTag {
    /// Struck-through base price, only when discounted.
    pub original: Option<String>,
    /// Discount badge such as `-20%`.
    pub badge: Option<String>,
    /// Price the buyer pays, or `Free`.
    pub current: String,
    /// Whether the game costs nothing.
    pub free: bool,
}

impl PriceTag {
    pub fn for_game(game: &Game) -> Self {
        if game.is_free() {
            return Self {
                original: None,
                badge: None,
                current: "Free".to_string(),
                free: true,
            };
        }
        let discounted = game.has_discount();
        Self {
            original: discounted.then(|| format_brl(game.price)),
            badge: discounted.then(|| format!("-{}%", game.discount_percent)),
            current: format_brl(game.discounted_price()),
            free: false,
        }
    }
}

/// `★★★☆☆` for a 3.x rating.
pub fn stars(rating: Option<f64>) -> String {
    let filled = star_count(rating.unwrap_or(0.0));
    format!("{}{}", "★".repeat(filled), "☆".repeat(MAX_STARS - filled))
}

/// Release date as `dd/mm/yyyy`.
pub fn release_label(game: &Game) -> String {
    game.release_day()
        .map(|day| day.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| "Date unavailable".to_string())
}

/// Comma-joined list, or `fallback` when empty.
pub fn join_or(items: &[String], fallback: &str) -> String {
    if items.is_empty() {
        fallback.to_string()
    } else {
        items.join(", ")
    }
}

/// Cut `text` to `width` characters, marking the cut with `…`.
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut cut: String = text.chars().take(width - 1).collect();
    cut.push('…');
    cut
}
