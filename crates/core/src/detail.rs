//! State helpers for the game detail and purchase page.
//!
//! All of these are small value types owned by the frontend; none of them
//! touch the network or persist anything.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::{
    models::{Game, PricedItem},
    pricing::line_total,
};

/// Number of stars in a rating display.
pub const MAX_STARS: usize = 5;

/// Position inside a game's image gallery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GalleryCursor {
    index: usize,
    len: usize,
}

impl GalleryCursor {
    /// Cursor over a gallery with `len` images.
    pub fn new(len: usize) -> Self {
        Self { index: 0, len }
    }

    /// Current image index.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Gallery size.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the gallery has no images.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether there is more than one image to cycle through.
    pub fn can_cycle(&self) -> bool {
        self.len > 1
    }

    /// Advance, wrapping to the first image.
    pub fn next(&mut self) {
        if self.can_cycle() {
            self.index = (self.index + 1) % self.len;
        }
    }

    /// Step back, wrapping to the last image.
    pub fn prev(&mut self) {
        if self.can_cycle() {
            self.index = (self.index + self.len - 1) % self.len;
        }
    }

    /// Jump to `index`; out-of-range values are ignored.
    pub fn select(&mut self, index: usize) {
        if index < self.len {
            self.index = index;
        }
    }

    /// Image at the cursor, if any.
    pub fn current<'a>(&self, images: &'a [String]) -> Option<&'a str> {
        images.get(self.index).map(String::as_str)
    }
}

/// Purchase quantity bounded to `1..=max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quantity {
    value: u32,
    max: u32,
}

impl Quantity {
    /// Quantity of one with the given upper bound.
    pub fn new(max: u32) -> Self {
        Self {
            value: 1,
            max: max.max(1),
        }
    }

    /// Current value.
    pub fn get(&self) -> u32 {
        self.value
    }

    /// Add one unless already at the maximum. Returns whether it changed.
    pub fn increment(&mut self) -> bool {
        if self.value < self.max {
            self.value += 1;
            true
        } else {
            false
        }
    }

    /// Remove one unless already at one. Returns whether it changed.
    pub fn decrement(&mut self) -> bool {
        if self.value > 1 {
            self.value -= 1;
            true
        } else {
            false
        }
    }
}

/// Filled stars for a 0-5 rating: the rating rounded down.
pub fn star_count(rating: f64) -> usize {
    if !rating.is_finite() || rating <= 0.0 {
        return 0;
    }
    (rating.floor() as usize).min(MAX_STARS)
}

/// Payment options offered at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// Credit card.
    CreditCard,
    /// Instant bank transfer.
    Pix,
    /// Bank slip.
    Boleto,
}

impl PaymentMethod {
    /// All methods in display order.
    pub const ALL: [PaymentMethod; 3] = [
        PaymentMethod::CreditCard,
        PaymentMethod::Pix,
        PaymentMethod::Boleto,
    ];

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "Credit card",
            PaymentMethod::Pix => "Pix",
            PaymentMethod::Boleto => "Boleto",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Reasons a checkout cannot be confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PurchaseError {
    /// No payment method was chosen.
    #[error("select a payment method before confirming")]
    MissingPaymentMethod,
}

/// A pending checkout for one game.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseOrder {
    /// Game identifier.
    pub game_id: String,
    /// Game title.
    pub game_name: String,
    /// Base price per copy.
    pub list_price: f64,
    /// Discount applied to every copy.
    pub discount_percent: u32,
    /// Copies to buy.
    pub quantity: u32,
    /// Chosen payment method.
    pub method: Option<PaymentMethod>,
}

impl PurchaseOrder {
    /// Start a checkout for `quantity` copies of `game`.
    pub fn new(game: &Game, quantity: Quantity) -> Self {
        Self {
            game_id: game.id.clone(),
            game_name: game.name.clone(),
            list_price: game.price(),
            discount_percent: game.discount_percent(),
            quantity: quantity.get(),
            method: None,
        }
    }

    /// Discounted price per copy.
    pub fn unit_price(&self) -> f64 {
        self.discounted_price()
    }

    /// Order total.
    pub fn total(&self) -> f64 {
        line_total(self.list_price, self.discount_percent, self.quantity)
    }

    /// Acknowledge the order. Nothing is charged or stored.
    pub fn confirm(&self) -> Result<PurchaseAck, PurchaseError> {
        let method = self.method.ok_or(PurchaseError::MissingPaymentMethod)?;
        info!(
            game_id = %self.game_id,
            quantity = self.quantity,
            method = %method,
            "Purchase acknowledged"
        );
        Ok(PurchaseAck {
            game_name: self.game_name.clone(),
            quantity: self.quantity,
            total: self.total(),
            method,
        })
    }
}

impl PricedItem for PurchaseOrder {
    fn price(&self) -> f64 {
        self.list_price
    }

    fn discount_percent(&self) -> u32 {
        self.discount_percent
    }
}

/// Stub acknowledgement returned by [`PurchaseOrder::confirm`].
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseAck {
    /// Game title.
    pub game_name: String,
    /// Copies bought.
    pub quantity: u32,
    /// Amount due.
    pub total: f64,
    /// Payment method used.
    pub method: PaymentMethod,
}

impl PurchaseAck {
    /// Confirmation message shown to the buyer.
    pub fn message(&self) -> String {
        format!(
            "Purchase complete: {} cop{} of {}",
            self.quantity,
            if self.quantity == 1 { "y" } else { "ies" },
            self.game_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn game() -> Game {
        serde_json::from_value(json!({
            "CodJogo": "g-1",
            "Nome": "Sky Harbor",
            "Preco": 80.0,
            "Desconto": 25
        }))
        .expect("game decodes")
    }

    #[test]
    fn gallery_wraps_both_ways() {
        let mut cursor = GalleryCursor::new(3);
        cursor.prev();
        assert_eq!(cursor.index(), 2);
        cursor.next();
        assert_eq!(cursor.index(), 0);
        cursor.next();
        cursor.next();
        cursor.next();
        assert_eq!(cursor.index(), 0);
    }

    #[test]
    fn single_image_gallery_does_not_move() {
        let mut cursor = GalleryCursor::new(1);
        cursor.next();
        cursor.prev();
        assert_eq!(cursor.index(), 0);
        assert!(!cursor.can_cycle());

        let mut empty = GalleryCursor::new(0);
        empty.next();
        assert!(empty.current(&[]).is_none());
    }

    #[test]
    fn gallery_select_ignores_out_of_range() {
        let images = vec!["a".to_string(), "b".to_string()];
        let mut cursor = GalleryCursor::new(images.len());
        cursor.select(1);
        assert_eq!(cursor.current(&images), Some("b"));
        cursor.select(7);
        assert_eq!(cursor.index(), 1);
    }

    #[test]
    fn quantity_is_bounded() {
        let mut quantity = Quantity::new(3);
        assert!(!quantity.decrement());
        assert_eq!(quantity.get(), 1);
        assert!(quantity.increment());
        assert!(quantity.increment());
        assert!(!quantity.increment());
        assert_eq!(quantity.get(), 3);

        let mut degenerate = Quantity::new(0);
        assert!(!degenerate.increment());
        assert_eq!(degenerate.get(), 1);
    }

    #[test]
    fn stars_round_down_and_clamp() {
        assert_eq!(star_count(0.0), 0);
        assert_eq!(star_count(3.9), 3);
        assert_eq!(star_count(5.0), 5);
        assert_eq!(star_count(7.2), 5);
        assert_eq!(star_count(-1.0), 0);
        assert_eq!(star_count(f64::NAN), 0);
    }

    #[test]
    fn purchase_requires_payment_method() {
        let mut quantity = Quantity::new(10);
        quantity.increment();
        let mut order = PurchaseOrder::new(&game(), quantity);
        assert_eq!(order.list_price, 80.0);
        assert_eq!(order.unit_price(), 60.0);
        assert_eq!(order.total(), 120.0);
        assert_eq!(order.confirm(), Err(PurchaseError::MissingPaymentMethod));

        order.method = Some(PaymentMethod::Pix);
        let ack = order.confirm().expect("order confirms");
        assert_eq!(ack.quantity, 2);
        assert_eq!(ack.total, 120.0);
        assert_eq!(ack.message(), "Purchase complete: 2 copies of Sky Harbor");
    }
}
