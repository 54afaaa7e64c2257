//! Discount arithmetic.
//!
//! Only the numeric core lives here; currency rendering belongs to the
//! frontend.

/// Apply a percentage discount to `price`.
///
/// No rounding is performed. `discount_percent` is expected within
/// `0..=100`; values outside that range are not validated.
pub fn apply_discount(price: f64, discount_percent: u32) -> f64 {
    price * (1.0 - f64::from(discount_percent) / 100.0)
}

/// Total for `quantity` units at the discounted price.
pub fn line_total(price: f64, discount_percent: u32, quantity: u32) -> f64 {
    apply_discount(price, discount_percent) * f64::from(quantity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_discount_is_identity() {
        for price in [0.0, 0.99, 59.9, 249.0] {
            assert_eq!(apply_discount(price, 0), price);
        }
    }

    #[test]
    fn full_discount_is_free() {
        for price in [0.0, 0.99, 59.9, 249.0] {
            assert_eq!(apply_discount(price, 100), 0.0);
        }
    }

    #[test]
    fn partial_discount_is_not_rounded() {
        let discounted = apply_discount(19.99, 15);
        assert!((discounted - 16.9915).abs() < 1e-12);
    }

    #[test]
    fn line_total_multiplies_discounted_price() {
        let total = line_total(50.0, 10, 3);
        assert!((total - 135.0).abs() < 1e-9);
    }
}
