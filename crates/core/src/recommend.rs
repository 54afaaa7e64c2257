//! Price-proximity recommendations.

use std::cmp::Ordering;

use crate::models::PricedItem;

/// Return up to `k` paid items whose discounted price is closest to the
/// mean discounted price of all paid items, closest first.
///
/// Free items (`price == 0`) never take part. Items at equal distance keep
/// their input order. The input slice is left untouched.
pub fn select_closest_to_mean<T>(items: &[T], k: usize) -> Vec<T>
where
    T: PricedItem + Clone,
{
    if k == 0 {
        return Vec::new();
    }

    let paid: Vec<(&T, f64)> = items
        .iter()
        .filter(|item| !item.is_free())
        .map(|item| (item, item.discounted_price()))
        .collect();
    if paid.is_empty() {
        return Vec::new();
    }

    let mean = paid.iter().map(|(_, price)| price).sum::<f64>() / paid.len() as f64;

    let mut ranked: Vec<(&T, f64)> = paid
        .into_iter()
        .map(|(item, price)| (item, (price - mean).abs()))
        .collect();
    // `sort_by` is stable, which keeps ties in input order.
    ranked.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

    ranked
        .into_iter()
        .take(k)
        .map(|(item, _)| item.clone())
        .collect()
}

/// Mean discounted price of the paid items, if there are any.
pub fn mean_discounted_price<T: PricedItem>(items: &[T]) -> Option<f64> {
    let (sum, count) = items
        .iter()
        .filter(|item| !item.is_free())
        .fold((0.0, 0usize), |(sum, count), item| {
            (sum + item.discounted_price(), count + 1)
        });
    (count > 0).then(|| sum / count as f64)
}
