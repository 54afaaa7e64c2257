//! Paginated windowing over ordered lists.
//!
//! A [`PageWindow`] is a plain value: callers hold the current window and
//! replace it with the result of [`PageWindow::advance`] or
//! [`PageWindow::retreat`]. The window never inspects the list it pages
//! over, so callers must rebuild it when the underlying list changes.

use serde::{Deserialize, Serialize};

/// Contiguous range `[start, start + size)` over an ordered sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageWindow {
    /// Index of the first visible item.
    pub start: usize,
    /// Number of items visible at once.
    pub size: usize,
}

impl PageWindow {
    /// Window of `size` items starting at the beginning.
    pub fn new(size: usize) -> Self {
        Self { start: 0, size }
    }

    /// Move forward by `step`, keeping `start + size <= total` where possible.
    pub fn advance(self, total: usize, step: usize) -> Self {
        let last_start = total.saturating_sub(self.size);
        Self {
            start: self.start.saturating_add(step).min(last_start),
            ..self
        }
    }

    /// Move backward by `step`, stopping at zero.
    pub fn retreat(self, step: usize) -> Self {
        Self {
            start: self.start.saturating_sub(step),
            ..self
        }
    }

    /// Visible slice of `items`, truncated at the end of the list.
    pub fn visible<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = self.start.min(items.len());
        let end = self.start.saturating_add(self.size).min(items.len());
        &items[start..end]
    }

    /// Whether there are items past the end of the window.
    pub fn can_advance(&self, total: usize) -> bool {
        self.start.saturating_add(self.size) < total
    }

    /// Whether there are items before the start of the window.
    pub fn can_retreat(&self) -> bool {
        self.start > 0
    }

    /// Absolute index of the `offset`-th visible item.
    pub fn absolute(&self, offset: usize) -> usize {
        self.start + offset
    }

    /// One-based page label such as `(2/4)`.
    pub fn page_label(&self, total: usize) -> String {
        if self.size == 0 || total == 0 {
            return "(0/0)".to_string();
        }
        let pages = total.div_ceil(self.size);
        let current = (self.start + self.size - 1) / self.size + 1;
        format!("({}/{})", current.min(pages), pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_clamps_to_last_full_page() {
        let window = PageWindow::new(5);
        let moved = window.advance(12, 5);
        assert_eq!(moved.start, 5);
        let moved = moved.advance(12, 5);
        assert_eq!(moved.start, 7);
        assert_eq!(moved.advance(12, 5).start, 7);
    }

    #[test]
    fn short_lists_cannot_advance() {
        let window = PageWindow::new(5);
        assert_eq!(window.advance(3, 5), window);
        assert_eq!(window.advance(5, 5), window);
        assert!(!window.can_advance(5));
        assert!(window.can_advance(6));
    }

    #[test]
    fn retreat_clamps_at_zero() {
        let window = PageWindow { start: 3, size: 5 };
        assert_eq!(window.retreat(5).start, 0);
        assert!(!window.retreat(5).can_retreat());
        assert!(window.can_retreat());
    }

    #[test]
    fn zero_step_is_identity() {
        let window = PageWindow { start: 4, size: 5 };
        assert_eq!(window.advance(20, 0), window);
        assert_eq!(window.retreat(0), window);
    }

    #[test]
    fn start_stays_in_bounds_for_any_sequence() {
        let total = 13;
        let size = 4;
        let mut window = PageWindow::new(size);
        let steps = [3, 7, 1, 20, 0, 2, 9, 5, 4, 11];
        for (idx, step) in steps.iter().enumerate() {
            window = if idx % 3 == 1 {
                window.retreat(*step)
            } else {
                window.advance(total, *step)
            };
            assert!(window.start <= total - size, "start {} escaped", window.start);
        }
    }

    #[test]
    fn visible_truncates_without_panicking() {
        let items: Vec<u32> = (0..7).collect();
        for start in 0..items.len() {
            let window = PageWindow { start, size: 5 };
            let visible = window.visible(&items);
            assert_eq!(visible.len(), 5.min(items.len() - start));
            assert_eq!(visible.first(), Some(&items[start]));
            assert_eq!(window.absolute(visible.len() - 1), start + visible.len() - 1);
        }
        let past_end = PageWindow { start: 9, size: 5 };
        assert!(past_end.visible(&items).is_empty());
        let empty: [u32; 0] = [];
        assert!(PageWindow::new(5).visible(&empty).is_empty());
    }

    #[test]
    fn page_labels() {
        assert_eq!(PageWindow::new(5).page_label(12), "(1/3)");
        assert_eq!(PageWindow { start: 5, size: 5 }.page_label(12), "(2/3)");
        assert_eq!(PageWindow { start: 7, size: 5 }.page_label(12), "(3/3)");
        assert_eq!(PageWindow::new(5).page_label(0), "(0/0)");
    }
}
