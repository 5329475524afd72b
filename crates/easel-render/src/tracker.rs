#![forbid(unsafe_code)]

//! Frame-to-frame delta state.
//!
//! The tracker remembers just enough of the previous frame to compute what
//! changed: the viewport origin (for scroll deltas) and the selection rect
//! set (for invalidation unions). The previous viewport starts out absent
//! rather than zeroed; "never painted" and "scrolled to origin" are
//! different states and conflating them would fabricate a scroll on the
//! first frame.

use easel_core::geometry::{Delta, Rect, Viewport};

/// Previous-frame state for scroll and selection reconciliation.
#[derive(Debug, Default)]
pub struct DeltaTracker {
    previous_viewport: Option<Viewport>,
    previous_selection: Vec<Rect>,
}

impl DeltaTracker {
    /// A tracker that has never seen a frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare `current` against the stored viewport and return the scroll
    /// delta (previous origin minus current origin).
    ///
    /// The stored viewport is replaced unconditionally, zero delta or not.
    /// The first call always reports zero.
    pub fn reconcile(&mut self, current: Viewport) -> Delta {
        let delta = match self.previous_viewport {
            Some(previous) => current.delta_from(&previous),
            None => Delta::ZERO,
        };
        self.previous_viewport = Some(current);
        delta
    }

    /// The selection rect set recorded by the last
    /// [`replace_selection`](Self::replace_selection), buffer-absolute.
    pub fn previous_selection(&self) -> &[Rect] {
        &self.previous_selection
    }

    /// Store `current` as the new previous selection, returning the old
    /// set. Retained only long enough to compute the invalidation union.
    pub fn replace_selection(&mut self, current: Vec<Rect>) -> Vec<Rect> {
        std::mem::replace(&mut self.previous_selection, current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use easel_core::geometry::Point;

    #[test]
    fn first_reconcile_is_zero_even_off_origin() {
        let mut tracker = DeltaTracker::new();
        let view = Viewport::new(Point::new(0, 10), 80, 24);
        assert_eq!(tracker.reconcile(view), Delta::ZERO);
    }

    #[test]
    fn reconcile_reports_previous_minus_current() {
        let mut tracker = DeltaTracker::new();
        tracker.reconcile(Viewport::new(Point::new(0, 0), 80, 24));
        let delta = tracker.reconcile(Viewport::new(Point::new(0, 3), 80, 24));
        assert_eq!(delta, Delta::new(0, -3));
    }

    #[test]
    fn reconcile_updates_even_on_zero_delta() {
        let mut tracker = DeltaTracker::new();
        let view = Viewport::new(Point::new(5, 5), 80, 24);
        tracker.reconcile(view);
        assert_eq!(tracker.reconcile(view), Delta::ZERO);
        // A later move is measured against the most recent frame.
        let delta = tracker.reconcile(Viewport::new(Point::new(5, 8), 80, 24));
        assert_eq!(delta, Delta::new(0, -3));
    }

    #[test]
    fn replace_selection_returns_old_set() {
        let mut tracker = DeltaTracker::new();
        let first = vec![Rect::new(0, 5, 10, 5)];
        assert!(tracker.replace_selection(first.clone()).is_empty());
        let old = tracker.replace_selection(Vec::new());
        assert_eq!(old, first);
        assert!(tracker.previous_selection().is_empty());
    }
}
