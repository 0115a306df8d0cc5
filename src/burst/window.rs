//! Recency window for burst deduplication.

use std::collections::VecDeque;

/// Bounded FIFO of recently accepted burst ids.
///
/// Insertion order is the arrival order of each id's first packet; once
/// capacity is exceeded the oldest id is evicted. An id in the window can
/// never trigger delivery again, but an evicted id can — bounded memory
/// trades exactness for space, which is acceptable because burst ids are
/// short-lived.
#[derive(Debug, Clone)]
pub struct DedupWindow {
    ids: VecDeque<u32>,
    capacity: usize,
}

impl DedupWindow {
    /// Create a window holding at most `capacity` ids.
    pub fn new(capacity: usize) -> Self {
        Self {
            ids: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record the id if it is new.
    ///
    /// Returns `true` when the id was not in the window and its packet
    /// should be delivered, `false` for a duplicate.
    pub fn check_and_insert(&mut self, id: u32) -> bool {
        if self.ids.contains(&id) {
            return false;
        }
        self.ids.push_back(id);
        if self.ids.len() > self.capacity {
            self.ids.pop_front();
        }
        true
    }

    /// Whether the id is currently remembered.
    pub fn contains(&self, id: u32) -> bool {
        self.ids.contains(&id)
    }

    /// Number of remembered ids.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether no ids are remembered.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Maximum number of remembered ids.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_seen_is_delivered() {
        let mut window = DedupWindow::new(4);

        assert!(window.check_and_insert(10));
        assert!(window.contains(10));
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn test_duplicates_are_dropped() {
        let mut window = DedupWindow::new(4);

        assert!(window.check_and_insert(10));
        for _ in 0..5 {
            assert!(!window.check_and_insert(10));
        }
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn test_fifo_eviction_reenables_delivery() {
        let mut window = DedupWindow::new(2);

        assert!(window.check_and_insert(1));
        assert!(window.check_and_insert(2));
        assert!(window.check_and_insert(3)); // evicts 1

        assert!(!window.contains(1));
        assert!(window.contains(2));
        assert!(window.contains(3));

        // The evicted id is treated as new again.
        assert!(window.check_and_insert(1));
    }

    #[test]
    fn test_eviction_order_is_first_arrival() {
        let mut window = DedupWindow::new(3);

        window.check_and_insert(5);
        window.check_and_insert(6);
        // A duplicate of 5 must not refresh its position.
        window.check_and_insert(5);
        window.check_and_insert(7);
        window.check_and_insert(8); // evicts 5, the oldest first arrival

        assert!(!window.contains(5));
        assert!(window.contains(6));
        assert!(window.contains(7));
        assert!(window.contains(8));
    }

    #[test]
    fn test_stays_bounded() {
        let mut window = DedupWindow::new(8);

        for id in 0..100 {
            window.check_and_insert(id);
        }
        assert_eq!(window.len(), 8);
    }
}
