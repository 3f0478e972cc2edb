//! Insertion Order Module
//!
//! Tracks the order keys were inserted in, for first-in first-out eviction.

use std::collections::VecDeque;

// == Insertion Order ==
/// Tracks insertion order for FIFO eviction.
///
/// Reads never reorder keys. Re-inserting an existing key moves it to the
/// back, since its entry is replaced and its age restarts.
///
/// - Front = Oldest insertion
/// - Back = Newest insertion
#[derive(Debug, Default)]
pub struct InsertionOrder {
    /// Keys by insertion time
    order: VecDeque<String>,
}

impl InsertionOrder {
    // == Constructor ==
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self {
            order: VecDeque::new(),
        }
    }

    // == Push ==
    /// Records `key` as the newest insertion.
    pub fn push(&mut self, key: &str) {
        self.remove(key);
        self.order.push_back(key.to_string());
    }

    // == Remove ==
    /// Stops tracking `key`; a no-op for unknown keys.
    pub fn remove(&mut self, key: &str) {
        self.order.retain(|k| k != key);
    }

    // == Pop Oldest ==
    /// Returns and removes the oldest inserted key, or None if empty.
    pub fn pop_oldest(&mut self) -> Option<String> {
        self.order.pop_front()
    }

    // == Peek Oldest ==
    /// The next key eviction would take, without removing it.
    pub fn peek_oldest(&self) -> Option<&String> {
        self.order.front()
    }

    // == Clear ==
    /// Forgets every tracked key.
    pub fn clear(&mut self) {
        self.order.clear();
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    // == Iterate ==
    /// Keys from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.order.iter()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_oldest_in_insertion_order() {
        let mut order = InsertionOrder::new();

        order.push("a");
        order.push("b");
        order.push("c");

        assert_eq!(order.pop_oldest(), Some("a".to_string()));
        assert_eq!(order.pop_oldest(), Some("b".to_string()));
        assert_eq!(order.len(), 1);
    }

    #[test]
    fn test_pop_empty() {
        let mut order = InsertionOrder::new();
        assert_eq!(order.pop_oldest(), None);
        assert!(order.is_empty());
    }

    #[test]
    fn test_reinsert_moves_to_back() {
        let mut order = InsertionOrder::new();

        order.push("a");
        order.push("b");
        order.push("a");

        assert_eq!(order.len(), 2);
        assert_eq!(order.peek_oldest(), Some(&"b".to_string()));
    }

    #[test]
    fn test_remove_nonexistent_key() {
        let mut order = InsertionOrder::new();

        order.push("key1");
        order.remove("nonexistent");

        assert_eq!(order.len(), 1);
        assert_eq!(order.iter().collect::<Vec<_>>(), vec!["key1"]);
    }
}
