//! Cache Entry Module
//!
//! Defines the slot stored for each cached key. Slots live in a vector and
//! link to their neighbours by index, forming the recency list.

// == Cache Entry ==
/// A cached key-value pair plus its position in the recency list.
#[derive(Debug, Clone, Default)]
pub struct CacheEntry {
    /// The cached key
    pub key: i64,
    /// The cached value
    pub value: String,
    /// Slot of the next more recently used entry
    pub(crate) prev: Option<usize>,
    /// Slot of the next less recently used entry
    pub(crate) next: Option<usize>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a detached entry.
    pub fn new(key: i64, value: String) -> Self {
        Self {
            key,
            value,
            prev: None,
            next: None,
        }
    }

    /// Returns true if the entry is not linked to any neighbour.
    pub fn is_detached(&self) -> bool {
        self.prev.is_none() && self.next.is_none()
    }
}
