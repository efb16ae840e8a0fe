use std::collections::HashMap;

use super::{DataStore, StoreError};
use crate::feed::FeedItem;

/// In-memory store that remembers insertion order.
///
/// Replacing an existing key keeps the record at the position of its first
/// insertion, like a JavaScript `Map`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Vec<(String, FeedItem)>,
    index: HashMap<String, usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&FeedItem> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Records in insertion order.
    pub fn records(&self) -> impl Iterator<Item = &FeedItem> {
        self.entries.iter().map(|(_, v)| v)
    }
}

impl DataStore for MemoryStore {
    async fn clear(&mut self) -> Result<(), StoreError> {
        self.entries.clear();
        self.index.clear();
        Ok(())
    }

    async fn set(&mut self, key: &str, item: &FeedItem) -> Result<(), StoreError> {
        match self.index.get(key) {
            Some(&i) => self.entries[i].1 = item.clone(),
            None => {
                self.index.insert(key.to_string(), self.entries.len());
                self.entries.push((key.to_string(), item.clone()));
            }
        }
        Ok(())
    }
}
