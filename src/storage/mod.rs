//! Record stores the loader publishes into.
//!
//! The pipeline only depends on the [`DataStore`] trait. Two stores ship
//! with the crate:
//!
//! - [`MemoryStore`] - insertion-ordered map, used by embedders and tests
//! - [`SqliteStore`] - rows in a SQLite [`Database`], one scope per source

mod items;
mod memory;
mod schema;
mod types;

use std::future::Future;

use crate::feed::FeedItem;

pub use items::SqliteStore;
pub use memory::MemoryStore;
pub use schema::Database;
pub use types::{DatabaseError, StoreError, StoredItem};

/// Capability the loader needs from a record store.
///
/// A store is scoped to one source: `clear` discards everything previously
/// published for it, and `set` inserts or replaces one record by key. During
/// a refresh the loader calls `clear` exactly once, then `set` once per
/// accepted entry, in feed order.
///
/// Stores provide no locking. Two refreshes of the same source running at
/// once can interleave their `clear` and `set` calls; callers serialize them.
pub trait DataStore {
    /// Discards every record in this store's scope.
    fn clear(&mut self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Inserts `item` under `key`, replacing any record already stored there.
    fn set(
        &mut self,
        key: &str,
        item: &FeedItem,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
