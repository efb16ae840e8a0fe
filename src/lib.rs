//! Fetches a Zenn user's RSS feed, validates each entry, and publishes the
//! accepted records into a [`storage::DataStore`].
//!
//! ```ignore
//! use zenn_loader::{storage::MemoryStore, ZennLoader};
//!
//! let mut store = MemoryStore::new();
//! let summary = ZennLoader::new("testuser").load(&mut store).await?;
//! println!("{} stored, {} rejected", summary.succeeded, summary.failed);
//! ```

pub mod config;
pub mod feed;
pub mod loader;
pub mod storage;
pub mod util;

pub use loader::{load_items, LoadSummary, LoaderError, ZennLoader};
