//! One full refresh of a Zenn user's feed into a [`DataStore`].
//!
//! A refresh runs four steps in order:
//!
//! 1. **Resolve** the feed URL for the user
//! 2. **Fetch** and parse the feed; a failure here aborts before the store
//!    is touched
//! 3. **Reset** the store, so entries removed upstream never linger
//! 4. **Validate & publish** each entry in feed order, skipping the ones
//!    that fail validation
//!
//! Rejected entries are logged and counted, never raised. Only fetch and
//! store failures end a refresh early.

use thiserror::Error;

use crate::feed::{fetch_feed, process_item, FeedEndpoint, FeedFetchError, FetchLimits};
use crate::storage::{DataStore, StoreError};

/// A refresh that could not complete.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// The feed could not be retrieved; the store was left untouched
    #[error(transparent)]
    Fetch(#[from] FeedFetchError),
    /// The store failed while clearing or publishing
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Outcome of a completed refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Entries that validated and were written to the store
    pub succeeded: usize,
    /// Entries rejected by validation
    pub failed: usize,
}

impl LoadSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Replaces the contents of `store` with the validated entries of
/// `user_name`'s feed.
///
/// Entries are written in feed order, keyed by `guid`. When two entries share
/// a `guid`, the later one overwrites the earlier.
///
/// # Errors
///
/// - [`LoaderError::Fetch`] if the feed cannot be fetched or parsed; the
///   store has not been modified
/// - [`LoaderError::Store`] if `clear` or `set` fails; the store may hold a
///   partial refresh
pub async fn load_items<S: DataStore>(
    store: &mut S,
    client: &reqwest::Client,
    endpoint: &FeedEndpoint,
    limits: FetchLimits,
    user_name: &str,
) -> Result<LoadSummary, LoaderError> {
    let url = endpoint.feed_url(user_name);
    let feed = fetch_feed(client, &url, limits).await?;

    store.clear().await?;

    let mut summary = LoadSummary::default();

    for raw_item in &feed.items {
        match process_item(raw_item) {
            Some(item) => {
                store.set(&item.guid, &item).await?;
                summary.succeeded += 1;
            }
            None => summary.failed += 1,
        }
    }

    if summary.failed > 0 {
        tracing::warn!(
            user = %user_name,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Processed {} items successfully, {} items failed to parse",
            summary.succeeded,
            summary.failed
        );
    } else {
        tracing::info!(
            user = %user_name,
            succeeded = summary.succeeded,
            "Loaded feed items"
        );
    }

    Ok(summary)
}

/// Loader for one Zenn user's feed.
///
/// Holds everything a refresh needs except the store, so the host can call
/// [`ZennLoader::load`] on whatever schedule it likes.
///
/// # Example
///
/// ```ignore
/// use zenn_loader::{storage::MemoryStore, ZennLoader};
///
/// let loader = ZennLoader::new("testuser");
/// let mut store = MemoryStore::new();
/// let summary = loader.load(&mut store).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ZennLoader {
    name: String,
    endpoint: FeedEndpoint,
    limits: FetchLimits,
    client: reqwest::Client,
}

impl ZennLoader {
    /// Identifier of this loader kind.
    pub const NAME: &'static str = "zenn";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: FeedEndpoint::default(),
            limits: FetchLimits::default(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: FeedEndpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn with_limits(mut self, limits: FetchLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// The Zenn user this loader refreshes.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn feed_url(&self) -> String {
        self.endpoint.feed_url(&self.name)
    }

    /// Runs one refresh into `store`, see [`load_items`].
    ///
    /// Failures are logged with the user name before being returned.
    pub async fn load<S: DataStore>(&self, store: &mut S) -> Result<LoadSummary, LoaderError> {
        load_items(store, &self.client, &self.endpoint, self.limits, &self.name)
            .await
            .inspect_err(|e| {
                tracing::error!(
                    user = %self.name,
                    error = %e,
                    "ZennLoader error for user '{}'",
                    self.name
                );
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_loader_defaults() {
        let loader = ZennLoader::new("testuser");
        assert_eq!(loader.name(), "testuser");
        assert_eq!(loader.feed_url(), "https://zenn.dev/testuser/feed?all=1");
        assert_eq!(ZennLoader::NAME, "zenn");
    }

    #[test]
    fn test_loader_custom_endpoint() {
        let loader =
            ZennLoader::new("someone").with_endpoint(FeedEndpoint::new("http://127.0.0.1:9999/"));
        assert_eq!(loader.feed_url(), "http://127.0.0.1:9999/someone/feed?all=1");
    }

    #[test]
    fn test_summary_total() {
        let summary = LoadSummary {
            succeeded: 3,
            failed: 2,
        };
        assert_eq!(summary.total(), 5);
    }

    #[tokio::test]
    async fn test_unreachable_feed_leaves_store_alone() {
        let loader =
            ZennLoader::new("testuser").with_endpoint(FeedEndpoint::new("http://127.0.0.1:1"));
        let mut store = MemoryStore::new();

        let err = loader.load(&mut store).await.unwrap_err();
        assert!(matches!(err, LoaderError::Fetch(_)));
        assert!(err
            .to_string()
            .starts_with("Failed to fetch RSS feed from http://127.0.0.1:1/testuser/feed?all=1"));
        assert!(store.is_empty());
    }
}
