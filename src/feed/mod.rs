//! Feed retrieval and entry validation.
//!
//! - [`endpoint`] - builds the feed URL for a Zenn user
//! - [`fetcher`] - HTTP retrieval with timeout and size limits
//! - [`parser`] - RSS 2.0 (via the `rss` crate) into loosely-typed JSON entries
//! - [`item`] - strict validation of one entry into a [`FeedItem`]

mod endpoint;
mod fetcher;
mod item;
mod parser;

pub use endpoint::{build_feed_url, FeedEndpoint, RSS_FEED_PATH, ZENN_BASE_URL};
pub use fetcher::{
    fetch_feed, FeedFetchError, FetchError, FetchLimits, DEFAULT_TIMEOUT, MAX_FEED_SIZE,
};
pub use item::{
    coerce_length, item_id, process_item, validate_enclosure, validate_item, Enclosure, FeedItem,
    Issue, ValidationError,
};
pub use parser::{parse_feed, ParseError, RawFeed};
