/// Origin every Zenn user feed is served from.
pub const ZENN_BASE_URL: &str = "https://zenn.dev";

/// Path suffix requesting the complete item set instead of the latest page.
pub const RSS_FEED_PATH: &str = "/feed?all=1";

/// Builds the feed URL for a Zenn user.
///
/// The user name is inserted verbatim; callers are responsible for passing
/// an identifier that is safe to embed in a URL path.
///
/// # Examples
///
/// ```
/// use zenn_loader::feed::build_feed_url;
///
/// assert_eq!(build_feed_url("testuser"), "https://zenn.dev/testuser/feed?all=1");
/// ```
pub fn build_feed_url(user_name: &str) -> String {
    FeedEndpoint::default().feed_url(user_name)
}

/// Origin the loader resolves feed URLs against.
///
/// Defaults to [`ZENN_BASE_URL`]. Overriding the origin is how the loader is
/// pointed at a mirror or at a local mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEndpoint {
    base_url: String,
}

impl FeedEndpoint {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        // "https://zenn.dev/" and "https://zenn.dev" resolve to the same feed
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns `{base}/{user_name}/feed?all=1`.
    pub fn feed_url(&self, user_name: &str) -> String {
        format!("{}/{}{}", self.base_url, user_name, RSS_FEED_PATH)
    }
}

impl Default for FeedEndpoint {
    fn default() -> Self {
        Self::new(ZENN_BASE_URL)
    }
}
