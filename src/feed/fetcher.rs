use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

use crate::feed::parser::{parse_feed, ParseError, RawFeed};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default response body limit.
pub const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Bounds applied to one feed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLimits {
    /// Upper bound on the whole request, from sending it to the last body byte.
    pub timeout: Duration,
    pub max_bytes: usize,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_bytes: MAX_FEED_SIZE,
        }
    }
}

/// What went wrong while retrieving or parsing a feed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("Status code {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the configured size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
    /// Body is not a readable RSS document
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// A failed feed retrieval, tagged with the URL that was requested.
///
/// Every cause (transport, status, size, parse) is reported through this one
/// type so callers only have to handle a single fetch failure.
#[derive(Debug, Error)]
#[error("Failed to fetch RSS feed from {url}: {source}")]
pub struct FeedFetchError {
    pub url: String,
    #[source]
    pub source: FetchError,
}

impl FeedFetchError {
    fn new(url: &str, source: FetchError) -> Self {
        Self {
            url: url.to_string(),
            source,
        }
    }
}

/// Fetches and parses the feed at `url`.
///
/// Issues a single GET request. There is no retry: a failed attempt is
/// returned to the caller, which decides whether the refresh is abandoned.
///
/// # Errors
///
/// Returns [`FeedFetchError`] wrapping one of:
/// - [`FetchError::Network`] - connection or TLS errors
/// - [`FetchError::Timeout`] - request exceeded `limits.timeout`
/// - [`FetchError::HttpStatus`] - non-2xx response
/// - [`FetchError::ResponseTooLarge`] - body exceeded `limits.max_bytes`
/// - [`FetchError::IncompleteResponse`] - body shorter than Content-Length
/// - [`FetchError::Parse`] - body is not an RSS 2.0 document
pub async fn fetch_feed(
    client: &reqwest::Client,
    url: &str,
    limits: FetchLimits,
) -> Result<RawFeed, FeedFetchError> {
    let bytes = fetch_bytes(client, url, limits)
        .await
        .map_err(|e| FeedFetchError::new(url, e))?;

    let feed = parse_feed(&bytes).map_err(|e| FeedFetchError::new(url, e.into()))?;

    tracing::debug!(
        url = %url,
        bytes = bytes.len(),
        items = feed.items.len(),
        "Fetched feed"
    );
    Ok(feed)
}

async fn fetch_bytes(
    client: &reqwest::Client,
    url: &str,
    limits: FetchLimits,
) -> Result<Vec<u8>, FetchError> {
    // One budget for the whole exchange: headers and body together
    tokio::time::timeout(limits.timeout, request_body(client, url, limits.max_bytes))
        .await
        .map_err(|_| FetchError::Timeout)?
}

async fn request_body(
    client: &reqwest::Client,
    url: &str,
    max_bytes: usize,
) -> Result<Vec<u8>, FetchError> {
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(FetchError::HttpStatus(response.status().as_u16()));
    }

    read_limited_bytes(response, max_bytes).await
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const VALID_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <item><guid>1</guid><title>Test</title></item>
</channel></rss>"#;

    #[tokio::test]
    async fn test_fetch_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/testuser/feed"))
            .and(query_param("all", "1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(VALID_RSS)
                    .insert_header("Content-Type", "application/xml"),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let url = format!("{}/testuser/feed?all=1", mock_server.uri());
        let client = reqwest::Client::new();

        let feed = fetch_feed(&client, &url, FetchLimits::default())
            .await
            .unwrap();
        assert_eq!(feed.items.len(), 1);
        assert_eq!(feed.items[0]["guid"], "1");
    }

    #[tokio::test]
    async fn test_fetch_404_wraps_url() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let url = format!("{}/nobody/feed?all=1", mock_server.uri());
        let client = reqwest::Client::new();

        let err = fetch_feed(&client, &url, FetchLimits::default())
            .await
            .unwrap_err();
        assert!(matches!(err.source, FetchError::HttpStatus(404)));
        assert_eq!(err.url, url);
        assert_eq!(
            err.to_string(),
            format!("Failed to fetch RSS feed from {}: Status code 404", url)
        );
    }

    #[tokio::test]
    async fn test_fetch_500_is_not_retried() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&mock_server)
            .await;

        let url = format!("{}/feed", mock_server.uri());
        let client = reqwest::Client::new();

        let err = fetch_feed(&client, &url, FetchLimits::default())
            .await
            .unwrap_err();
        assert!(matches!(err.source, FetchError::HttpStatus(500)));
    }

    #[tokio::test]
    async fn test_malformed_feed_parse_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<not valid xml"))
            .mount(&mock_server)
            .await;

        let url = format!("{}/feed", mock_server.uri());
        let client = reqwest::Client::new();

        let err = fetch_feed(&client, &url, FetchLimits::default())
            .await
            .unwrap_err();
        assert!(matches!(err.source, FetchError::Parse(_)));
        assert!(err.to_string().starts_with("Failed to fetch RSS feed from"));
    }

    #[tokio::test]
    async fn test_empty_feed_success() {
        let empty_rss = r#"<?xml version="1.0"?>
<rss version="2.0"><channel></channel></rss>"#;

        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(empty_rss))
            .mount(&mock_server)
            .await;

        let url = format!("{}/feed", mock_server.uri());
        let client = reqwest::Client::new();

        let feed = fetch_feed(&client, &url, FetchLimits::default())
            .await
            .unwrap();
        assert!(feed.items.is_empty());
    }

    #[tokio::test]
    async fn test_response_too_large() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(VALID_RSS))
            .mount(&mock_server)
            .await;

        let url = format!("{}/feed", mock_server.uri());
        let client = reqwest::Client::new();
        let limits = FetchLimits {
            max_bytes: 16,
            ..FetchLimits::default()
        };

        let err = fetch_feed(&client, &url, limits).await.unwrap_err();
        assert!(matches!(err.source, FetchError::ResponseTooLarge));
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(VALID_RSS)
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&mock_server)
            .await;

        let url = format!("{}/feed", mock_server.uri());
        let client = reqwest::Client::new();
        let limits = FetchLimits {
            timeout: Duration::from_millis(50),
            ..FetchLimits::default()
        };

        let err = fetch_feed(&client, &url, limits).await.unwrap_err();
        assert!(matches!(err.source, FetchError::Timeout));
        assert!(err.to_string().ends_with("Request timed out"));
    }

    #[tokio::test]
    async fn test_timeout_spans_headers_and_body() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        // Each phase stays under the limit on its own; together they exceed it
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            tokio::time::sleep(Duration::from_millis(400)).await;
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/xml\r\nContent-Length: {}\r\n\r\n",
                VALID_RSS.len()
            );
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.flush().await;
            tokio::time::sleep(Duration::from_millis(400)).await;
            let _ = socket.write_all(VALID_RSS.as_bytes()).await;
        });

        let url = format!("http://{}/feed", addr);
        let client = reqwest::Client::new();
        let limits = FetchLimits {
            timeout: Duration::from_millis(600),
            ..FetchLimits::default()
        };

        let err = fetch_feed(&client, &url, limits).await.unwrap_err();
        assert!(matches!(err.source, FetchError::Timeout));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        // Nothing listens on port 1
        let url = "http://127.0.0.1:1/feed";
        let client = reqwest::Client::new();

        let err = fetch_feed(&client, url, FetchLimits::default())
            .await
            .unwrap_err();
        assert!(matches!(err.source, FetchError::Network(_)));
        assert!(err.to_string().contains("127.0.0.1:1"));
    }

    #[test]
    fn test_parse_error_message_is_kept() {
        let err = FeedFetchError::new(
            "https://zenn.dev/x/feed?all=1",
            ParseError::Xml("unexpected end".to_string()).into(),
        );
        assert_eq!(
            err.to_string(),
            "Failed to fetch RSS feed from https://zenn.dev/x/feed?all=1: XML parse error: unexpected end"
        );
    }
}
