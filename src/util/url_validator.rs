use thiserror::Error;
use url::Url;

/// Errors that can occur during URL validation.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed as an absolute URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
}

/// Validates that `url_str` is an absolute URL.
///
/// Any scheme is accepted as long as the string parses on its own, without a
/// base to resolve against. Relative references such as `/articles/1` or
/// bare words such as `not-a-url` are rejected.
///
/// # Examples
///
/// ```
/// use zenn_loader::util::validate_absolute_url;
///
/// assert!(validate_absolute_url("https://zenn.dev/articles/x").is_ok());
/// assert!(validate_absolute_url("not-a-valid-url").is_err());
/// ```
pub fn validate_absolute_url(url_str: &str) -> Result<Url, UrlValidationError> {
    Ok(Url::parse(url_str)?)
}

/// Validates a URL the loader is going to issue HTTP requests against.
///
/// On top of [`validate_absolute_url`], only `http` and `https` are allowed.
pub fn validate_http_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = validate_absolute_url(url_str)?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_urls_accepted() {
        assert!(validate_absolute_url("https://example.com/image.png").is_ok());
        assert!(validate_absolute_url("http://localhost:3000/feed").is_ok());
        assert!(validate_absolute_url("mailto:someone@example.com").is_ok());
    }

    #[test]
    fn test_relative_urls_rejected() {
        assert!(validate_absolute_url("/articles/1").is_err());
        assert!(validate_absolute_url("not-a-valid-url").is_err());
        assert!(validate_absolute_url("").is_err());
    }

    #[test]
    fn test_http_only_for_requests() {
        assert!(validate_http_url("https://zenn.dev").is_ok());
        assert!(validate_http_url("http://127.0.0.1:8080").is_ok());
        assert!(matches!(
            validate_http_url("ftp://zenn.dev"),
            Err(UrlValidationError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            validate_http_url("zenn.dev"),
            Err(UrlValidationError::InvalidUrl(_))
        ));
    }
}
