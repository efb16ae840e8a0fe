//! Utility functions shared by the feed parser and validator.
//!
//! - **URL validation**: absolute-URL checks for item fields and endpoints
//! - **Text processing**: HTML stripping and entity decoding for previews

mod text;
mod url_validator;

pub use text::{decode_entities, html_to_snippet, strip_html};
pub use url_validator::{validate_absolute_url, validate_http_url, UrlValidationError};
