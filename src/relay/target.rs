//! Target URI extraction.
//!
//! The whole raw query string is the target: `GET /proxy?https%3A%2F%2Fexample.com%2Fa%3Fb%3D1`
//! relays to `https://example.com/a?b=1`. There is no named parameter, so a
//! target's own `?` and `&` survive as long as the caller encoded them.

use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};
use url::Url;

use crate::error::RelayError;

/// Percent-decoded destination address taken from the query string.
///
/// Only presence is checked here. Whether it parses as an absolute URI is
/// discovered when the outbound call is attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUri(String);

impl TargetUri {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse as an absolute URI. Relative references are rejected.
    pub fn parse(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.0)
    }
}

impl std::fmt::Display for TargetUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extract the target from a raw (still encoded) query string.
///
/// `+` is left alone; only `%XX` escapes are decoded. Invalid UTF-8 after
/// decoding is replaced rather than rejected.
pub fn extract_target(raw_query: Option<&str>) -> Result<TargetUri, RelayError> {
    let decoded = percent_decode_str(raw_query.unwrap_or_default()).decode_utf8_lossy();
    if decoded.trim().is_empty() {
        return Err(RelayError::MissingTarget);
    }
    Ok(TargetUri(decoded.into_owned()))
}

/// Build the URL a client requests to reach `target` through the relay at
/// `relay_base` (e.g. `http://localhost:8080/proxy`).
pub fn encode_target(relay_base: &str, target: &str) -> String {
    format!(
        "{}?{}",
        relay_base.trim_end_matches('?'),
        utf8_percent_encode(target, NON_ALPHANUMERIC)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_whole_query() {
        let target = extract_target(Some("https%3A%2F%2Fexample.com%2Fa%3Fb%3D1%26c%3D2")).unwrap();
        assert_eq!(target.as_str(), "https://example.com/a?b=1&c=2");
    }

    #[test]
    fn unencoded_query_is_taken_literally() {
        let target = extract_target(Some("http://example.com/x?y=1&z=2")).unwrap();
        assert_eq!(target.as_str(), "http://example.com/x?y=1&z=2");
    }

    #[test]
    fn plus_is_not_a_space() {
        let target = extract_target(Some("http://example.com/?q=a+b")).unwrap();
        assert_eq!(target.as_str(), "http://example.com/?q=a+b");
    }

    #[test]
    fn absent_or_blank_is_missing() {
        assert!(matches!(extract_target(None), Err(RelayError::MissingTarget)));
        assert!(matches!(extract_target(Some("")), Err(RelayError::MissingTarget)));
        assert!(matches!(extract_target(Some("%20%09%20")), Err(RelayError::MissingTarget)));
        assert!(matches!(extract_target(Some("   ")), Err(RelayError::MissingTarget)));
    }

    #[test]
    fn malformed_uri_is_still_a_target() {
        let target = extract_target(Some("not%20a%20uri")).unwrap();
        assert_eq!(target.as_str(), "not a uri");
        assert!(target.parse().is_err());
    }

    #[test]
    fn encode_then_extract_recovers_target() {
        let original = "https://example.com/search?q=rust lang&page=2#frag";
        let relay_url = encode_target("http://localhost:8080/proxy", original);
        let query = relay_url.split_once('?').map(|(_, q)| q);
        assert_eq!(extract_target(query).unwrap().as_str(), original);
    }
}
