use axum::http::HeaderMap;
use regex::Regex;

/// Header the browser extension uses to report the page it is filling in.
pub const TAB_URL_HEADER: &str = "tab-url";

const ORIGIN_HEADER: &str = "origin";

/// Decides which callers may take a passcode.
#[derive(Debug, Clone)]
pub enum OriginPolicy {
    /// Every caller is allowed, with or without a context header.
    Any,
    /// The caller's context must be present and match the pattern.
    Pattern(Regex),
}

impl OriginPolicy {
    pub fn from_pattern(pattern: Option<Regex>) -> Self {
        pattern.map_or(Self::Any, Self::Pattern)
    }

    pub fn allows(&self, origin: Option<&str>) -> bool {
        match self {
            Self::Any => true,
            Self::Pattern(pattern) => origin.is_some_and(|origin| pattern.is_match(origin)),
        }
    }
}

/// Extracts the caller's context: `Tab-Url`, falling back to `Origin`.
///
/// Headers that are not valid visible ASCII are treated as absent.
pub fn request_origin(headers: &HeaderMap) -> Option<&str> {
    [TAB_URL_HEADER, ORIGIN_HEADER]
        .into_iter()
        .find_map(|name| headers.get(name).and_then(|value| value.to_str().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn any_allows_missing_origin() {
        assert!(OriginPolicy::Any.allows(None));
        assert!(OriginPolicy::from_pattern(None).allows(Some("https://anything")));
    }

    #[test]
    fn pattern_requires_a_match() {
        let pattern = Regex::new(r"^https://shb\.ais\.ucla\.edu/").unwrap();
        let policy = OriginPolicy::from_pattern(Some(pattern));
        assert!(policy.allows(Some("https://shb.ais.ucla.edu/idp/profile/SAML2")));
        assert!(!policy.allows(Some("https://evil.example/shb.ais.ucla.edu/")));
        assert!(!policy.allows(None));
    }

    #[test]
    fn tab_url_wins_over_origin() {
        let mut headers = HeaderMap::new();
        headers.insert("origin", HeaderValue::from_static("moz-extension://abc"));
        assert_eq!(request_origin(&headers), Some("moz-extension://abc"));

        headers.insert("tab-url", HeaderValue::from_static("https://example.com/"));
        assert_eq!(request_origin(&headers), Some("https://example.com/"));
    }
}
