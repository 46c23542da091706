//! Request URI matching.

use super::{MatcherKind, RequestMatcher};
use crate::error::ConfigError;
use crate::pattern::Pattern;
use crate::request::RequestContext;
use async_trait::async_trait;
use hyper::Uri;
use std::fmt;

#[derive(Debug, Clone)]
enum UriTarget {
    Pattern(Pattern),
    Absolute(Uri),
    Relative(String),
}

/// Matches the request URI.
///
/// Without wildcards an absolute URI must equal the request URI, while a
/// relative one must be a trailing run of whole path segments of the
/// request path (and query, when the configured value has one).
#[derive(Debug, Clone)]
pub struct UriMatcher {
    target: UriTarget,
    display: String,
}

impl UriMatcher {
    /// Build from a URI string, treating `*` as a wildcard.
    pub fn new(uri: &str) -> Result<Self, ConfigError> {
        if uri.contains('*') {
            return Ok(Self {
                target: UriTarget::Pattern(Pattern::wildcard(uri)?),
                display: uri.to_string(),
            });
        }
        Self::exact(uri)
    }

    /// Build from a URI string, `*` is literal.
    pub fn exact(uri: &str) -> Result<Self, ConfigError> {
        let trimmed = uri.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::MissingArgument("uri"));
        }

        let parsed: Option<Uri> = trimmed.parse().ok();
        let target = match parsed {
            Some(parsed) if parsed.scheme().is_some() => UriTarget::Absolute(parsed),
            _ if trimmed.contains("://") => {
                return Err(ConfigError::InvalidUri {
                    uri: uri.to_string(),
                    reason: "absolute URI could not be parsed".to_string(),
                })
            }
            _ => UriTarget::Relative(trimmed.to_string()),
        };

        Ok(Self {
            target,
            display: trimmed.to_string(),
        })
    }

    /// Match the full request URI string against an arbitrary pattern.
    pub fn pattern(pattern: Pattern) -> Self {
        let display = pattern.description().to_string();
        Self {
            target: UriTarget::Pattern(pattern),
            display,
        }
    }
}

fn ends_on_segment(candidate: &str, relative: &str) -> bool {
    if !candidate.ends_with(relative) {
        return false;
    }
    let head = &candidate[..candidate.len() - relative.len()];
    head.is_empty() || head.ends_with('/') || relative.starts_with('/')
}

#[async_trait]
impl RequestMatcher for UriMatcher {
    async fn is_match(&self, ctx: &RequestContext) -> bool {
        let uri = ctx.uri();
        match &self.target {
            UriTarget::Pattern(pattern) => pattern.matches(&uri.to_string()),
            UriTarget::Absolute(expected) => uri == expected,
            UriTarget::Relative(relative) => {
                let candidate = if relative.contains('?') {
                    uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/")
                } else {
                    uri.path()
                };
                ends_on_segment(candidate, relative)
            }
        }
    }

    fn kind(&self) -> MatcherKind {
        MatcherKind::Uri
    }

    fn is_exclusive(&self) -> bool {
        true
    }
}

impl fmt::Display for UriMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RequestUri: '{}'", self.display)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matchers::test_support::get;

    #[tokio::test]
    async fn test_absolute_uri_exact() {
        let matcher = UriMatcher::new("http://localhost/api/users?page=1").unwrap();
        assert!(matcher.is_match(&get("http://localhost/api/users?page=1")).await);
        assert!(!matcher.is_match(&get("http://localhost/api/users?page=2")).await);
        assert!(!matcher.is_match(&get("http://localhost/api/users")).await);
    }

    #[tokio::test]
    async fn test_relative_uri_segment_boundary() {
        let matcher = UriMatcher::new("users/1").unwrap();
        assert!(matcher.is_match(&get("http://localhost/api/users/1")).await);
        assert!(matcher.is_match(&get("http://localhost/users/1?x=y")).await);
        assert!(!matcher.is_match(&get("http://localhost/api/xusers/1")).await);
        assert!(!matcher.is_match(&get("http://localhost/api/users/12")).await);

        let rooted = UriMatcher::new("/users/1").unwrap();
        assert!(rooted.is_match(&get("http://localhost/api/users/1")).await);
    }

    #[tokio::test]
    async fn test_relative_uri_with_query() {
        let matcher = UriMatcher::new("search?q=rust").unwrap();
        assert!(matcher.is_match(&get("http://localhost/v1/search?q=rust")).await);
        assert!(!matcher.is_match(&get("http://localhost/v1/search?q=go")).await);
    }

    #[tokio::test]
    async fn test_wildcard_uri() {
        let matcher = UriMatcher::new("http://localhost/api/*").unwrap();
        assert!(matcher.is_match(&get("http://localhost/api/users")).await);
        assert!(!matcher.is_match(&get("http://remote/api/users")).await);
    }

    #[tokio::test]
    async fn test_exact_treats_star_literally() {
        let matcher = UriMatcher::exact("/files/*").unwrap();
        assert!(!matcher.is_match(&get("http://localhost/files/a")).await);
    }

    #[test]
    fn test_empty_uri_rejected() {
        assert!(matches!(
            UriMatcher::new("  "),
            Err(ConfigError::MissingArgument("uri"))
        ));
    }

    #[test]
    fn test_display() {
        let matcher = UriMatcher::new("/api/*").unwrap();
        assert_eq!(matcher.to_string(), "RequestUri: '/api/*'");
        assert!(matcher.is_exclusive());
    }
}
