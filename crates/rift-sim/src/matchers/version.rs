//! HTTP protocol version matching.

use super::{MatcherKind, RequestMatcher};
use crate::request::RequestContext;
use async_trait::async_trait;
use hyper::Version;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct VersionMatcher {
    version: Version,
}

impl VersionMatcher {
    pub fn new(version: Version) -> Self {
        Self { version }
    }
}

#[async_trait]
impl RequestMatcher for VersionMatcher {
    async fn is_match(&self, ctx: &RequestContext) -> bool {
        ctx.version() == self.version
    }

    fn kind(&self) -> MatcherKind {
        MatcherKind::Version
    }

    fn is_exclusive(&self) -> bool {
        true
    }
}

impl fmt::Display for VersionMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Version: {:?}", self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestContext;
    use bytes::Bytes;
    use hyper::Request;

    #[tokio::test]
    async fn test_version_matcher() {
        let matcher = VersionMatcher::new(Version::HTTP_2);
        let request = Request::builder()
            .uri("http://localhost/")
            .version(Version::HTTP_2)
            .body(Bytes::new())
            .unwrap();
        assert!(matcher.is_match(&RequestContext::from_request(request)).await);

        let request = Request::builder()
            .uri("http://localhost/")
            .body(Bytes::new())
            .unwrap();
        assert!(!matcher.is_match(&RequestContext::from_request(request)).await);
        assert_eq!(matcher.to_string(), "Version: HTTP/2.0");
    }
}
