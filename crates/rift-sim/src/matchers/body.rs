//! Body content matching.
//!
//! The request body is buffered before matching starts, so both matchers
//! work directly on the [`bytes::Bytes`] held by the request.

use super::{MatcherKind, RequestMatcher};
use crate::error::ConfigError;
use crate::request::RequestContext;
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;

fn describe(content: &Bytes) -> String {
    match std::str::from_utf8(content) {
        Ok(text) => text.to_string(),
        Err(_) => format!("{} bytes", content.len()),
    }
}

/// Matches when the body equals the expected content byte for byte.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyMatcher {
    expected: Bytes,
}

impl BodyMatcher {
    pub fn new(expected: impl Into<Bytes>) -> Self {
        Self {
            expected: expected.into(),
        }
    }
}

#[async_trait]
impl RequestMatcher for BodyMatcher {
    async fn is_match(&self, ctx: &RequestContext) -> bool {
        *ctx.body() == self.expected
    }

    fn kind(&self) -> MatcherKind {
        MatcherKind::Body
    }

    fn is_exclusive(&self) -> bool {
        true
    }
}

impl fmt::Display for BodyMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Content: {}", describe(&self.expected))
    }
}

/// Matches when the body contains the given content.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialBodyMatcher {
    needle: Bytes,
}

impl PartialBodyMatcher {
    pub fn new(needle: impl Into<Bytes>) -> Result<Self, ConfigError> {
        let needle = needle.into();
        if needle.is_empty() {
            return Err(ConfigError::MissingArgument("partial content"));
        }
        Ok(Self { needle })
    }
}

#[async_trait]
impl RequestMatcher for PartialBodyMatcher {
    async fn is_match(&self, ctx: &RequestContext) -> bool {
        ctx.body()
            .windows(self.needle.len())
            .any(|window| window == self.needle.as_ref())
    }

    fn kind(&self) -> MatcherKind {
        MatcherKind::PartialBody
    }
}

impl fmt::Display for PartialBodyMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PartialContent: {}", describe(&self.needle))
    }
}
