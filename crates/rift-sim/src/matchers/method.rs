//! HTTP method matching.

use super::{MatcherKind, RequestMatcher};
use crate::error::ConfigError;
use crate::request::RequestContext;
use async_trait::async_trait;
use hyper::Method;
use std::fmt;

/// Matches the request method exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodMatcher {
    method: Method,
}

impl MethodMatcher {
    pub fn new(method: Method) -> Self {
        Self { method }
    }

    /// Parse a method token such as `"POST"`.
    pub fn parse(method: &str) -> Result<Self, ConfigError> {
        if method.is_empty() {
            return Err(ConfigError::MissingArgument("method"));
        }
        Method::from_bytes(method.as_bytes())
            .map(Self::new)
            .map_err(|_| ConfigError::InvalidMethod(method.to_string()))
    }
}

#[async_trait]
impl RequestMatcher for MethodMatcher {
    async fn is_match(&self, ctx: &RequestContext) -> bool {
        *ctx.method() == self.method
    }

    fn kind(&self) -> MatcherKind {
        MatcherKind::Method
    }

    fn is_exclusive(&self) -> bool {
        true
    }
}

impl fmt::Display for MethodMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Method: {}", self.method)
    }
}
