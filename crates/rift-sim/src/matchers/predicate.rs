//! Arbitrary predicate matching.

use super::{MatcherKind, RequestMatcher};
use crate::request::{HttpRequest, RequestContext};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

type PredicateFn = dyn Fn(&HttpRequest) -> bool + Send + Sync;

/// Matches when a caller supplied closure returns `true`.
#[derive(Clone)]
pub struct PredicateMatcher {
    description: String,
    predicate: Arc<PredicateFn>,
}

impl PredicateMatcher {
    pub fn new<F>(description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&HttpRequest) -> bool + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            predicate: Arc::new(predicate),
        }
    }
}

#[async_trait]
impl RequestMatcher for PredicateMatcher {
    async fn is_match(&self, ctx: &RequestContext) -> bool {
        (self.predicate)(ctx.request())
    }

    fn kind(&self) -> MatcherKind {
        MatcherKind::Predicate
    }
}

impl fmt::Display for PredicateMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expression: {}", self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matchers::test_support::get;

    #[tokio::test]
    async fn test_predicate() {
        let matcher = PredicateMatcher::new("port 8080", |req| req.uri().port_u16() == Some(8080));
        assert!(matcher.is_match(&get("http://localhost:8080/")).await);
        assert!(!matcher.is_match(&get("http://localhost/")).await);
        assert_eq!(matcher.to_string(), "Expression: port 8080");
    }
}
