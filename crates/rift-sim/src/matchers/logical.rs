//! Logical matchers: any-of and negation.

use super::set::MatcherSet;
use super::{MatcherKind, RequestMatcher};
use crate::request::RequestContext;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Matches when at least one of the nested matchers matches.
///
/// The nested set is built without exclusivity validation, so several
/// matchers of the same kind may sit side by side.
#[derive(Clone)]
pub struct AnyOfMatcher {
    set: MatcherSet,
}

impl AnyOfMatcher {
    pub fn new(set: MatcherSet) -> Self {
        Self { set }
    }

    pub fn matchers(&self) -> &MatcherSet {
        &self.set
    }
}

#[async_trait]
impl RequestMatcher for AnyOfMatcher {
    async fn is_match(&self, ctx: &RequestContext) -> bool {
        self.set.is_any_match(ctx).await
    }

    fn kind(&self) -> MatcherKind {
        MatcherKind::AnyOf
    }
}

impl fmt::Display for AnyOfMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Any:")?;
        for matcher in self.set.iter() {
            write!(f, "\n  {matcher}")?;
        }
        Ok(())
    }
}

/// Inverts another matcher.
#[derive(Clone)]
pub struct NotMatcher {
    inner: Arc<dyn RequestMatcher>,
}

impl NotMatcher {
    pub fn new(inner: Arc<dyn RequestMatcher>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl RequestMatcher for NotMatcher {
    async fn is_match(&self, ctx: &RequestContext) -> bool {
        !self.inner.is_match(ctx).await
    }

    fn kind(&self) -> MatcherKind {
        MatcherKind::Not
    }
}

impl fmt::Display for NotMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Not {}", self.inner)
    }
}
