//! Ordered matcher collection owned by a setup.

use super::RequestMatcher;
use crate::error::ConfigError;
use crate::request::RequestContext;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// All matchers of one setup. A request matches when every member matches.
///
/// Inserting a matcher validates exclusivity: an exclusive matcher cannot
/// join a set that already holds one of the same kind, and no matcher can
/// join one whose existing same-kind member is exclusive. Sets nested in
/// an any-of matcher skip the check.
#[derive(Clone)]
pub struct MatcherSet {
    matchers: Vec<Arc<dyn RequestMatcher>>,
    validate: bool,
}

impl Default for MatcherSet {
    fn default() -> Self {
        Self::new()
    }
}

impl MatcherSet {
    pub fn new() -> Self {
        Self {
            matchers: Vec::new(),
            validate: true,
        }
    }

    /// A subordinate set evaluated as OR, without exclusivity validation.
    pub fn any_of() -> Self {
        Self {
            matchers: Vec::new(),
            validate: false,
        }
    }

    /// Add a matcher. Adding the same instance twice is a no-op.
    pub fn add(&mut self, matcher: Arc<dyn RequestMatcher>) -> Result<(), ConfigError> {
        if self.matchers.iter().any(|m| Arc::ptr_eq(m, &matcher)) {
            return Ok(());
        }

        if self.validate {
            let kind = matcher.kind();
            let conflict = self.matchers.iter().find(|existing| {
                existing.kind() == kind && (matcher.is_exclusive() || existing.is_exclusive())
            });
            if let Some(existing) = conflict {
                return Err(ConfigError::ConflictingMatcher {
                    added: matcher.to_string(),
                    existing: existing.to_string(),
                });
            }
        }

        self.matchers.push(matcher);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn RequestMatcher>> {
        self.matchers.iter()
    }

    /// AND over all members, evaluated in insertion order. An empty set
    /// matches every request.
    pub async fn is_match(&self, ctx: &RequestContext) -> bool {
        for matcher in &self.matchers {
            if !matcher.is_match(ctx).await {
                debug!("Matcher did not match: {}", matcher);
                return false;
            }
        }
        true
    }

    /// OR over all members. An empty set matches nothing.
    pub async fn is_any_match(&self, ctx: &RequestContext) -> bool {
        for matcher in &self.matchers {
            if matcher.is_match(ctx).await {
                return true;
            }
        }
        false
    }
}

impl fmt::Display for MatcherSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.matchers.is_empty() {
            return f.write_str("(any request)");
        }
        for (index, matcher) in self.matchers.iter().enumerate() {
            if index > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{matcher}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for MatcherSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatcherSet")
            .field("matchers", &self.to_string())
            .field("validate", &self.validate)
            .finish()
    }
}
