//! Header matching.

use super::{MatcherKind, RequestMatcher};
use crate::error::ConfigError;
use crate::pattern::Pattern;
use crate::request::RequestContext;
use async_trait::async_trait;
use hyper::header::HeaderName;
use std::fmt;

/// Matches a header by name and, optionally, by value.
///
/// With no declared values only presence is checked. Otherwise every
/// declared value must match at least one of the request's values for that
/// header. Comma separated header lines count as multiple values.
#[derive(Debug, Clone)]
pub struct HeaderMatcher {
    name: HeaderName,
    values: Vec<Pattern>,
}

impl HeaderMatcher {
    /// Presence-only matcher.
    pub fn present(name: &str) -> Result<Self, ConfigError> {
        Self::with_patterns(name, Vec::new())
    }

    /// Each value must be present (exact comparison).
    pub fn new<I, V>(name: &str, values: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let values = values.into_iter().map(Pattern::exact).collect();
        Self::with_patterns(name, values)
    }

    /// Each pattern must match at least one request value.
    pub fn with_patterns(name: &str, values: Vec<Pattern>) -> Result<Self, ConfigError> {
        if name.trim().is_empty() {
            return Err(ConfigError::MissingArgument("header name"));
        }
        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|_| ConfigError::InvalidHeader(name.to_string()))?;
        Ok(Self { name, values })
    }
}

#[async_trait]
impl RequestMatcher for HeaderMatcher {
    async fn is_match(&self, ctx: &RequestContext) -> bool {
        if self.values.is_empty() {
            return ctx.headers().contains_key(&self.name);
        }

        let mut candidates = Vec::new();
        for value in ctx.headers().get_all(&self.name) {
            let Ok(value) = value.to_str() else {
                continue;
            };
            candidates.push(value.trim());
            if value.contains(',') {
                candidates.extend(value.split(',').map(str::trim));
            }
        }

        if candidates.is_empty() {
            return false;
        }

        self.values
            .iter()
            .all(|pattern| candidates.iter().any(|c| pattern.matches(c)))
    }

    fn kind(&self) -> MatcherKind {
        MatcherKind::Header
    }
}

impl fmt::Display for HeaderMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Header: {}", self.name)?;
        if !self.values.is_empty() {
            let values: Vec<&str> = self.values.iter().map(Pattern::description).collect();
            write!(f, ": {}", values.join(", "))?;
        }
        Ok(())
    }
}
