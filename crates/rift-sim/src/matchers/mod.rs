//! Request matchers and the matcher set attached to each setup.
//!
//! Every matcher tests one aspect of a [`RequestContext`]. A setup's
//! [`MatcherSet`] requires all of its matchers to agree (implicit AND).
//!
//! # Module Structure
//!
//! - `uri` - request URI (exact, relative, wildcard or pattern)
//! - `method` / `version` - HTTP method and protocol version
//! - `header` - header presence and values
//! - `parameters` - query string and urlencoded form data
//! - `body` - full and partial body content
//! - `logical` - any-of and negation
//! - `predicate` - arbitrary closures
//! - `set` - ordered matcher collection with exclusivity validation

mod body;
mod header;
mod logical;
mod method;
mod parameters;
mod predicate;
mod set;
mod uri;
mod version;

pub use body::{BodyMatcher, PartialBodyMatcher};
pub use header::HeaderMatcher;
pub use logical::{AnyOfMatcher, NotMatcher};
pub use method::MethodMatcher;
pub use parameters::{FormDataMatcher, QueryStringMatcher};
pub use predicate::PredicateMatcher;
pub use set::MatcherSet;
pub use uri::UriMatcher;
pub use version::VersionMatcher;

use crate::request::RequestContext;
use async_trait::async_trait;
use std::fmt;

/// Matcher family, used for exclusivity checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatcherKind {
    Uri,
    Method,
    Header,
    QueryString,
    FormData,
    Body,
    PartialBody,
    Version,
    AnyOf,
    Not,
    Predicate,
}

/// A single request condition.
///
/// `Display` renders the human-readable description used in verification
/// failures.
#[async_trait]
pub trait RequestMatcher: fmt::Display + Send + Sync {
    /// Test the request. The body in `ctx` is already buffered.
    async fn is_match(&self, ctx: &RequestContext) -> bool;

    fn kind(&self) -> MatcherKind;

    /// Exclusive matchers cannot share a set with another matcher of the
    /// same kind.
    fn is_exclusive(&self) -> bool {
        false
    }
}
