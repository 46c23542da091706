//! String pattern algebra used by URI and header matching.
//!
//! A [`Pattern`] is an immutable value pairing a human-readable description
//! with a match function. Patterns are built from exact strings, wildcard
//! expressions, regular expressions or arbitrary closures, and combine with
//! `!`, `&`, `|` and `^` (or the equivalent named methods).
//!
//! Combination is evaluated left to right. `and` only evaluates the right
//! operand when the left one matched, `or` only when it did not.

mod wildcard;

pub use wildcard::{translate as translate_wildcard, WildcardForm};

use crate::error::ConfigError;
use regex::Regex;
use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not};
use std::sync::Arc;

type MatchFn = dyn Fn(&str) -> bool + Send + Sync;

/// A named string predicate.
#[derive(Clone)]
pub struct Pattern {
    description: Arc<str>,
    matcher: Arc<MatchFn>,
}

impl Pattern {
    /// Matches only the given value (ordinal comparison).
    pub fn exact(value: impl Into<String>) -> Self {
        let value = value.into();
        let description = value.clone();
        Self::expression(description, move |candidate| candidate == value)
    }

    /// Matches every value.
    pub fn any() -> Self {
        Self::expression("*", |_| true)
    }

    /// Build a pattern from a wildcard expression where `*` matches any run
    /// of characters.
    pub fn wildcard(value: &str) -> Result<Self, ConfigError> {
        match wildcard::translate(value)? {
            WildcardForm::Exact(exact) => Ok(Self::exact(exact)),
            WildcardForm::Any => Ok(Self::expression(value, |_| true)),
            WildcardForm::Regex(source) => {
                let regex = compile(&source, value)?;
                Ok(Self::expression(value, move |candidate| {
                    regex.is_match(candidate)
                }))
            }
        }
    }

    /// Build a pattern from a regular expression source.
    pub fn regex(source: &str) -> Result<Self, ConfigError> {
        let regex = compile(source, source)?;
        Ok(Self::from(regex))
    }

    /// Wrap an arbitrary predicate.
    pub fn expression<F>(description: impl Into<String>, f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        let description: String = description.into();
        Self {
            description: Arc::from(description),
            matcher: Arc::new(f),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn matches(&self, candidate: &str) -> bool {
        (self.matcher)(candidate)
    }

    pub fn negate(self) -> Self {
        let description = format!("!= {}", self.description);
        Self::expression(description, move |candidate| !self.matches(candidate))
    }

    pub fn and(self, other: Pattern) -> Self {
        let description = format!("({} & {})", self.description, other.description);
        Self::expression(description, move |candidate| {
            if !self.matches(candidate) {
                return false;
            }
            other.matches(candidate)
        })
    }

    pub fn or(self, other: Pattern) -> Self {
        let description = format!("({} | {})", self.description, other.description);
        Self::expression(description, move |candidate| {
            if self.matches(candidate) {
                return true;
            }
            other.matches(candidate)
        })
    }

    /// Exclusive or. Both operands are always evaluated.
    pub fn xor(self, other: Pattern) -> Self {
        let description = format!("({} ^ {})", self.description, other.description);
        Self::expression(description, move |candidate| {
            let left = self.matches(candidate);
            let right = other.matches(candidate);
            left != right
        })
    }
}

fn compile(source: &str, shown: &str) -> Result<Regex, ConfigError> {
    Regex::new(source).map_err(|e| ConfigError::InvalidPattern {
        pattern: shown.to_string(),
        reason: e.to_string(),
    })
}

impl From<Regex> for Pattern {
    fn from(regex: Regex) -> Self {
        let description = regex.as_str().to_string();
        Self::expression(description, move |candidate| regex.is_match(candidate))
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.description).finish()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

impl Not for Pattern {
    type Output = Pattern;

    fn not(self) -> Self::Output {
        self.negate()
    }
}

impl BitAnd for Pattern {
    type Output = Pattern;

    fn bitand(self, rhs: Pattern) -> Self::Output {
        self.and(rhs)
    }
}

impl BitOr for Pattern {
    type Output = Pattern;

    fn bitor(self, rhs: Pattern) -> Self::Output {
        self.or(rhs)
    }
}

impl BitXor for Pattern {
    type Output = Pattern;

    fn bitxor(self, rhs: Pattern) -> Self::Output {
        self.xor(rhs)
    }
}
