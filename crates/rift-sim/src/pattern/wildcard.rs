//! Wildcard to regex translation.
//!
//! `*` stands for any run of characters. A leading or trailing run leaves
//! that end of the match open, an interior run requires at least one
//! character between the surrounding literals.

use crate::error::ConfigError;

/// Compiled form of a wildcard expression.
#[derive(Debug, Clone, PartialEq)]
pub enum WildcardForm {
    /// No `*` present, compare for equality.
    Exact(String),
    /// Only `*` present, everything matches.
    Any,
    /// Anchored regex source equivalent to the wildcard.
    Regex(String),
}

/// Translate a wildcard expression into its matching form.
pub fn translate(value: &str) -> Result<WildcardForm, ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::InvalidPattern {
            pattern: value.to_string(),
            reason: "wildcard pattern cannot be empty".to_string(),
        });
    }

    if !value.contains('*') {
        return Ok(WildcardForm::Exact(value.to_string()));
    }

    let segments: Vec<&str> = value.split('*').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return Ok(WildcardForm::Any);
    }

    let mut source = String::with_capacity(value.len() + 8);
    if value.starts_with('*') {
        source.push_str(".*");
    } else {
        source.push('^');
    }

    for (index, segment) in segments.iter().enumerate() {
        if index > 0 {
            source.push_str(".+");
        }
        source.push_str(&regex::escape(segment));
    }

    if value.ends_with('*') {
        source.push_str(".*");
    } else {
        source.push('$');
    }

    Ok(WildcardForm::Regex(source))
}
