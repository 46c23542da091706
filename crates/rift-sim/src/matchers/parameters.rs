//! Query string and form data matching.
//!
//! Both matchers share the same rule set:
//!
//! - No declared parameters: the request must carry none.
//! - Otherwise every declared key must be present, and either declare no
//!   values (any value, or none at all, is accepted) or share at least one
//!   value with the request.

use super::{MatcherKind, RequestMatcher};
use crate::request::{Parameters, RequestContext};
use async_trait::async_trait;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq)]
struct ParameterMatch {
    expected: Parameters,
}

impl ParameterMatch {
    fn new<I, K, V>(params: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut expected = Parameters::default();
        for (key, value) in params {
            expected.push(key.into(), value.map(Into::into));
        }
        Self { expected }
    }

    fn matches(&self, actual: &Parameters) -> bool {
        if self.expected.is_empty() {
            return actual.is_empty();
        }

        self.expected.iter().all(|(key, values)| match actual.get(key) {
            None => false,
            Some(actual_values) => {
                values.is_empty() || actual_values.iter().any(|v| values.contains(v))
            }
        })
    }

    fn render(&self) -> String {
        if self.expected.is_empty() {
            return "(none)".to_string();
        }
        let mut parts = Vec::new();
        for (key, values) in self.expected.iter() {
            if values.is_empty() {
                parts.push(key.to_string());
            }
            for value in values {
                parts.push(format!("{key}={value}"));
            }
        }
        parts.join("&")
    }
}

/// Matches query string parameters of the request URI.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryStringMatcher {
    inner: ParameterMatch,
}

impl QueryStringMatcher {
    /// Declared parameters; a `None` value accepts any value for the key.
    pub fn new<I, K, V>(params: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            inner: ParameterMatch::new(params),
        }
    }

    /// Parse declared parameters from `a=1&b` syntax.
    pub fn parse(query: &str) -> Self {
        Self {
            inner: ParameterMatch {
                expected: Parameters::parse(query),
            },
        }
    }

    /// Requires the request to have no query string parameters.
    pub fn none() -> Self {
        Self {
            inner: ParameterMatch::default(),
        }
    }
}

#[async_trait]
impl RequestMatcher for QueryStringMatcher {
    async fn is_match(&self, ctx: &RequestContext) -> bool {
        self.inner.matches(ctx.query())
    }

    fn kind(&self) -> MatcherKind {
        MatcherKind::QueryString
    }

    fn is_exclusive(&self) -> bool {
        self.inner.expected.is_empty()
    }
}

impl fmt::Display for QueryStringMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QueryString: {}", self.inner.render())
    }
}

/// Matches urlencoded form fields of the request body.
#[derive(Debug, Clone, PartialEq)]
pub struct FormDataMatcher {
    inner: ParameterMatch,
}

impl FormDataMatcher {
    pub fn new<I, K, V>(params: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            inner: ParameterMatch::new(params),
        }
    }

    pub fn parse(form: &str) -> Self {
        Self {
            inner: ParameterMatch {
                expected: Parameters::parse(form),
            },
        }
    }

    /// Requires the request to carry no form fields.
    pub fn none() -> Self {
        Self {
            inner: ParameterMatch::default(),
        }
    }
}

#[async_trait]
impl RequestMatcher for FormDataMatcher {
    async fn is_match(&self, ctx: &RequestContext) -> bool {
        self.inner.matches(ctx.form())
    }

    fn kind(&self) -> MatcherKind {
        MatcherKind::FormData
    }

    fn is_exclusive(&self) -> bool {
        self.inner.expected.is_empty()
    }
}

impl fmt::Display for FormDataMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FormData: {}", self.inner.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matchers::test_support::{get, request};

    #[tokio::test]
    async fn test_query_none_mode() {
        let matcher = QueryStringMatcher::none();
        assert!(matcher.is_exclusive());
        assert!(matcher.is_match(&get("http://localhost/a")).await);
        assert!(!matcher.is_match(&get("http://localhost/a?x=1")).await);
        assert_eq!(matcher.to_string(), "QueryString: (none)");
    }

    #[tokio::test]
    async fn test_query_value_overlap() {
        let matcher = QueryStringMatcher::new([("tag", Some("a")), ("tag", Some("b"))]);
        assert!(!matcher.is_exclusive());
        assert!(matcher.is_match(&get("http://localhost/?tag=b&tag=z")).await);
        assert!(!matcher.is_match(&get("http://localhost/?tag=z")).await);
        assert!(!matcher.is_match(&get("http://localhost/?other=a")).await);
    }

    #[tokio::test]
    async fn test_query_null_value_accepts_any() {
        let matcher = QueryStringMatcher::new([("flag", None::<String>)]);
        assert!(matcher.is_match(&get("http://localhost/?flag")).await);
        assert!(matcher.is_match(&get("http://localhost/?flag=on")).await);
        assert!(!matcher.is_match(&get("http://localhost/?other")).await);
        assert!(!matcher.is_match(&get("http://localhost/")).await);
    }

    #[tokio::test]
    async fn test_query_parse_extra_params_allowed() {
        let matcher = QueryStringMatcher::parse("page=2&sort");
        assert!(matcher.is_match(&get("http://localhost/?sort=asc&page=2&x=1")).await);
        assert_eq!(matcher.to_string(), "QueryString: page=2&sort");
    }

    #[tokio::test]
    async fn test_form_data() {
        let matcher = FormDataMatcher::parse("user=bob");
        let form = request(
            "POST",
            "http://localhost/login",
            &[("Content-Type", "application/x-www-form-urlencoded")],
            "user=bob&pass=x",
        );
        let json = request(
            "POST",
            "http://localhost/login",
            &[("Content-Type", "application/json")],
            "user=bob",
        );
        assert!(matcher.is_match(&form).await);
        assert!(!matcher.is_match(&json).await);

        let none = FormDataMatcher::none();
        assert!(none.is_match(&json).await);
        assert!(!none.is_match(&form).await);
    }
}
