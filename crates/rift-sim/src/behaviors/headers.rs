//! Headers behavior - apply explicit response headers.

use super::{BehaviorKind, Next, ResponseBehavior};
use crate::error::{ConfigError, MockError};
use crate::request::{parse_headers, RequestContext};
use crate::response::HttpResponse;
use async_trait::async_trait;
use hyper::header::{HeaderName, HeaderValue};
use std::collections::HashSet;

/// Sets response headers. Each configured name replaces whatever an
/// earlier stage (content, for instance) put there.
#[derive(Debug, Clone, Default)]
pub struct HeadersBehavior {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl HeadersBehavior {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `Name: value` lines. Comma-separated values become
    /// separate header entries.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut behavior = Self::new();
        for (name, values) in parse_headers(text)? {
            for value in values {
                behavior.push(&name, &value)?;
            }
        }
        Ok(behavior)
    }

    pub fn push(&mut self, name: &str, value: &str) -> Result<(), ConfigError> {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ConfigError::InvalidHeader(name.to_string()))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|_| ConfigError::InvalidHeader(format!("{name}: {value}")))?;
        self.headers.push((header_name, header_value));
        Ok(())
    }

    /// Append every entry of `other`.
    pub fn extend(&mut self, other: HeadersBehavior) {
        self.headers.extend(other.headers);
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

#[async_trait]
impl ResponseBehavior for HeadersBehavior {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Headers
    }

    async fn handle(
        &self,
        ctx: &RequestContext,
        response: &mut HttpResponse,
        next: Next<'_>,
    ) -> Result<(), MockError> {
        let headers = response.headers_mut();
        let mut replaced = HashSet::new();
        for (name, value) in &self.headers {
            if replaced.insert(name.clone()) {
                headers.insert(name.clone(), value.clone());
            } else {
                headers.append(name.clone(), value.clone());
            }
        }
        next.run(ctx, response).await
    }
}
