//! Request snapshot and context handed to matchers and behaviors.
//!
//! The transport adapter buffers the body into [`Bytes`] before dispatch, so
//! every matcher can read it as often as it needs without coordination.

use crate::error::ConfigError;
use crate::services::ServiceMap;
use bytes::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::{HeaderMap, Method, Request, Uri, Version};
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Immutable request snapshot with a fully buffered body.
pub type HttpRequest = Request<Bytes>;

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Ordered multi-valued key/value parameters (query string or form data).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    entries: Vec<(String, Vec<String>)>,
}

impl Parameters {
    /// Parse `a=1&b=2&a=3&flag` style input. Keys without `=` are kept with
    /// no values.
    pub fn parse(input: &str) -> Self {
        let mut params = Parameters::default();
        let input = input.strip_prefix('?').unwrap_or(input);
        for pair in input.split('&').filter(|p| !p.is_empty()) {
            match pair.split_once('=') {
                Some((key, value)) => params.push(decode(key), Some(decode(value))),
                None => params.push(decode(pair), None),
            }
        }
        params
    }

    /// Append a value (or just the key) preserving first-seen key order.
    pub fn push(&mut self, key: String, value: Option<String>) {
        let index = match self.entries.iter().position(|(k, _)| *k == key) {
            Some(index) => index,
            None => {
                self.entries.push((key, Vec::new()));
                self.entries.len() - 1
            }
        };
        if let Some(value) = value {
            self.entries[index].1.push(value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, values)| values.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, values)| (k.as_str(), values.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

/// Parse `Name: value1, value2` lines into header entries.
pub fn parse_headers(text: &str) -> Result<Vec<(String, Vec<String>)>, ConfigError> {
    let mut headers = Vec::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let (name, values) = line
            .split_once(':')
            .ok_or_else(|| ConfigError::InvalidHeader(line.to_string()))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ConfigError::InvalidHeader(line.to_string()));
        }
        let values = values
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect();
        headers.push((name.to_string(), values));
    }
    Ok(headers)
}

struct ContextInner {
    request: Arc<HttpRequest>,
    services: Arc<ServiceMap>,
    query: OnceCell<Parameters>,
    form: OnceCell<Parameters>,
}

/// Request plus engine services, shared by every matcher and behavior
/// involved in one dispatch.
#[derive(Clone)]
pub struct RequestContext {
    inner: Arc<ContextInner>,
}

impl RequestContext {
    pub fn new(request: Arc<HttpRequest>, services: Arc<ServiceMap>) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                request,
                services,
                query: OnceCell::new(),
                form: OnceCell::new(),
            }),
        }
    }

    /// Context with no services, mostly useful in tests.
    pub fn from_request(request: HttpRequest) -> Self {
        Self::new(Arc::new(request), Arc::new(ServiceMap::new()))
    }

    pub fn request(&self) -> &HttpRequest {
        &self.inner.request
    }

    pub fn shared_request(&self) -> Arc<HttpRequest> {
        self.inner.request.clone()
    }

    pub fn services(&self) -> &ServiceMap {
        &self.inner.services
    }

    pub fn method(&self) -> &Method {
        self.inner.request.method()
    }

    pub fn uri(&self) -> &Uri {
        self.inner.request.uri()
    }

    pub fn version(&self) -> Version {
        self.inner.request.version()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.request.headers()
    }

    pub fn body(&self) -> &Bytes {
        self.inner.request.body()
    }

    /// Parsed query string, computed on first use.
    pub fn query(&self) -> &Parameters {
        self.inner
            .query
            .get_or_init(|| Parameters::parse(self.uri().query().unwrap_or_default()))
    }

    /// Parsed urlencoded form body, empty for any other content type.
    pub fn form(&self) -> &Parameters {
        self.inner.form.get_or_init(|| {
            let is_form = self
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim().to_ascii_lowercase().starts_with(FORM_URLENCODED))
                .unwrap_or(false);
            if is_form {
                Parameters::parse(&String::from_utf8_lossy(self.body()))
            } else {
                Parameters::default()
            }
        })
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", self.method())
            .field("uri", self.uri())
            .field("body_len", &self.body().len())
            .finish()
    }
}
