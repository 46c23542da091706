//! Fluent configuration surface.
//!
//! [`RequestMatching`] collects matchers for a setup or a verification.
//! Once a setup is registered, [`ConfiguredRequest`] offers the ways it can
//! answer; after a first answer, [`Responded`] can extend the response
//! sequence or mark the setup verifiable.

use crate::behaviors::ResponseBuilder;
use crate::error::{ConfigError, MockError, SimulatedFailure};
use crate::matchers::{
    AnyOfMatcher, BodyMatcher, FormDataMatcher, HeaderMatcher, MatcherSet, MethodMatcher,
    NotMatcher, PartialBodyMatcher, PredicateMatcher, QueryStringMatcher, RequestMatcher,
    UriMatcher, VersionMatcher,
};
use crate::pattern::Pattern;
use crate::request::{parse_headers, HttpRequest};
use crate::response::HttpResponse;
use crate::setup::{ResponseStrategy, Setup};
use bytes::Bytes;
use hyper::Version;
use std::error::Error;
use std::sync::Arc;

/// Builder for the matcher set of a setup or verification.
///
/// The first invalid matcher is remembered and reported by
/// [`RequestMatching::build`]; later calls are ignored.
#[derive(Debug, Default)]
pub struct RequestMatching {
    set: MatcherSet,
    error: Option<ConfigError>,
}

impl RequestMatching {
    pub fn new() -> Self {
        Self::default()
    }

    fn any_of() -> Self {
        Self {
            set: MatcherSet::any_of(),
            error: None,
        }
    }

    pub fn method(&mut self, method: &str) -> &mut Self {
        self.push(MethodMatcher::parse(method))
    }

    /// Exact, relative or wildcard URI, see [`UriMatcher::new`].
    pub fn uri(&mut self, uri: &str) -> &mut Self {
        self.push(UriMatcher::new(uri))
    }

    pub fn uri_pattern(&mut self, pattern: Pattern) -> &mut Self {
        self.push(Ok(UriMatcher::pattern(pattern)))
    }

    pub fn header(&mut self, name: &str, value: &str) -> &mut Self {
        self.push(HeaderMatcher::new(name, [value]))
    }

    pub fn header_pattern(&mut self, name: &str, pattern: Pattern) -> &mut Self {
        self.push(HeaderMatcher::with_patterns(name, vec![pattern]))
    }

    pub fn header_present(&mut self, name: &str) -> &mut Self {
        self.push(HeaderMatcher::present(name))
    }

    /// One header matcher per `Name: value` line. A line without values
    /// only requires the header to be present.
    pub fn headers(&mut self, text: &str) -> &mut Self {
        match parse_headers(text) {
            Ok(headers) => {
                for (name, values) in headers {
                    self.push(HeaderMatcher::new(&name, values));
                }
                self
            }
            Err(e) => self.fail(e),
        }
    }

    /// Declared parameters in `a=1&b` form.
    pub fn query_string(&mut self, query: &str) -> &mut Self {
        self.push(Ok(QueryStringMatcher::parse(query)))
    }

    /// A single query parameter; `None` accepts any value.
    pub fn query_param(&mut self, key: &str, value: Option<&str>) -> &mut Self {
        self.push(Ok(QueryStringMatcher::new([(key, value)])))
    }

    pub fn without_query_string(&mut self) -> &mut Self {
        self.push(Ok(QueryStringMatcher::none()))
    }

    /// Declared urlencoded form fields in `a=1&b` form.
    pub fn form_data(&mut self, form: &str) -> &mut Self {
        self.push(Ok(FormDataMatcher::parse(form)))
    }

    pub fn form_param(&mut self, key: &str, value: Option<&str>) -> &mut Self {
        self.push(Ok(FormDataMatcher::new([(key, value)])))
    }

    pub fn without_form_data(&mut self) -> &mut Self {
        self.push(Ok(FormDataMatcher::none()))
    }

    pub fn body(&mut self, body: impl Into<Bytes>) -> &mut Self {
        self.push(Ok(BodyMatcher::new(body)))
    }

    pub fn partial_body(&mut self, needle: impl Into<Bytes>) -> &mut Self {
        self.push(PartialBodyMatcher::new(needle))
    }

    pub fn version(&mut self, version: Version) -> &mut Self {
        self.push(Ok(VersionMatcher::new(version)))
    }

    /// Matches when any matcher added by `configure` matches.
    pub fn any<F>(&mut self, configure: F) -> &mut Self
    where
        F: FnOnce(&mut RequestMatching) -> &mut RequestMatching,
    {
        let mut nested = RequestMatching::any_of();
        configure(&mut nested);
        match nested.build() {
            Ok(set) => self.push(Ok(AnyOfMatcher::new(set))),
            Err(e) => self.fail(e),
        }
    }

    /// Matches when the matchers added by `configure` do not all match.
    pub fn not<F>(&mut self, configure: F) -> &mut Self
    where
        F: FnOnce(&mut RequestMatching) -> &mut RequestMatching,
    {
        let mut nested = RequestMatching::new();
        configure(&mut nested);
        let set = match nested.build() {
            Ok(set) => set,
            Err(e) => return self.fail(e),
        };

        let mut negated: Vec<Arc<dyn RequestMatcher>> = set
            .iter()
            .map(|m| Arc::new(NotMatcher::new(m.clone())) as Arc<dyn RequestMatcher>)
            .collect();
        match negated.len() {
            0 => self.fail(ConfigError::MissingArgument("not")),
            1 => {
                let only = negated.remove(0);
                self.with(only)
            }
            _ => {
                // not (a and b) == (not a) or (not b)
                let mut any = MatcherSet::any_of();
                for matcher in negated {
                    if let Err(e) = any.add(matcher) {
                        return self.fail(e);
                    }
                }
                self.push(Ok(AnyOfMatcher::new(any)))
            }
        }
    }

    pub fn predicate<F>(&mut self, description: &str, predicate: F) -> &mut Self
    where
        F: Fn(&HttpRequest) -> bool + Send + Sync + 'static,
    {
        self.push(Ok(PredicateMatcher::new(description, predicate)))
    }

    /// Add a prebuilt matcher.
    pub fn with(&mut self, matcher: Arc<dyn RequestMatcher>) -> &mut Self {
        if self.error.is_none() {
            if let Err(e) = self.set.add(matcher) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn build(self) -> Result<MatcherSet, ConfigError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.set),
        }
    }

    fn push<M>(&mut self, matcher: Result<M, ConfigError>) -> &mut Self
    where
        M: RequestMatcher + 'static,
    {
        match matcher {
            Ok(matcher) => self.with(Arc::new(matcher)),
            Err(e) => self.fail(e),
        }
    }

    fn fail(&mut self, err: ConfigError) -> &mut Self {
        self.error.get_or_insert(err);
        self
    }
}

/// Build a matcher set from a configuration closure.
pub(crate) fn matching<F>(configure: F) -> Result<MatcherSet, ConfigError>
where
    F: FnOnce(&mut RequestMatching) -> &mut RequestMatching,
{
    let mut matching = RequestMatching::new();
    configure(&mut matching);
    matching.build()
}

fn pipeline<F>(configure: F) -> Result<ResponseStrategy, MockError>
where
    F: FnOnce(&mut ResponseBuilder) -> &mut ResponseBuilder,
{
    let mut builder = ResponseBuilder::new();
    configure(&mut builder);
    Ok(ResponseStrategy::Pipeline(builder.build()?))
}

fn thrown<E>(error: E) -> ResponseStrategy
where
    E: Error + Send + Sync + 'static,
{
    ResponseStrategy::Throws(SimulatedFailure::Thrown(Arc::new(error)))
}

fn factory<F>(respond: F) -> ResponseStrategy
where
    F: Fn(&HttpRequest) -> HttpResponse + Send + Sync + 'static,
{
    ResponseStrategy::Factory(Arc::new(respond))
}

/// A registered setup that has no response yet.
#[derive(Debug, Clone)]
pub struct ConfiguredRequest {
    setup: Arc<Setup>,
}

impl ConfiguredRequest {
    pub(crate) fn new(setup: Arc<Setup>) -> Self {
        Self { setup }
    }

    pub fn setup(&self) -> &Arc<Setup> {
        &self.setup
    }

    /// Answer with a response assembled from behaviors.
    pub fn respond<F>(self, configure: F) -> Result<Responded, MockError>
    where
        F: FnOnce(&mut ResponseBuilder) -> &mut ResponseBuilder,
    {
        self.setup.push_response(pipeline(configure)?);
        Ok(Responded { setup: self.setup })
    }

    /// Answer with whatever `respond` builds from the request.
    pub fn respond_with<F>(self, respond: F) -> Responded
    where
        F: Fn(&HttpRequest) -> HttpResponse + Send + Sync + 'static,
    {
        self.setup.push_response(factory(respond));
        Responded { setup: self.setup }
    }

    /// Fail the dispatch with `error` instead of responding.
    pub fn throws<E>(self, error: E) -> Responded
    where
        E: Error + Send + Sync + 'static,
    {
        self.setup.push_response(thrown(error));
        Responded { setup: self.setup }
    }

    /// Run `callback` on every invocation, before the response is produced.
    pub fn callback<F>(self, callback: F) -> Self
    where
        F: Fn(&HttpRequest) + Send + Sync + 'static,
    {
        self.setup.set_callback(Arc::new(callback));
        self
    }

    pub fn verifiable(self) -> Self {
        self.setup.set_verifiable(None);
        self
    }

    pub fn verifiable_because(self, reason: impl Into<String>) -> Self {
        self.setup.set_verifiable(Some(reason.into()));
        self
    }
}

/// A setup with at least one response. Further responses queue up as a
/// sequence; the last one repeats once the sequence is exhausted.
#[derive(Debug, Clone)]
pub struct Responded {
    setup: Arc<Setup>,
}

impl Responded {
    pub fn setup(&self) -> &Arc<Setup> {
        &self.setup
    }

    pub fn respond<F>(self, configure: F) -> Result<Self, MockError>
    where
        F: FnOnce(&mut ResponseBuilder) -> &mut ResponseBuilder,
    {
        self.setup.push_response(pipeline(configure)?);
        Ok(self)
    }

    pub fn respond_with<F>(self, respond: F) -> Self
    where
        F: Fn(&HttpRequest) -> HttpResponse + Send + Sync + 'static,
    {
        self.setup.push_response(factory(respond));
        self
    }

    pub fn throws<E>(self, error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        self.setup.push_response(thrown(error));
        self
    }

    pub fn callback<F>(self, callback: F) -> Self
    where
        F: Fn(&HttpRequest) + Send + Sync + 'static,
    {
        self.setup.set_callback(Arc::new(callback));
        self
    }

    pub fn verifiable(self) -> Self {
        self.setup.set_verifiable(None);
        self
    }

    pub fn verifiable_because(self, reason: impl Into<String>) -> Self {
        self.setup.set_verifiable(Some(reason.into()));
        self
    }
}
