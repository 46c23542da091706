//! Registered expectations.
//!
//! A [`Setup`] pairs a [`MatcherSet`] with the sequence of responses it
//! produces. Configuration methods take `&self` so a setup can keep being
//! configured after it has been registered with the dispatcher.

use crate::behaviors::BehaviorPipeline;
use crate::error::{DispatchError, MockError, SimulatedFailure};
use crate::matchers::MatcherSet;
use crate::request::{HttpRequest, RequestContext};
use crate::response::HttpResponse;
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

pub type ResponseFactory = Arc<dyn Fn(&HttpRequest) -> HttpResponse + Send + Sync>;
pub type Callback = Arc<dyn Fn(&HttpRequest) + Send + Sync>;

/// How one entry of a setup's response sequence is produced.
#[derive(Clone)]
pub enum ResponseStrategy {
    /// Assembled by the behavior pipeline.
    Pipeline(BehaviorPipeline),
    /// Built by a caller supplied closure.
    Factory(ResponseFactory),
    /// No response; the failure is handed back to the caller.
    Throws(SimulatedFailure),
}

impl ResponseStrategy {
    pub async fn produce(&self, ctx: &RequestContext) -> Result<HttpResponse, MockError> {
        match self {
            ResponseStrategy::Pipeline(pipeline) => pipeline.produce(ctx).await,
            ResponseStrategy::Factory(factory) => Ok(factory(ctx.request())),
            ResponseStrategy::Throws(failure) => Err(failure.clone().into()),
        }
    }
}

impl fmt::Debug for ResponseStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseStrategy::Pipeline(pipeline) => {
                f.debug_tuple("Pipeline").field(pipeline).finish()
            }
            ResponseStrategy::Factory(_) => f.write_str("Factory"),
            ResponseStrategy::Throws(failure) => f.debug_tuple("Throws").field(failure).finish(),
        }
    }
}

/// A registered expectation.
pub struct Setup {
    matchers: MatcherSet,
    responses: RwLock<Vec<Arc<ResponseStrategy>>>,
    default_response: Option<Arc<ResponseStrategy>>,
    callback: RwLock<Option<Callback>>,
    verifiable: RwLock<Option<String>>,
    invocations: AtomicUsize,
    cursor: AtomicUsize,
}

impl Setup {
    pub fn new(matchers: MatcherSet) -> Self {
        Self {
            matchers,
            responses: RwLock::new(Vec::new()),
            default_response: None,
            callback: RwLock::new(None),
            verifiable: RwLock::new(None),
            invocations: AtomicUsize::new(0),
            cursor: AtomicUsize::new(0),
        }
    }

    /// A setup that answers with `strategy` until responses are configured.
    pub fn with_default(matchers: MatcherSet, strategy: ResponseStrategy) -> Self {
        Self {
            default_response: Some(Arc::new(strategy)),
            ..Self::new(matchers)
        }
    }

    pub fn matchers(&self) -> &MatcherSet {
        &self.matchers
    }

    pub async fn is_match(&self, ctx: &RequestContext) -> bool {
        self.matchers.is_match(ctx).await
    }

    /// Append a response to the sequence.
    pub fn push_response(&self, strategy: ResponseStrategy) {
        self.responses.write().push(Arc::new(strategy));
    }

    pub fn response_count(&self) -> usize {
        self.responses.read().len()
    }

    pub fn set_callback(&self, callback: Callback) {
        *self.callback.write() = Some(callback);
    }

    /// Mark the setup for [`verify_verifiable`](crate::MockEngine::verify_verifiable).
    pub fn set_verifiable(&self, reason: Option<String>) {
        *self.verifiable.write() = Some(reason.unwrap_or_default());
    }

    pub fn is_verifiable(&self) -> bool {
        self.verifiable.read().is_some()
    }

    pub fn verify_reason(&self) -> Option<String> {
        self.verifiable
            .read()
            .as_ref()
            .filter(|reason| !reason.is_empty())
            .cloned()
    }

    /// Completed invocations.
    pub fn invocation_count(&self) -> usize {
        self.invocations.load(Ordering::Acquire)
    }

    /// Finish an invocation: run the callback, count it and move the
    /// sequence on by one entry. The last entry repeats once the sequence
    /// is exhausted.
    pub(crate) fn complete_invocation(&self, request: &HttpRequest) {
        let callback = self.callback.read().clone();
        if let Some(callback) = callback {
            callback(request);
        }

        let len = self.response_count();
        if len > 0 {
            let _ = self
                .cursor
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cursor| {
                    Some(cursor.saturating_add(1).min(len))
                });
        }
        self.invocations.fetch_add(1, Ordering::AcqRel);
    }

    /// Invoked at least once, with every queued response consumed.
    pub fn is_satisfied(&self) -> bool {
        self.invocation_count() > 0 && self.cursor.load(Ordering::Acquire) >= self.response_count()
    }

    /// Entry at the sequence position. Reading it leaves the position alone.
    fn current_response(&self) -> Option<Arc<ResponseStrategy>> {
        let responses = self.responses.read();
        if responses.is_empty() {
            return self.default_response.clone();
        }
        let position = self.cursor.load(Ordering::Acquire).min(responses.len() - 1);
        responses.get(position).cloned()
    }

    /// Produce the response at the current sequence position.
    pub async fn produce(&self, ctx: &RequestContext) -> Result<HttpResponse, MockError> {
        let strategy = self
            .current_response()
            .ok_or_else(|| DispatchError::NoResponseConfigured {
                setup: self.matchers.to_string(),
            })?;

        debug!("Producing {:?} for {} {}", strategy, ctx.method(), ctx.uri());
        strategy.produce(ctx).await
    }
}

impl fmt::Display for Setup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.matchers)
    }
}

impl fmt::Debug for Setup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setup")
            .field("matchers", &self.matchers)
            .field("responses", &self.response_count())
            .field("invocations", &self.invocation_count())
            .field("verifiable", &self.is_verifiable())
            .finish()
    }
}
