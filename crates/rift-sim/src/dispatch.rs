//! Request dispatch: newest matching setup wins, otherwise the fallback.

use crate::behaviors::{BehaviorPipeline, StatusCodeBehavior};
use crate::error::{MockError, SimulatedFailure};
use crate::ledger::InvocationLedger;
use crate::matchers::MatcherSet;
use crate::request::{HttpRequest, RequestContext};
use crate::response::HttpResponse;
use crate::services::ServiceMap;
use crate::setup::{ResponseStrategy, Setup};
use hyper::StatusCode;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Setup registry plus the ledger it reports to.
pub struct Dispatcher {
    setups: RwLock<Vec<Arc<Setup>>>,
    fallback: RwLock<Arc<Setup>>,
    ledger: InvocationLedger,
    services: Arc<ServiceMap>,
}

impl Dispatcher {
    pub fn new(services: Arc<ServiceMap>) -> Self {
        Self {
            setups: RwLock::new(Vec::new()),
            fallback: RwLock::new(Arc::new(default_fallback())),
            ledger: InvocationLedger::new(),
            services,
        }
    }

    pub fn services(&self) -> &Arc<ServiceMap> {
        &self.services
    }

    pub fn ledger(&self) -> &InvocationLedger {
        &self.ledger
    }

    pub fn register(&self, setup: Arc<Setup>) {
        debug!("Registering setup:\n{}", setup);
        self.setups.write().push(setup);
    }

    /// Registered setups in registration order.
    pub fn setups(&self) -> Vec<Arc<Setup>> {
        self.setups.read().clone()
    }

    pub fn fallback(&self) -> Arc<Setup> {
        self.fallback.read().clone()
    }

    /// Drop every setup and ledger entry and restore the default fallback.
    pub fn reset(&self) {
        self.setups.write().clear();
        *self.fallback.write() = Arc::new(default_fallback());
        self.ledger.clear();
        info!("Dispatcher reset");
    }

    /// Newest setup whose matchers accept the request, or the fallback.
    pub async fn select(&self, ctx: &RequestContext) -> Arc<Setup> {
        let setups = self.setups();
        for setup in setups.iter().rev() {
            if setup.is_match(ctx).await {
                return setup.clone();
            }
        }
        warn!("No setup matched {} {}, using fallback", ctx.method(), ctx.uri());
        self.fallback()
    }

    /// Select a setup and produce its response.
    ///
    /// The request body must already be fully buffered. The invocation is
    /// recorded once production completes, including when it completes
    /// with a simulated failure. Completion also runs the setup callback
    /// and advances its response sequence. Cancelling `cancel` abandons
    /// production before any of that happens.
    pub async fn dispatch(
        &self,
        request: HttpRequest,
        cancel: CancellationToken,
    ) -> Result<HttpResponse, MockError> {
        let request = Arc::new(request);
        let ctx = RequestContext::new(request.clone(), self.services.clone());

        let production = async {
            let setup = self.select(&ctx).await;
            let result = setup.produce(&ctx).await;
            (setup, result)
        };

        let (setup, result) = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Dispatch of {} {} cancelled", request.method(), request.uri());
                return Err(SimulatedFailure::Cancelled.into());
            }
            outcome = production => outcome,
        };

        if completes_invocation(&result) {
            setup.complete_invocation(&request);
            self.ledger.record(setup, request);
        }
        result
    }
}

fn completes_invocation(result: &Result<HttpResponse, MockError>) -> bool {
    matches!(
        result,
        Ok(_)
            | Err(MockError::Simulated(
                SimulatedFailure::Thrown(_) | SimulatedFailure::Timeout(_)
            ))
    )
}

fn default_fallback() -> Setup {
    let mut pipeline = BehaviorPipeline::new();
    pipeline.insert(Arc::new(StatusCodeBehavior::from(StatusCode::NOT_FOUND)));
    Setup::with_default(MatcherSet::new(), ResponseStrategy::Pipeline(pipeline))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behaviors::ResponseBuilder;
    use crate::matchers::{MethodMatcher, UriMatcher};
    use bytes::Bytes;
    use hyper::Request;
    use std::time::Duration;
    use tracing_test::traced_test;

    fn setup_with_status(matchers: MatcherSet, code: u16) -> Arc<Setup> {
        let setup = Setup::new(matchers);
        let mut builder = ResponseBuilder::new();
        builder.status(code);
        setup.push_response(ResponseStrategy::Pipeline(builder.build().unwrap()));
        Arc::new(setup)
    }

    fn post(uri: &str) -> HttpRequest {
        Request::post(uri).body(Bytes::new()).unwrap()
    }

    #[tokio::test]
    async fn test_last_registered_wins() {
        let dispatcher = Dispatcher::new(Arc::new(ServiceMap::new()));
        let mut posts = MatcherSet::new();
        posts
            .add(Arc::new(MethodMatcher::parse("POST").unwrap()))
            .unwrap();
        let first = setup_with_status(posts.clone(), 201);
        let second = setup_with_status(posts, 202);
        dispatcher.register(first.clone());
        dispatcher.register(second.clone());

        let response = dispatcher
            .dispatch(post("http://localhost/"), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(first.invocation_count(), 0);
        assert_eq!(second.invocation_count(), 1);
        assert_eq!(dispatcher.ledger().len(), 1);
    }

    #[tokio::test]
    async fn test_fallback_is_404() {
        let dispatcher = Dispatcher::new(Arc::new(ServiceMap::new()));
        let mut orders = MatcherSet::new();
        orders.add(Arc::new(UriMatcher::new("/orders").unwrap())).unwrap();
        dispatcher.register(setup_with_status(orders, 200));

        let response = dispatcher
            .dispatch(post("http://localhost/users"), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(dispatcher.fallback().invocation_count(), 1);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_fallback_is_logged() {
        let dispatcher = Dispatcher::new(Arc::new(ServiceMap::new()));
        let request = Request::get("http://localhost/missing").body(Bytes::new()).unwrap();
        dispatcher
            .dispatch(request, CancellationToken::new())
            .await
            .unwrap();
        assert!(logs_contain("No setup matched GET http://localhost/missing"));
    }

    #[tokio::test]
    async fn test_cancelled_dispatch_is_not_recorded() {
        let dispatcher = Dispatcher::new(Arc::new(ServiceMap::new()));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = dispatcher
            .dispatch(post("http://localhost/"), cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, MockError::Simulated(SimulatedFailure::Cancelled)));
        assert!(dispatcher.ledger().is_empty());
        assert_eq!(dispatcher.fallback().invocation_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_latency() {
        let dispatcher = Arc::new(Dispatcher::new(Arc::new(ServiceMap::new())));
        let setup = Setup::new(MatcherSet::new());
        let mut builder = ResponseBuilder::new();
        builder.server_timeout(Duration::from_secs(30));
        setup.push_response(ResponseStrategy::Pipeline(builder.build().unwrap()));
        dispatcher.register(Arc::new(setup));

        let cancel = CancellationToken::new();
        let task = {
            let dispatcher = dispatcher.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { dispatcher.dispatch(post("http://localhost/"), cancel).await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();

        let err = task.await.unwrap().unwrap_err();
        assert!(err.is_cancellation());
        assert!(dispatcher.ledger().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_keeps_sequence_position_and_skips_callback() {
        let dispatcher = Arc::new(Dispatcher::new(Arc::new(ServiceMap::new())));
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = calls.clone();
        let setup = Arc::new(Setup::new(MatcherSet::new()));
        setup.set_callback(Arc::new(move |_| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }));
        let mut slow = ResponseBuilder::new();
        slow.status(200)
            .latency(crate::behaviors::NetworkLatency::around(Duration::from_secs(5)));
        setup.push_response(ResponseStrategy::Pipeline(slow.build().unwrap()));
        let mut failing = ResponseBuilder::new();
        failing.status(500);
        setup.push_response(ResponseStrategy::Pipeline(failing.build().unwrap()));
        dispatcher.register(setup.clone());

        let cancel = CancellationToken::new();
        let task = {
            let dispatcher = dispatcher.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { dispatcher.dispatch(post("http://localhost/"), cancel).await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
        assert!(task.await.unwrap().unwrap_err().is_cancellation());

        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert_eq!(setup.invocation_count(), 0);
        assert!(dispatcher.ledger().is_empty());

        let response = dispatcher
            .dispatch(post("http://localhost/"), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert!(!setup.is_satisfied());
    }

    #[tokio::test]
    async fn test_reset_clears_state() {
        let dispatcher = Dispatcher::new(Arc::new(ServiceMap::new()));
        dispatcher.register(setup_with_status(MatcherSet::new(), 200));
        dispatcher
            .dispatch(post("http://localhost/"), CancellationToken::new())
            .await
            .unwrap();

        dispatcher.reset();
        assert!(dispatcher.setups().is_empty());
        assert!(dispatcher.ledger().is_empty());
        let response = dispatcher
            .dispatch(post("http://localhost/"), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
