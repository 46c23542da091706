//! The mock engine: setup registration, dispatch and verification.

use crate::behaviors::{NetworkLatency, ResponseBuilder};
use crate::config::{EngineConfig, StubConfig, StubResponseConfig};
use crate::dispatch::Dispatcher;
use crate::error::MockError;
use crate::fluent::{matching, ConfiguredRequest, RequestMatching};
use crate::ledger::InvokedRequest;
use crate::request::HttpRequest;
use crate::response::HttpResponse;
use crate::services::ServiceMap;
use crate::setup::Setup;
use crate::verify::{verify_invocations, verify_no_other, verify_setups, CountPolicy};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// In-process stand-in for an HTTP transport.
///
/// Cloning is cheap; clones share setups and the ledger.
///
/// ```ignore
/// let engine = MockEngine::new();
/// engine.when(|m| m.method("POST").uri("/orders"))?
///     .respond(|r| r.status(201))?;
/// let response = engine.send(request).await?;
/// engine.verify(|m| m.method("POST"), CountPolicy::once()).await?;
/// ```
#[derive(Clone)]
pub struct MockEngine {
    dispatcher: Arc<Dispatcher>,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEngine {
    pub fn new() -> Self {
        Self::with_services(ServiceMap::new())
    }

    /// Engine whose behaviors resolve collaborators from `services`.
    pub fn with_services(services: ServiceMap) -> Self {
        Self {
            dispatcher: Arc::new(Dispatcher::new(Arc::new(services))),
        }
    }

    /// Engine preloaded from configuration.
    pub fn from_config(config: &EngineConfig) -> Result<Self, MockError> {
        let mut services = ServiceMap::new();
        services.insert(config.json.clone());
        let engine = Self::with_services(services);

        if config.fallback != Default::default() {
            let fallback = &config.fallback;
            engine.fallback().respond(|r| {
                r.status(fallback.status_code);
                if let Some(body) = &fallback.body {
                    r.text(body.clone());
                }
                r
            })?;
        }

        for stub in &config.stubs {
            engine.register_stub(stub)?;
        }
        info!("Loaded {} stub(s) from configuration", config.stubs.len());
        Ok(engine)
    }

    /// Register a setup for requests accepted by `configure`.
    ///
    /// The setup is live immediately: until it is given a response, a
    /// matching dispatch fails with
    /// [`DispatchError::NoResponseConfigured`](crate::DispatchError::NoResponseConfigured).
    pub fn when<F>(&self, configure: F) -> Result<ConfiguredRequest, MockError>
    where
        F: FnOnce(&mut RequestMatching) -> &mut RequestMatching,
    {
        let setup = Arc::new(Setup::new(matching(configure)?));
        self.dispatcher.register(setup.clone());
        Ok(ConfiguredRequest::new(setup))
    }

    /// The setup used when nothing else matches. It answers 404 until
    /// configured otherwise.
    pub fn fallback(&self) -> ConfiguredRequest {
        ConfiguredRequest::new(self.dispatcher.fallback())
    }

    /// Serve `request`. The body must already be fully buffered.
    pub async fn dispatch(
        &self,
        request: HttpRequest,
        cancel: CancellationToken,
    ) -> Result<HttpResponse, MockError> {
        self.dispatcher.dispatch(request, cancel).await
    }

    /// [`MockEngine::dispatch`] without cancellation.
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse, MockError> {
        self.dispatch(request, CancellationToken::new()).await
    }

    /// Check how many recorded requests match `configure`. An empty
    /// configuration counts every request. Returns the count.
    pub async fn verify<F>(&self, configure: F, policy: CountPolicy) -> Result<usize, MockError>
    where
        F: FnOnce(&mut RequestMatching) -> &mut RequestMatching,
    {
        self.verify_inner(configure, policy, None).await
    }

    /// [`MockEngine::verify`] with a reason included in the failure message.
    pub async fn verify_because<F>(
        &self,
        configure: F,
        policy: CountPolicy,
        reason: &str,
    ) -> Result<usize, MockError>
    where
        F: FnOnce(&mut RequestMatching) -> &mut RequestMatching,
    {
        self.verify_inner(configure, policy, Some(reason)).await
    }

    /// Require every registered setup to be satisfied.
    pub fn verify_all(&self) -> Result<(), MockError> {
        let setups = self.dispatcher.setups();
        verify_setups(&setups, &self.ledger())?;
        Ok(())
    }

    /// Require every setup marked verifiable to be satisfied.
    pub fn verify_verifiable(&self) -> Result<(), MockError> {
        let setups = self.dispatcher.setups();
        let verifiable = setups.iter().filter(|setup| setup.is_verifiable());
        verify_setups(verifiable, &self.ledger())?;
        Ok(())
    }

    /// Require every recorded request to have been covered by an earlier
    /// verification.
    pub fn verify_no_other_requests(&self) -> Result<(), MockError> {
        verify_no_other(&self.ledger())?;
        Ok(())
    }

    /// Remove every setup and recorded request.
    pub fn reset(&self) {
        self.dispatcher.reset();
    }

    /// Snapshot of recorded requests in completion order.
    pub fn ledger(&self) -> Vec<Arc<InvokedRequest>> {
        self.dispatcher.ledger().snapshot()
    }

    /// Registered setups in registration order.
    pub fn setups(&self) -> Vec<Arc<Setup>> {
        self.dispatcher.setups()
    }

    async fn verify_inner<F>(
        &self,
        configure: F,
        policy: CountPolicy,
        reason: Option<&str>,
    ) -> Result<usize, MockError>
    where
        F: FnOnce(&mut RequestMatching) -> &mut RequestMatching,
    {
        let matchers = matching(configure)?;
        let entries = self.ledger();
        let count = verify_invocations(
            &entries,
            self.dispatcher.services(),
            &matchers,
            policy,
            reason,
        )
        .await?;
        Ok(count)
    }

    fn register_stub(&self, stub: &StubConfig) -> Result<(), MockError> {
        let configured = self.when(|m| {
            if let Some(method) = &stub.method {
                m.method(method);
            }
            if let Some(uri) = &stub.uri {
                m.uri(uri);
            }
            for (name, value) in &stub.headers {
                m.header(name, value);
            }
            if let Some(query) = &stub.query {
                m.query_string(query);
            }
            if let Some(body) = &stub.body {
                m.body(body.clone());
            }
            if let Some(partial) = &stub.partial_body {
                m.partial_body(partial.clone());
            }
            m
        })?;
        let configured = if stub.verifiable {
            configured.verifiable()
        } else {
            configured
        };

        let mut responses = stub.responses.iter();
        let Some(first) = responses.next() else {
            return Ok(());
        };
        let mut responded = configured.respond(|r| apply_response(r, first))?;
        for response in responses {
            responded = responded.respond(|r| apply_response(r, response))?;
        }
        Ok(())
    }
}

fn apply_response<'a>(
    builder: &'a mut ResponseBuilder,
    config: &StubResponseConfig,
) -> &'a mut ResponseBuilder {
    if let Some(code) = config.status_code {
        builder.status(code);
    }
    if let Some(body) = &config.body {
        builder.text(body.clone());
    }
    for (name, value) in &config.headers {
        builder.header(name, value);
    }
    if let Some(ms) = config.latency_ms {
        builder.latency(NetworkLatency::around(Duration::from_millis(ms)));
    }
    if let Some(bits) = config.bit_rate {
        builder.transfer_rate(bits);
    }
    if let Some(ms) = config.timeout_ms {
        builder.timeout(Duration::from_millis(ms));
    }
    builder
}
