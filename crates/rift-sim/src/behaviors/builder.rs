//! Fluent assembly of a behavior pipeline.

use super::{
    BehaviorPipeline, ContentBehavior, HeadersBehavior, LatencyBehavior, NetworkLatency,
    ResponseBehavior, StatusCodeBehavior, TimeoutBehavior, TransferRateBehavior,
};
use crate::error::{ConfigError, MockError};
use crate::response::ContentStream;
use crate::stream::BitRate;
use bytes::Bytes;
use hyper::StatusCode;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Fluent construction of a [`BehaviorPipeline`].
///
/// Setters record the first configuration error and ignore later calls;
/// [`ResponseBuilder::build`] reports it.
#[derive(Debug, Default)]
pub struct ResponseBuilder {
    pipeline: BehaviorPipeline,
    headers: HeadersBehavior,
    content_type: Option<String>,
    error: Option<MockError>,
}

impl ResponseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&mut self, code: u16) -> &mut Self {
        self.record(StatusCodeBehavior::new(code))
    }

    /// Raw body without a content type.
    pub fn body(&mut self, body: impl Into<Bytes>) -> &mut Self {
        self.content(ContentBehavior::bytes(body))
    }

    /// UTF-8 text body, `text/plain` unless overridden.
    pub fn text(&mut self, text: impl Into<String>) -> &mut Self {
        self.content(ContentBehavior::text(text))
    }

    /// JSON body serialized from any `Serialize` value.
    pub fn json<T: Serialize>(&mut self, value: &T) -> &mut Self {
        match serde_json::to_value(value) {
            Ok(value) => self.content(ContentBehavior::json(value)),
            Err(e) => self.fail(ConfigError::InvalidContent(e.to_string()).into()),
        }
    }

    /// Body read from a new stream for every response.
    pub fn stream<F, S>(&mut self, factory: F) -> &mut Self
    where
        F: Fn() -> S + Send + Sync + 'static,
        S: ContentStream + 'static,
    {
        self.content(ContentBehavior::stream(factory))
    }

    pub fn content_type(&mut self, media_type: &str) -> &mut Self {
        self.content_type = Some(media_type.to_string());
        self
    }

    pub fn header(&mut self, name: &str, value: &str) -> &mut Self {
        if self.error.is_none() {
            if let Err(e) = self.headers.push(name, value) {
                self.error = Some(e.into());
            }
        }
        self
    }

    /// Headers from `Name: value` lines.
    pub fn headers(&mut self, text: &str) -> &mut Self {
        match HeadersBehavior::parse(text) {
            Ok(parsed) => {
                self.headers.extend(parsed);
                self
            }
            Err(e) => self.fail(e.into()),
        }
    }

    pub fn latency(&mut self, latency: NetworkLatency) -> &mut Self {
        self.insert(Arc::new(LatencyBehavior::new(latency)))
    }

    pub fn transfer_rate(&mut self, bit_rate: impl Into<BitRate>) -> &mut Self {
        self.record(TransferRateBehavior::new(bit_rate).map_err(ConfigError::Stream))
    }

    /// Fail with a simulated timeout after `after` instead of responding.
    pub fn timeout(&mut self, after: Duration) -> &mut Self {
        self.record(TimeoutBehavior::new(after))
    }

    /// Same as [`ResponseBuilder::timeout`]: the client gives up waiting.
    pub fn client_timeout(&mut self, after: Duration) -> &mut Self {
        self.timeout(after)
    }

    /// Respond `408 Request Timeout` once `after` has elapsed.
    pub fn server_timeout(&mut self, after: Duration) -> &mut Self {
        self.insert(Arc::new(StatusCodeBehavior::from(
            StatusCode::REQUEST_TIMEOUT,
        )));
        self.latency(NetworkLatency::around(after))
    }

    /// Register any behavior, replacing the one of the same kind.
    pub fn behavior(&mut self, behavior: Arc<dyn ResponseBehavior>) -> &mut Self {
        self.insert(behavior)
    }

    pub fn build(self) -> Result<BehaviorPipeline, MockError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let mut pipeline = self.pipeline;
        let mut headers = self.headers;
        if let Some(media_type) = &self.content_type {
            headers.push("Content-Type", media_type)?;
        }
        if !headers.is_empty() {
            pipeline.insert(Arc::new(headers));
        }
        Ok(pipeline)
    }

    fn content(&mut self, behavior: ContentBehavior) -> &mut Self {
        self.insert(Arc::new(behavior))
    }

    fn record<B, E>(&mut self, behavior: Result<B, E>) -> &mut Self
    where
        B: ResponseBehavior + 'static,
        E: Into<MockError>,
    {
        match behavior {
            Ok(behavior) => self.insert(Arc::new(behavior)),
            Err(e) => self.fail(e.into()),
        }
    }

    fn insert(&mut self, behavior: Arc<dyn ResponseBehavior>) -> &mut Self {
        if self.error.is_none() {
            self.pipeline.insert(behavior);
        }
        self
    }

    fn fail(&mut self, err: MockError) -> &mut Self {
        self.error.get_or_insert(err);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behaviors::BehaviorKind;
    use crate::error::{ConfigError, SimulatedFailure, StreamError};
    use crate::matchers::test_support::get;
    use hyper::header::CONTENT_TYPE;
    use tokio::time::Instant;

    #[tokio::test]
    async fn test_builds_full_response() {
        let mut builder = ResponseBuilder::new();
        builder
            .status(201)
            .json(&serde_json::json!({"ok": true}))
            .header("X-Request-Id", "abc")
            .content_type("application/problem+json");
        let pipeline = builder.build().unwrap();

        let response = pipeline.produce(&get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/problem+json");
        assert_eq!(response.headers()["x-request-id"], "abc");
        assert_eq!(
            response.into_body().collect().await.unwrap(),
            Bytes::from_static(b"{\"ok\":true}")
        );
    }

    #[test]
    fn test_first_error_wins() {
        let mut builder = ResponseBuilder::new();
        builder.status(42).transfer_rate(1u64).status(200);
        assert!(matches!(
            builder.build(),
            Err(MockError::Config(ConfigError::OutOfRange {
                name: "status_code",
                ..
            }))
        ));

        let mut builder = ResponseBuilder::new();
        builder.transfer_rate(1u64);
        assert!(matches!(
            builder.build(),
            Err(MockError::Config(ConfigError::Stream(
                StreamError::InvalidArgument { .. }
            )))
        ));
    }

    #[test]
    fn test_unserializable_json_is_config_error() {
        let mut keyed_by_list = std::collections::BTreeMap::new();
        keyed_by_list.insert(vec![1u8, 2], "value");
        let mut builder = ResponseBuilder::new();
        builder.json(&keyed_by_list);
        assert!(matches!(
            builder.build(),
            Err(MockError::Config(ConfigError::InvalidContent(_)))
        ));
    }

    #[test]
    fn test_last_setter_of_a_kind_wins() {
        let mut builder = ResponseBuilder::new();
        builder.text("a").body("b").status(200).status(204);
        let pipeline = builder.build().unwrap();
        assert_eq!(
            pipeline.kinds(),
            vec![BehaviorKind::StatusCode, BehaviorKind::Content]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_timeout_responds_408_late() {
        let mut builder = ResponseBuilder::new();
        builder.server_timeout(Duration::from_secs(3));
        let pipeline = builder.build().unwrap();

        let start = Instant::now();
        let response = pipeline.produce(&get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_client_timeout_fails() {
        let mut builder = ResponseBuilder::new();
        builder.status(200).client_timeout(Duration::ZERO);
        let err = builder.build().unwrap().produce(&get("/")).await.unwrap_err();
        assert!(matches!(
            err,
            MockError::Simulated(SimulatedFailure::Timeout(_))
        ));
    }
}
