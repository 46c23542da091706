//! Content behavior - set the response body and its content headers.

use super::{BehaviorKind, Next, ResponseBehavior};
use crate::error::{ConfigError, MockError, StreamError};
use crate::request::RequestContext;
use crate::response::{ContentStream, HttpResponse, ResponseBody};
use crate::services::JsonOptions;
use async_trait::async_trait;
use bytes::Bytes;
use hyper::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const APPLICATION_JSON: &str = "application/json; charset=utf-8";

type StreamFactory = Arc<dyn Fn() -> Pin<Box<dyn ContentStream>> + Send + Sync>;

/// What a response body is made of.
#[derive(Clone)]
pub enum Content {
    /// A fixed buffer.
    Bytes(Bytes),
    /// A JSON document, serialized per the engine's [`JsonOptions`].
    Json(serde_json::Value),
    /// A fresh stream per response.
    Stream(StreamFactory),
}

impl fmt::Debug for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Content::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Content::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Content::Stream(_) => f.write_str("Stream"),
        }
    }
}

/// Sets the body, `Content-Type` and, for buffered content,
/// `Content-Length`.
#[derive(Debug, Clone)]
pub struct ContentBehavior {
    content: Content,
    content_type: Option<HeaderValue>,
}

impl ContentBehavior {
    pub fn new(content: Content) -> Self {
        let content_type = match &content {
            Content::Json(_) => Some(HeaderValue::from_static(APPLICATION_JSON)),
            _ => None,
        };
        Self {
            content,
            content_type,
        }
    }

    pub fn bytes(data: impl Into<Bytes>) -> Self {
        Self::new(Content::Bytes(data.into()))
    }

    pub fn text(text: impl Into<String>) -> Self {
        let mut behavior = Self::bytes(text.into());
        behavior.content_type = Some(HeaderValue::from_static(TEXT_PLAIN));
        behavior
    }

    pub fn json(value: serde_json::Value) -> Self {
        Self::new(Content::Json(value))
    }

    pub fn stream<F, S>(factory: F) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
        S: ContentStream + 'static,
    {
        Self::new(Content::Stream(Arc::new(move || {
            Box::pin(factory()) as Pin<Box<dyn ContentStream>>
        })))
    }

    pub fn with_content_type(mut self, media_type: &str) -> Result<Self, ConfigError> {
        let value = HeaderValue::from_str(media_type)
            .map_err(|_| ConfigError::InvalidHeader(format!("Content-Type: {media_type}")))?;
        self.content_type = Some(value);
        Ok(self)
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    fn render(&self, ctx: &RequestContext) -> Result<ResponseBody, StreamError> {
        Ok(match &self.content {
            Content::Bytes(bytes) => ResponseBody::Full(bytes.clone()),
            Content::Json(value) => {
                let pretty = ctx
                    .services()
                    .get::<JsonOptions>()
                    .map(|options| options.pretty)
                    .unwrap_or_default();
                let encoded = if pretty {
                    serde_json::to_vec_pretty(value)
                } else {
                    serde_json::to_vec(value)
                };
                ResponseBody::Full(Bytes::from(encoded.map_err(std::io::Error::from)?))
            }
            Content::Stream(factory) => ResponseBody::Stream(factory()),
        })
    }
}

#[async_trait]
impl ResponseBehavior for ContentBehavior {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Content
    }

    async fn handle(
        &self,
        ctx: &RequestContext,
        response: &mut HttpResponse,
        next: Next<'_>,
    ) -> Result<(), MockError> {
        let body = self.render(ctx)?;
        let headers = response.headers_mut();
        if let Some(len) = body.len_hint() {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
        }
        if let Some(content_type) = &self.content_type {
            headers.insert(CONTENT_TYPE, content_type.clone());
        }
        *response.body_mut() = body;
        next.run(ctx, response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matchers::test_support::get;
    use crate::response::draft;
    use crate::services::ServiceMap;
    use hyper::Request;
    use std::io::Cursor;

    async fn produce(behavior: &ContentBehavior, ctx: &RequestContext) -> HttpResponse {
        let mut response = draft();
        behavior
            .handle(ctx, &mut response, Next::new(&[]))
            .await
            .unwrap();
        response
    }

    #[tokio::test]
    async fn test_text_sets_headers() {
        let response = produce(&ContentBehavior::text("hello"), &get("/")).await;
        assert_eq!(response.headers()[CONTENT_TYPE], TEXT_PLAIN);
        assert_eq!(response.headers()[CONTENT_LENGTH], "5");
        assert_eq!(
            response.into_body().collect().await.unwrap(),
            Bytes::from_static(b"hello")
        );
    }

    #[tokio::test]
    async fn test_raw_bytes_have_no_content_type() {
        let response = produce(&ContentBehavior::bytes(vec![1u8, 2, 3]), &get("/")).await;
        assert!(response.headers().get(CONTENT_TYPE).is_none());
        assert_eq!(response.headers()[CONTENT_LENGTH], "3");
    }

    #[tokio::test]
    async fn test_json_respects_pretty_option() {
        let behavior = ContentBehavior::json(serde_json::json!({"id": 7}));

        let compact = produce(&behavior, &get("/")).await;
        assert_eq!(compact.headers()[CONTENT_TYPE], APPLICATION_JSON);
        assert_eq!(
            compact.into_body().collect().await.unwrap(),
            Bytes::from_static(b"{\"id\":7}")
        );

        let mut services = ServiceMap::new();
        services.insert(JsonOptions { pretty: true });
        let request = Request::get("http://localhost/").body(Bytes::new()).unwrap();
        let ctx = RequestContext::new(Arc::new(request), Arc::new(services));
        let pretty = produce(&behavior, &ctx).await;
        let text = pretty.into_body().collect().await.unwrap();
        assert_eq!(&text[..], b"{\n  \"id\": 7\n}");
    }

    #[tokio::test]
    async fn test_stream_is_fresh_per_response() {
        let behavior = ContentBehavior::stream(|| Cursor::new(b"chunk".to_vec()))
            .with_content_type("application/octet-stream")
            .unwrap();
        for _ in 0..2 {
            let response = produce(&behavior, &get("/")).await;
            assert!(response.headers().get(CONTENT_LENGTH).is_none());
            assert_eq!(
                response.headers()[CONTENT_TYPE],
                "application/octet-stream"
            );
            assert_eq!(
                response.into_body().collect().await.unwrap(),
                Bytes::from_static(b"chunk")
            );
        }
    }

    #[test]
    fn test_rejects_invalid_media_type() {
        assert!(ContentBehavior::text("x")
            .with_content_type("bad\nvalue")
            .is_err());
    }
}
