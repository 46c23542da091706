//! Status code behavior.

use super::{BehaviorKind, Next, ResponseBehavior};
use crate::error::{ConfigError, MockError};
use crate::request::RequestContext;
use crate::response::HttpResponse;
use async_trait::async_trait;
use hyper::StatusCode;

#[derive(Debug, Clone)]
pub struct StatusCodeBehavior {
    status: StatusCode,
}

impl StatusCodeBehavior {
    /// Accepts any three-digit code, including unregistered ones.
    pub fn new(code: u16) -> Result<Self, ConfigError> {
        let status = StatusCode::from_u16(code).map_err(|_| ConfigError::OutOfRange {
            name: "status_code",
            value: code.to_string(),
        })?;
        Ok(Self { status })
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<StatusCode> for StatusCodeBehavior {
    fn from(status: StatusCode) -> Self {
        Self { status }
    }
}

#[async_trait]
impl ResponseBehavior for StatusCodeBehavior {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::StatusCode
    }

    async fn handle(
        &self,
        ctx: &RequestContext,
        response: &mut HttpResponse,
        next: Next<'_>,
    ) -> Result<(), MockError> {
        *response.status_mut() = self.status;
        next.run(ctx, response).await
    }
}
