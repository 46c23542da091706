//! Timeout behavior - fail after a delay without producing a response.

use super::{BehaviorKind, Next, ResponseBehavior};
use crate::error::{ConfigError, MockError, SimulatedFailure};
use crate::request::RequestContext;
use crate::response::HttpResponse;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Longest accepted timeout, matching a signed 32-bit millisecond count.
const MAX_TIMEOUT_MS: u128 = i32::MAX as u128;

/// Ends production with a simulated timeout. A zero duration fails
/// immediately; otherwise the failure is raised once the duration elapses.
#[derive(Debug, Clone)]
pub struct TimeoutBehavior {
    after: Duration,
}

impl TimeoutBehavior {
    pub fn new(after: Duration) -> Result<Self, ConfigError> {
        if after.as_millis() > MAX_TIMEOUT_MS {
            return Err(ConfigError::OutOfRange {
                name: "timeout",
                value: format!("{after:?}"),
            });
        }
        Ok(Self { after })
    }

    pub fn after(&self) -> Duration {
        self.after
    }
}

#[async_trait]
impl ResponseBehavior for TimeoutBehavior {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Timeout
    }

    async fn handle(
        &self,
        _ctx: &RequestContext,
        _response: &mut HttpResponse,
        _next: Next<'_>,
    ) -> Result<(), MockError> {
        if !self.after.is_zero() {
            tokio::time::sleep(self.after).await;
        }
        debug!("Simulating timeout after {:?}", self.after);
        Err(SimulatedFailure::Timeout(self.after).into())
    }
}
