//! Transfer rate behavior - throttle the response body.

use super::{BehaviorKind, Next, ResponseBehavior};
use crate::error::{MockError, StreamError};
use crate::request::RequestContext;
use crate::response::{HttpResponse, ResponseBody};
use crate::stream::{BitRate, RateLimitedStream, MIN_BIT_RATE};
use async_trait::async_trait;

/// Throttles reading of whatever body the inner behaviors produced.
#[derive(Debug, Clone)]
pub struct TransferRateBehavior {
    bit_rate: BitRate,
}

impl TransferRateBehavior {
    pub fn new(bit_rate: impl Into<BitRate>) -> Result<Self, StreamError> {
        let bit_rate = bit_rate.into();
        if bit_rate.as_u64() < MIN_BIT_RATE {
            return Err(StreamError::InvalidArgument {
                name: "bit_rate",
                reason: format!("must be at least {MIN_BIT_RATE} bits per second, got {bit_rate}"),
            });
        }
        Ok(Self { bit_rate })
    }

    pub fn bit_rate(&self) -> BitRate {
        self.bit_rate
    }
}

#[async_trait]
impl ResponseBehavior for TransferRateBehavior {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::TransferRate
    }

    async fn handle(
        &self,
        ctx: &RequestContext,
        response: &mut HttpResponse,
        next: Next<'_>,
    ) -> Result<(), MockError> {
        next.run(ctx, response).await?;

        let body = std::mem::take(response.body_mut());
        let throttled = RateLimitedStream::new(body.into_stream(), self.bit_rate).await?;
        *response.body_mut() = ResponseBody::stream(throttled);
        Ok(())
    }
}
