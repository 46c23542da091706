//! Response behaviors and the pipeline that composes them.
//!
//! A response is assembled by a chain of behaviors, each contributing one
//! aspect (status code, content, headers, ...). Behaviors are registered in
//! any order; at production time they run by [`BehaviorKind`] rank, each
//! one receiving the draft response and a [`Next`] continuation for the
//! rest of the chain.
//!
//! # Supported Behaviors
//!
//! - `timeout` - fail with a simulated timeout instead of responding
//! - `latency` - pad total production time to a sampled network latency
//! - `transfer_rate` - throttle reading of the produced body
//! - `status` - set the status code
//! - `content` - set the body and its content headers
//! - `headers` - set response headers

mod builder;
mod content;
mod headers;
mod latency;
mod pipeline;
mod status;
mod timeout;
mod transfer_rate;

pub use builder::ResponseBuilder;
pub use content::{Content, ContentBehavior};
pub use headers::HeadersBehavior;
pub use latency::{LatencyBehavior, NetworkLatency};
pub use pipeline::BehaviorPipeline;
pub use status::StatusCodeBehavior;
pub use timeout::TimeoutBehavior;
pub use transfer_rate::TransferRateBehavior;

use crate::error::MockError;
use crate::request::RequestContext;
use crate::response::HttpResponse;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

/// Behavior family. The discriminant is the application rank: lower ranks
/// wrap higher ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BehaviorKind {
    Timeout = 0,
    Latency = 1,
    TransferRate = 2,
    StatusCode = 3,
    Content = 4,
    Headers = 5,
}

impl BehaviorKind {
    pub fn rank(self) -> u8 {
        self as u8
    }
}

/// One stage of response production.
#[async_trait]
pub trait ResponseBehavior: fmt::Debug + Send + Sync {
    fn kind(&self) -> BehaviorKind;

    /// Contribute to `response` and continue with `next`, unless the
    /// behavior deliberately ends production with an error.
    async fn handle(
        &self,
        ctx: &RequestContext,
        response: &mut HttpResponse,
        next: Next<'_>,
    ) -> Result<(), MockError>;
}

/// Continuation over the behaviors that have not run yet.
pub struct Next<'a> {
    remaining: &'a [Arc<dyn ResponseBehavior>],
}

impl<'a> Next<'a> {
    pub(crate) fn new(remaining: &'a [Arc<dyn ResponseBehavior>]) -> Self {
        Self { remaining }
    }

    /// Run the rest of the chain. The end of the chain does nothing.
    pub fn run(
        self,
        ctx: &'a RequestContext,
        response: &'a mut HttpResponse,
    ) -> BoxFuture<'a, Result<(), MockError>> {
        match self.remaining.split_first() {
            Some((behavior, rest)) => behavior.handle(ctx, response, Next::new(rest)),
            None => Box::pin(futures::future::ready(Ok(()))),
        }
    }
}
