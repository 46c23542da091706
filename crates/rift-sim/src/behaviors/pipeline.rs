//! Behavior pipeline - rank ordered middleware chain.

use super::{BehaviorKind, Next, ResponseBehavior};
use crate::error::MockError;
use crate::request::RequestContext;
use crate::response::{draft, HttpResponse};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Behaviors configured for one response, at most one per kind.
#[derive(Clone, Default)]
pub struct BehaviorPipeline {
    behaviors: HashMap<BehaviorKind, Arc<dyn ResponseBehavior>>,
}

impl BehaviorPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a behavior, replacing and returning any earlier behavior of
    /// the same kind.
    pub fn insert(
        &mut self,
        behavior: Arc<dyn ResponseBehavior>,
    ) -> Option<Arc<dyn ResponseBehavior>> {
        self.behaviors.insert(behavior.kind(), behavior)
    }

    pub fn get(&self, kind: BehaviorKind) -> Option<&Arc<dyn ResponseBehavior>> {
        self.behaviors.get(&kind)
    }

    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }

    /// Kinds present, in application order.
    pub fn kinds(&self) -> Vec<BehaviorKind> {
        let mut kinds: Vec<_> = self.behaviors.keys().copied().collect();
        kinds.sort();
        kinds
    }

    /// Run every behavior over a fresh 200 OK draft, lowest rank outermost.
    pub async fn produce(&self, ctx: &RequestContext) -> Result<HttpResponse, MockError> {
        let mut ordered: Vec<Arc<dyn ResponseBehavior>> = self.behaviors.values().cloned().collect();
        ordered.sort_by_key(|behavior| behavior.kind().rank());

        let mut response = draft();
        Next::new(&ordered).run(ctx, &mut response).await?;
        Ok(response)
    }
}

impl fmt::Debug for BehaviorPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviorPipeline")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behaviors::{ContentBehavior, HeadersBehavior, StatusCodeBehavior};
    use crate::matchers::test_support::get;
    use async_trait::async_trait;
    use hyper::StatusCode;
    use parking_lot::Mutex;

    #[derive(Debug)]
    struct Recording {
        kind: BehaviorKind,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl ResponseBehavior for Recording {
        fn kind(&self) -> BehaviorKind {
            self.kind
        }

        async fn handle(
            &self,
            ctx: &RequestContext,
            response: &mut HttpResponse,
            next: Next<'_>,
        ) -> Result<(), MockError> {
            self.log.lock().push(format!("enter {:?}", self.kind));
            next.run(ctx, response).await?;
            self.log.lock().push(format!("leave {:?}", self.kind));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_empty_pipeline_produces_ok() {
        let response = BehaviorPipeline::new().produce(&get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().is_empty());
    }

    #[tokio::test]
    async fn test_runs_by_rank_regardless_of_insertion_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = BehaviorPipeline::new();
        for kind in [BehaviorKind::Headers, BehaviorKind::Latency, BehaviorKind::StatusCode] {
            pipeline.insert(Arc::new(Recording {
                kind,
                log: log.clone(),
            }));
        }

        pipeline.produce(&get("/")).await.unwrap();
        assert_eq!(
            *log.lock(),
            vec![
                "enter Latency",
                "enter StatusCode",
                "enter Headers",
                "leave Headers",
                "leave StatusCode",
                "leave Latency",
            ]
        );
    }

    #[tokio::test]
    async fn test_same_kind_replaces() {
        let mut pipeline = BehaviorPipeline::new();
        pipeline.insert(Arc::new(StatusCodeBehavior::new(201).unwrap()));
        let replaced = pipeline.insert(Arc::new(StatusCodeBehavior::new(202).unwrap()));
        assert!(replaced.is_some());
        pipeline.insert(Arc::new(ContentBehavior::text("done")));
        pipeline.insert(Arc::new(
            HeadersBehavior::parse("X-Trace: 1").unwrap(),
        ));
        assert_eq!(
            pipeline.kinds(),
            vec![
                BehaviorKind::StatusCode,
                BehaviorKind::Content,
                BehaviorKind::Headers
            ]
        );

        let response = pipeline.produce(&get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers()["x-trace"], "1");
    }
}
