//! Latency behavior - hold the response for a sampled network delay.

use super::{BehaviorKind, Next, ResponseBehavior};
use crate::error::{ConfigError, MockError};
use crate::request::RequestContext;
use crate::response::HttpResponse;
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Latency distribution for a simulated network: a fixed delay or a
/// uniform range.
pub struct NetworkLatency {
    min: Duration,
    max: Duration,
    rng: Mutex<StdRng>,
}

impl NetworkLatency {
    /// Exactly `delay`.
    pub fn around(delay: Duration) -> Self {
        Self::range(delay, delay)
    }

    /// Uniformly sampled between `min` and `max`, inclusive.
    pub fn between(min: Duration, max: Duration) -> Result<Self, ConfigError> {
        if min > max {
            return Err(ConfigError::OutOfRange {
                name: "latency",
                value: format!("{min:?}..{max:?}"),
            });
        }
        Ok(Self::range(min, max))
    }

    pub fn two_g() -> Self {
        Self::range(Duration::from_millis(300), Duration::from_millis(1_200))
    }

    pub fn three_g() -> Self {
        Self::range(Duration::from_millis(100), Duration::from_millis(600))
    }

    pub fn four_g() -> Self {
        Self::range(Duration::from_millis(30), Duration::from_millis(50))
    }

    pub fn five_g() -> Self {
        Self::range(Duration::from_millis(5), Duration::from_millis(10))
    }

    /// Make sampling reproducible.
    pub fn with_seed(self, seed: u64) -> Self {
        *self.rng.lock() = StdRng::seed_from_u64(seed);
        self
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let min = self.min.as_nanos() as u64;
        let max = self.max.as_nanos() as u64;
        Duration::from_nanos(self.rng.lock().gen_range(min..=max))
    }

    fn range(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }
}

impl fmt::Debug for NetworkLatency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkLatency")
            .field("min", &self.min)
            .field("max", &self.max)
            .finish()
    }
}

/// Pads the time spent producing the response (including the inner
/// behaviors) up to a sampled latency.
#[derive(Debug)]
pub struct LatencyBehavior {
    latency: NetworkLatency,
}

impl LatencyBehavior {
    pub fn new(latency: NetworkLatency) -> Self {
        Self { latency }
    }

    pub fn latency(&self) -> &NetworkLatency {
        &self.latency
    }
}

#[async_trait]
impl ResponseBehavior for LatencyBehavior {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Latency
    }

    async fn handle(
        &self,
        ctx: &RequestContext,
        response: &mut HttpResponse,
        next: Next<'_>,
    ) -> Result<(), MockError> {
        let target = self.latency.sample();
        let started = Instant::now();
        next.run(ctx, response).await?;

        let remaining = target.saturating_sub(started.elapsed());
        if !remaining.is_zero() {
            debug!("Delaying response by {:?} (latency {:?})", remaining, target);
            tokio::time::sleep(remaining).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matchers::test_support::get;
    use crate::response::draft;

    #[test]
    fn test_between_validates_order() {
        assert!(NetworkLatency::between(Duration::from_secs(2), Duration::from_secs(1)).is_err());
        let latency =
            NetworkLatency::between(Duration::from_millis(10), Duration::from_millis(20)).unwrap();
        for _ in 0..100 {
            let sample = latency.sample();
            assert!(sample >= Duration::from_millis(10) && sample <= Duration::from_millis(20));
        }
    }

    #[test]
    fn test_seeded_sampling_is_reproducible() {
        let a = NetworkLatency::three_g().with_seed(42);
        let b = NetworkLatency::three_g().with_seed(42);
        let first: Vec<_> = (0..5).map(|_| a.sample()).collect();
        let second: Vec<_> = (0..5).map(|_| b.sample()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_presets_get_faster() {
        assert!(NetworkLatency::two_g().min() > NetworkLatency::three_g().min());
        assert!(NetworkLatency::four_g().max() > NetworkLatency::five_g().max());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pads_to_latency() {
        let behavior = LatencyBehavior::new(NetworkLatency::around(Duration::from_millis(250)));
        let start = Instant::now();
        behavior
            .handle(&get("/"), &mut draft(), Next::new(&[]))
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(250));
        assert!(start.elapsed() < Duration::from_millis(260));
    }
}
