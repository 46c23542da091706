//! Quantified verification over the invocation ledger.

use crate::error::VerificationError;
use crate::ledger::InvokedRequest;
use crate::matchers::MatcherSet;
use crate::request::RequestContext;
use crate::services::ServiceMap;
use crate::setup::Setup;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Accepted range of invocation counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountPolicy {
    lower: usize,
    upper: Option<usize>,
}

impl CountPolicy {
    pub fn at_least(times: usize) -> Self {
        Self {
            lower: times,
            upper: None,
        }
    }

    pub fn at_least_once() -> Self {
        Self::at_least(1)
    }

    pub fn at_most(times: usize) -> Self {
        Self {
            lower: 0,
            upper: Some(times),
        }
    }

    pub fn at_most_once() -> Self {
        Self::at_most(1)
    }

    pub fn exactly(times: usize) -> Self {
        Self {
            lower: times,
            upper: Some(times),
        }
    }

    pub fn never() -> Self {
        Self::exactly(0)
    }

    pub fn once() -> Self {
        Self::exactly(1)
    }

    /// Any count between `from` and `to`, inclusive.
    pub fn between(from: usize, to: usize) -> Self {
        Self {
            lower: from.min(to),
            upper: Some(from.max(to)),
        }
    }

    pub fn lower_bound(&self) -> usize {
        self.lower
    }

    pub fn upper_bound(&self) -> Option<usize> {
        self.upper
    }

    pub fn check(&self, actual: usize) -> bool {
        actual >= self.lower && self.upper.map_or(true, |upper| actual <= upper)
    }
}

fn times(n: usize) -> String {
    match n {
        1 => "once".to_string(),
        n => format!("{n} times"),
    }
}

impl fmt::Display for CountPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.lower, self.upper) {
            (0, Some(0)) => f.write_str("never"),
            (lower, Some(upper)) if lower == upper => write!(f, "exactly {}", times(lower)),
            (0, Some(upper)) => write!(f, "at most {}", times(upper)),
            (lower, None) => write!(f, "at least {}", times(lower)),
            (lower, Some(upper)) => write!(f, "between {lower} and {upper} times"),
        }
    }
}

/// Count ledger entries matching `matchers` (all of them when the set is
/// empty), check the count against `policy`, and mark the counted entries
/// verified on success.
pub async fn verify_invocations(
    entries: &[Arc<InvokedRequest>],
    services: &Arc<ServiceMap>,
    matchers: &MatcherSet,
    policy: CountPolicy,
    reason: Option<&str>,
) -> Result<usize, VerificationError> {
    let mut matching = Vec::new();
    for entry in entries {
        let ctx = RequestContext::new(entry.request().clone(), services.clone());
        if matchers.is_match(&ctx).await {
            matching.push(entry);
        }
    }

    let actual = matching.len();
    if !policy.check(actual) {
        warn!("Verification failed: expected {}, was {}", policy, actual);
        return Err(VerificationError::CountMismatch {
            expected: policy.to_string(),
            actual,
            matching: matchers.to_string(),
            reason: reason
                .filter(|r| !r.is_empty())
                .map(|r| format!(" ({r})"))
                .unwrap_or_default(),
        });
    }

    for entry in matching {
        entry.mark_verified();
    }
    debug!("Verified {} request(s) {}", actual, policy);
    Ok(actual)
}

/// Require every setup to be satisfied. Ledger entries attributed to the
/// checked setups are marked verified on success.
pub fn verify_setups<'a, I>(
    setups: I,
    entries: &[Arc<InvokedRequest>],
) -> Result<(), VerificationError>
where
    I: IntoIterator<Item = &'a Arc<Setup>>,
{
    let setups: Vec<&Arc<Setup>> = setups.into_iter().collect();
    let unsatisfied: Vec<String> = setups
        .iter()
        .filter(|setup| !setup.is_satisfied())
        .map(|setup| match setup.verify_reason() {
            Some(reason) => format!("{setup} ({reason})"),
            None => setup.to_string(),
        })
        .collect();

    if !unsatisfied.is_empty() {
        warn!("{} setup(s) were not satisfied", unsatisfied.len());
        return Err(VerificationError::Unsatisfied {
            count: unsatisfied.len(),
            setups: unsatisfied.join("\n"),
        });
    }

    for entry in entries {
        if setups.iter().any(|setup| Arc::ptr_eq(setup, entry.setup())) {
            entry.mark_verified();
        }
    }
    Ok(())
}

/// Require every ledger entry to have been verified.
pub fn verify_no_other(entries: &[Arc<InvokedRequest>]) -> Result<(), VerificationError> {
    let unverified: Vec<String> = entries
        .iter()
        .filter(|entry| !entry.is_verified())
        .map(|entry| entry.to_string())
        .collect();
    if unverified.is_empty() {
        return Ok(());
    }
    warn!("{} request(s) were not verified", unverified.len());
    Err(VerificationError::UnverifiedRequests {
        count: unverified.len(),
        requests: unverified.join("\n"),
    })
}
