//! Append-only log of dispatched requests.

use crate::request::HttpRequest;
use crate::setup::Setup;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One completed dispatch.
pub struct InvokedRequest {
    setup: Arc<Setup>,
    request: Arc<HttpRequest>,
    invoked_at: DateTime<Utc>,
    verified: AtomicBool,
}

impl InvokedRequest {
    pub fn setup(&self) -> &Arc<Setup> {
        &self.setup
    }

    pub fn request(&self) -> &Arc<HttpRequest> {
        &self.request
    }

    pub fn invoked_at(&self) -> DateTime<Utc> {
        self.invoked_at
    }

    pub fn is_verified(&self) -> bool {
        self.verified.load(Ordering::Acquire)
    }

    pub(crate) fn mark_verified(&self) {
        self.verified.store(true, Ordering::Release);
    }
}

impl fmt::Display for InvokedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.request.method(), self.request.uri())
    }
}

impl fmt::Debug for InvokedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvokedRequest")
            .field("method", self.request.method())
            .field("uri", self.request.uri())
            .field("invoked_at", &self.invoked_at)
            .field("verified", &self.is_verified())
            .finish()
    }
}

/// Thread-safe invocation log, in completion order.
#[derive(Debug, Default)]
pub struct InvocationLedger {
    entries: Mutex<Vec<Arc<InvokedRequest>>>,
}

impl InvocationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, setup: Arc<Setup>, request: Arc<HttpRequest>) -> Arc<InvokedRequest> {
        let entry = Arc::new(InvokedRequest {
            setup,
            request,
            invoked_at: Utc::now(),
            verified: AtomicBool::new(false),
        });
        self.entries.lock().push(entry.clone());
        entry
    }

    /// Entries recorded so far. Later records do not show up in the
    /// returned vector.
    pub fn snapshot(&self) -> Vec<Arc<InvokedRequest>> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
