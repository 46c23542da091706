//! In-process HTTP request/response simulation.
//!
//! Register expectations with [`MockEngine::when`], serve requests through
//! [`MockEngine::dispatch`], and assert on what was sent with
//! [`MockEngine::verify`].

// ===== Matching =====
pub mod matchers;
pub mod pattern;
pub mod request;

// ===== Response production =====
pub mod behaviors;
pub mod response;
pub mod stream;

// ===== Engine =====
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod fluent;
pub mod ledger;
pub mod services;
pub mod setup;
pub mod verify;

pub use behaviors::{NetworkLatency, ResponseBuilder};
pub use config::EngineConfig;
pub use engine::MockEngine;
pub use error::{
    ConfigError, DispatchError, MockError, SimulatedFailure, StreamError, VerificationError,
};
pub use fluent::{ConfiguredRequest, RequestMatching, Responded};
pub use pattern::Pattern;
pub use request::HttpRequest;
pub use response::{HttpResponse, ResponseBody};
pub use services::{JsonOptions, ServiceMap};
pub use stream::{BitRate, RateLimitedStream};
pub use verify::CountPolicy;
