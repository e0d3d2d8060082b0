//! # usagewatch
//!
//! Resilient client for fetching a usage percentage from an organization API
//! that sits behind an adversarial bot-mitigation layer.
//!
//! The hard part of this problem is not the API call; it is surviving the
//! mitigation layer under repeated unattended invocation. The crate papers
//! over that with client diversity and heuristics: a short-lived mitigation
//! cookie harvested by a priming request, an ordered list of transport
//! strategies with different TLS and client fingerprints, and a classifier
//! that decides per failure whether the next strategy is worth trying.
//!
//! ## Example
//!
//! ```no_run
//! use usagewatch::{FetchOutcome, UsageSession, percent_left};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = UsageSession::new()?;
//!     match session.fetch_usage("org-id", "sk-session-token").await {
//!         FetchOutcome::Success(payload) => {
//!             let window = payload.five_hour_window()?;
//!             println!("{}% left until {}", percent_left(window.utilization), window.resets_at);
//!         }
//!         FetchOutcome::Failure(failure) => eprintln!("{failure}"),
//!     }
//!     Ok(())
//! }
//! ```

mod session;

pub mod classify;
pub mod cookie;
pub mod credential;
pub mod dispatch;
pub mod outcome;
pub mod transport;
pub mod usage;

pub use crate::session::{
    SessionBuilder, SessionConfig, SessionError, UsageSession, DEFAULT_ATTEMPT_TIMEOUT,
    DEFAULT_ORIGIN,
};

pub use crate::classify::{classify, is_challenge_text, FailureKind};
pub use crate::cookie::{CookieAcquirer, CookieCache, DEFAULT_COOKIE_TTL, MITIGATION_COOKIE};
pub use crate::credential::{format_cookie, redact, SESSION_COOKIE};
pub use crate::dispatch::RequestDispatcher;
pub use crate::outcome::{FetchFailure, FetchOutcome};
pub use crate::transport::{
    browser_headers, browser_headers_with_cookie, RawResponse, ReqwestTransport, Transport,
    TransportError, TransportKind,
};
pub use crate::usage::{
    clamp_percent, percent_left, ShapeError, UsagePayload, UsageWindow, WindowPayload,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
