//! High level pipeline orchestration.
//!
//! Wires the credential formatter, cookie acquirer, and request dispatcher
//! into the single entry point the host layer calls on a timer or on demand:
//! [`UsageSession::fetch_usage`]. A session is cheap to keep alive across
//! invocations; the mitigation-cookie cache is the only state it carries, and
//! overlapping invocations are tolerated (last write to the cache wins).

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::classify::FailureKind;
use crate::cookie::{CookieAcquirer, CookieCache, DEFAULT_COOKIE_TTL, MITIGATION_COOKIE};
use crate::credential::{format_cookie, redact};
use crate::dispatch::RequestDispatcher;
use crate::outcome::{FetchFailure, FetchOutcome};
use crate::transport::{browser_headers_with_cookie, ReqwestTransport, Transport};

/// Origin the stock session targets.
pub const DEFAULT_ORIGIN: &str = "https://claude.ai";

/// Deadline applied to each individual network attempt.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur while constructing a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("transport construction failed: {0}")]
    Transport(#[from] crate::transport::TransportError),
    #[error("origin cannot carry path segments: {0}")]
    InvalidOrigin(Url),
}

/// Resolved session settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub origin: Url,
    pub attempt_timeout: Duration,
    pub cookie_ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            origin: Url::parse(DEFAULT_ORIGIN).expect("default origin URL"),
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            cookie_ttl: DEFAULT_COOKIE_TTL,
        }
    }
}

/// Fluent builder for [`UsageSession`].
pub struct SessionBuilder {
    config: SessionConfig,
    transports: Option<Vec<Arc<dyn Transport>>>,
    priming_transports: Option<Vec<Arc<dyn Transport>>>,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self {
            config: SessionConfig::default(),
            transports: None,
            priming_transports: None,
        }
    }

    pub fn with_origin(mut self, origin: Url) -> Self {
        self.config.origin = origin;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.config.attempt_timeout = timeout;
        self
    }

    pub fn with_cookie_ttl(mut self, ttl: Duration) -> Self {
        self.config.cookie_ttl = ttl;
        self
    }

    /// Replace the usage-fetch strategy list. Order is fallback order.
    pub fn with_transports(mut self, transports: Vec<Arc<dyn Transport>>) -> Self {
        self.transports = Some(transports);
        self
    }

    /// Replace the cookie-priming strategy list. The first entry should
    /// expose raw response headers.
    pub fn with_priming_transports(mut self, transports: Vec<Arc<dyn Transport>>) -> Self {
        self.priming_transports = Some(transports);
        self
    }

    pub fn build(self) -> Result<UsageSession, SessionError> {
        // The origin must accept appended path segments.
        if self.config.origin.cannot_be_a_base() {
            return Err(SessionError::InvalidOrigin(self.config.origin));
        }

        let (transports, priming) = match (self.transports, self.priming_transports) {
            (Some(transports), Some(priming)) => (transports, priming),
            (transports, priming) => {
                let plain: Arc<dyn Transport> = Arc::new(ReqwestTransport::plain()?);
                let raw: Arc<dyn Transport> = Arc::new(ReqwestTransport::raw()?);
                let browser: Arc<dyn Transport> = Arc::new(ReqwestTransport::browser()?);
                (
                    transports.unwrap_or_else(|| {
                        vec![plain.clone(), raw.clone(), browser.clone()]
                    }),
                    priming.unwrap_or_else(|| vec![raw, browser]),
                )
            }
        };

        let cache = Arc::new(CookieCache::new());
        let acquirer = CookieAcquirer::new(
            cache.clone(),
            priming,
            self.config.origin.clone(),
            self.config.attempt_timeout,
            self.config.cookie_ttl,
        );
        let dispatcher = RequestDispatcher::new(transports, self.config.attempt_timeout);

        Ok(UsageSession {
            config: self.config,
            cache,
            acquirer,
            dispatcher,
        })
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns one resilient usage-fetch pipeline.
pub struct UsageSession {
    config: SessionConfig,
    cache: Arc<CookieCache>,
    acquirer: CookieAcquirer,
    dispatcher: RequestDispatcher,
}

impl UsageSession {
    /// Session with the stock transport stack and default settings.
    pub fn new() -> Result<Self, SessionError> {
        SessionBuilder::new().build()
    }

    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Drop any cached mitigation cookie, forcing re-acquisition on the next
    /// fetch.
    pub fn invalidate_cookie(&self) {
        self.cache.clear();
    }

    /// Fetch the usage payload for an organization.
    ///
    /// Never panics and never returns `Err` across this boundary: every
    /// failure mode is folded into [`FetchOutcome::Failure`]. Safe to call
    /// concurrently with itself.
    pub async fn fetch_usage(&self, organization_id: &str, credential: &str) -> FetchOutcome {
        log::debug!(
            "fetching usage for organization {organization_id} (credential {})",
            redact(credential)
        );

        let fragment = format_cookie(credential);

        let cookie_header = match self.acquirer.acquire(&fragment).await {
            Some(value) => format!("{MITIGATION_COOKIE}={value}; {fragment}"),
            None => fragment,
        };

        let url = match usage_url(&self.config.origin, organization_id) {
            Ok(url) => url,
            Err(err) => {
                return FetchOutcome::Failure(FetchFailure::new(
                    FailureKind::Transport,
                    err.to_string(),
                ))
            }
        };

        let headers = browser_headers_with_cookie(&cookie_header);

        match self.dispatcher.fetch_payload(&url, &headers).await {
            Ok(payload) => FetchOutcome::Success(payload),
            Err(failure) => FetchOutcome::Failure(failure),
        }
    }
}

/// Build `{origin}/api/organizations/{id}/usage` with the id percent-encoded
/// as a single path segment.
fn usage_url(origin: &Url, organization_id: &str) -> Result<Url, SessionError> {
    let mut url = origin.clone();
    url.path_segments_mut()
        .map_err(|_| SessionError::InvalidOrigin(origin.clone()))?
        .pop_if_empty()
        .extend(["api", "organizations", organization_id, "usage"]);
    Ok(url)
}
