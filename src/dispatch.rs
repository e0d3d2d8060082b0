//! Request dispatcher.
//!
//! Walks the ordered transport list until one attempt succeeds or the list is
//! exhausted. The classifier decides, per failure, whether switching clients
//! can help (challenge rejections, transport faults) or whether the failure
//! is substantive and terminal (any other HTTP error). All failures are
//! funneled into a single synthesized [`FetchFailure`]; nothing escapes this
//! module as a panic or raw error.

use std::sync::Arc;
use std::time::Duration;

use http::HeaderMap;
use tokio::time::timeout;
use url::Url;

use crate::classify::{classify, FailureKind};
use crate::outcome::FetchFailure;
use crate::transport::Transport;
use crate::usage::UsagePayload;

/// Cap applied to per-attempt body excerpts.
const EXCERPT_LIMIT: usize = 200;
/// Cap applied to the raw detail of the final synthesized failure.
const DETAIL_LIMIT: usize = 500;

/// Guidance appended when every strategy was rejected by the challenge layer.
/// This is the dominant recurring failure mode, so the caller gets concrete
/// remediation steps instead of an opaque error string.
const REMEDIATION_NOTES: &str = "\
The endpoint appears to be protected by a bot-mitigation layer that is \
rejecting every client this crate knows how to present.
Things that usually help:
  - sign in with a browser and supply its full cookie header as the credential \
(a fresh __cf_bm capture rides along with it)
  - retry from another network or through a residential proxy; challenge \
decisions are tied to IP reputation
  - wait a few minutes and retry; interstitial challenges are often temporary
  - ask the API provider about supported programmatic access";

/// One failed attempt, kept for the exhaustion diagnostic.
#[derive(Debug)]
struct AttemptFailure {
    transport: &'static str,
    kind: FailureKind,
    message: String,
}

/// Tries the usage fetch through an ordered list of transports.
pub struct RequestDispatcher {
    transports: Vec<Arc<dyn Transport>>,
    attempt_timeout: Duration,
}

impl RequestDispatcher {
    pub fn new(transports: Vec<Arc<dyn Transport>>, attempt_timeout: Duration) -> Self {
        Self {
            transports,
            attempt_timeout,
        }
    }

    /// Fetch and parse the usage payload.
    ///
    /// Strategies run strictly in order and strictly one at a time; the first
    /// 2xx response with a well-formed JSON body short-circuits the walk.
    pub async fn fetch_payload(
        &self,
        url: &Url,
        headers: &HeaderMap,
    ) -> Result<UsagePayload, FetchFailure> {
        let mut failures: Vec<AttemptFailure> = Vec::new();

        for transport in &self.transports {
            let name = transport.kind().as_str();

            let failure = match timeout(self.attempt_timeout, transport.get(url, headers)).await {
                Err(_elapsed) => AttemptFailure {
                    transport: name,
                    kind: FailureKind::Transport,
                    message: format!("timed out after {:?}", self.attempt_timeout),
                },
                Ok(Err(err)) => AttemptFailure {
                    transport: name,
                    kind: classify(None, &err.to_string()),
                    message: err.to_string(),
                },
                Ok(Ok(response)) if response.is_success() => {
                    match serde_json::from_str::<UsagePayload>(&response.body) {
                        Ok(payload) => {
                            log::debug!("usage fetch succeeded via {name}");
                            return Ok(payload);
                        }
                        // A 2xx with an unparseable body usually means an
                        // interstitial page served with the wrong status;
                        // classify on the body text before giving up on it.
                        Err(err) => AttemptFailure {
                            transport: name,
                            kind: classify(None, &response.body),
                            message: format!(
                                "malformed response body ({err}): {}",
                                truncate(&response.body, EXCERPT_LIMIT)
                            ),
                        },
                    }
                }
                Ok(Ok(response)) => {
                    let message = format!(
                        "HTTP {}: {}",
                        response.status,
                        truncate(&response.body, EXCERPT_LIMIT)
                    );
                    AttemptFailure {
                        transport: name,
                        kind: classify(Some(response.status), &response.body),
                        message,
                    }
                }
            };

            log::debug!(
                "attempt via {} failed ({:?}): {}",
                failure.transport,
                failure.kind,
                truncate(&failure.message, EXCERPT_LIMIT)
            );

            if !failure.kind.is_retryable() {
                // A substantive HTTP error repeats on every client; retrying
                // only burns time and credential exposure.
                return Err(FetchFailure::new(failure.kind, failure.message));
            }

            failures.push(failure);
        }

        log::warn!(
            "all {} transport strategies exhausted fetching usage",
            self.transports.len()
        );
        Err(synthesize_exhaustion(failures))
    }
}

/// Build the one failure returned after every strategy was tried.
fn synthesize_exhaustion(failures: Vec<AttemptFailure>) -> FetchFailure {
    let Some(last) = failures.last() else {
        return FetchFailure::new(FailureKind::Transport, "no transport strategies configured");
    };

    let trace = failures
        .iter()
        .map(|f| format!("{}: {}", f.transport, truncate(&f.message, EXCERPT_LIMIT)))
        .collect::<Vec<_>>()
        .join("; ");

    if last.kind == FailureKind::BotChallenge {
        let message = format!(
            "all transport strategies were rejected [{trace}]\n\n{REMEDIATION_NOTES}"
        );
        FetchFailure::new(FailureKind::BotChallenge, message)
    } else {
        let message = format!(
            "all transport strategies failed [{trace}]: {}",
            truncate(&last.message, DETAIL_LIMIT)
        );
        FetchFailure::new(last.kind, message)
    }
}

/// Character-boundary-safe truncation.
fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut out: String = text.chars().take(limit).collect();
    out.push('…');
    out
}
