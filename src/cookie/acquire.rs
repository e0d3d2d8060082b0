//! Mitigation-cookie acquisition.
//!
//! Primes the target origin with a browser-shaped navigation and harvests the
//! `__cf_bm` cookie from the raw `Set-Cookie` headers. Acquisition never
//! fails the pipeline: every exit path that does not produce a cookie simply
//! reports absence and the usage fetch proceeds without it.

use std::sync::Arc;
use std::time::Duration;

use http::header::SET_COOKIE;
use tokio::time::timeout;
use url::Url;

use crate::cookie::cache::CookieCache;
use crate::transport::{browser_headers_with_cookie, RawResponse, Transport};

/// Name of the bot-mitigation cookie issued by the challenge layer.
pub const MITIGATION_COOKIE: &str = "__cf_bm";

/// Harvests and caches the mitigation cookie.
pub struct CookieAcquirer {
    cache: Arc<CookieCache>,
    /// Priming transports in order. The first entry should expose raw
    /// response headers; normalized clients are known to filter or merge
    /// `Set-Cookie`.
    transports: Vec<Arc<dyn Transport>>,
    origin: Url,
    attempt_timeout: Duration,
    cookie_ttl: Duration,
}

impl CookieAcquirer {
    pub fn new(
        cache: Arc<CookieCache>,
        transports: Vec<Arc<dyn Transport>>,
        origin: Url,
        attempt_timeout: Duration,
        cookie_ttl: Duration,
    ) -> Self {
        Self {
            cache,
            transports,
            origin,
            attempt_timeout,
            cookie_ttl,
        }
    }

    /// Return the cached cookie or try to harvest a fresh one.
    ///
    /// Strategy order is fixed: a timeout on the first transport abandons
    /// acquisition outright (falling back would double latency on an already
    /// degraded network), while any other failure moves on to the next
    /// transport. A successful priming response without the cookie is also
    /// terminal absence.
    pub async fn acquire(&self, credential_cookie: &str) -> Option<String> {
        if let Some(value) = self.cache.get() {
            log::debug!("mitigation cookie served from cache");
            return Some(value);
        }

        let headers = browser_headers_with_cookie(credential_cookie);

        for (index, transport) in self.transports.iter().enumerate() {
            let kind = transport.kind();
            match timeout(self.attempt_timeout, transport.get(&self.origin, &headers)).await {
                Err(_elapsed) => {
                    log::debug!(
                        "priming request via {} timed out after {:?}, abandoning acquisition",
                        kind.as_str(),
                        self.attempt_timeout
                    );
                    return None;
                }
                Ok(Ok(response)) => {
                    if let Some(value) = scan_set_cookie(&response) {
                        log::debug!("harvested mitigation cookie via {}", kind.as_str());
                        self.cache.set(value.clone(), self.cookie_ttl);
                        return Some(value);
                    }
                    log::debug!(
                        "priming response via {} carried no {} cookie",
                        kind.as_str(),
                        MITIGATION_COOKIE
                    );
                    return None;
                }
                Ok(Err(err)) => {
                    log::debug!(
                        "priming request via {} failed: {err}",
                        kind.as_str()
                    );
                    if index + 1 == self.transports.len() {
                        return None;
                    }
                }
            }
        }

        None
    }
}

/// Scan all `Set-Cookie` entries for the mitigation cookie value.
fn scan_set_cookie(response: &RawResponse) -> Option<String> {
    for header in response.headers.get_all(SET_COOKIE) {
        let Ok(text) = header.to_str() else { continue };
        let pair = text.split(';').next().unwrap_or("");
        if let Some((name, value)) = pair.split_once('=') {
            if name.trim() == MITIGATION_COOKIE && !value.trim().is_empty() {
                return Some(value.trim().to_string());
            }
        }
    }
    None
}
