//! Short-lived store for the bot-mitigation cookie.
//!
//! One slot per session instance. Expiry is checked lazily on read; writers
//! racing to populate the slot follow last-write-wins, which is safe because
//! re-acquiring the cookie is idempotent.

use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Default lifetime applied to a freshly harvested cookie.
pub const DEFAULT_COOKIE_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
struct Slot {
    value: String,
    expires_at: Instant,
}

/// Time-bounded single-slot cookie store.
#[derive(Debug, Default)]
pub struct CookieCache {
    slot: RwLock<Option<Slot>>,
}

impl CookieCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value while it is still live; an expired entry
    /// reads as absent, never as a stale value.
    pub fn get(&self) -> Option<String> {
        self.get_at(Instant::now())
    }

    fn get_at(&self, now: Instant) -> Option<String> {
        let guard = self.slot.read().ok()?;
        guard
            .as_ref()
            .filter(|slot| now < slot.expires_at)
            .map(|slot| slot.value.clone())
    }

    /// Store a value for `ttl` from now. Last write wins.
    pub fn set(&self, value: impl Into<String>, ttl: Duration) {
        if let Ok(mut guard) = self.slot.write() {
            *guard = Some(Slot {
                value: value.into(),
                expires_at: Instant::now() + ttl,
            });
        }
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.slot.write() {
            *guard = None;
        }
    }
}
