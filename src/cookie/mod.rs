//! Mitigation-cookie lifecycle: short-lived caching plus acquisition via a
//! priming request against the target origin.

pub mod acquire;
pub mod cache;

pub use acquire::{CookieAcquirer, MITIGATION_COOKIE};
pub use cache::{CookieCache, DEFAULT_COOKIE_TTL};
