//! Transport strategies.
//!
//! The mitigation layer trusts no single client shape reliably, so the
//! pipeline carries an ordered list of transports with different TLS stacks
//! and client behavior and walks it until one gets through. The [`Transport`]
//! trait is the seam: production code uses the reqwest-backed implementations
//! in [`client`], tests substitute scripted stubs.

pub mod client;
pub mod headers;

use async_trait::async_trait;
use http::HeaderMap;
use thiserror::Error;
use url::Url;

pub use client::ReqwestTransport;
pub use headers::{browser_headers, browser_headers_with_cookie};

/// Identity of a transport strategy, in fallback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// No-frills client: native-tls, bounded redirects, no cookie jar.
    Plain,
    /// Raw-header client: rustls, redirects off, no cookie jar. Every
    /// `Set-Cookie` stays observable, and the TLS fingerprint differs from
    /// the native-tls clients.
    Raw,
    /// Browser-like client: cookie jar and response compression enabled.
    Browser,
}

impl TransportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportKind::Plain => "plain",
            TransportKind::Raw => "raw",
            TransportKind::Browser => "browser",
        }
    }
}

/// Response with the raw header list intact.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("client construction failed: {0}")]
    Build(String),
    #[error("http transport error: {0}")]
    Send(String),
    #[error("failed to read response body: {0}")]
    Body(String),
}

/// One way of delivering a GET request.
#[async_trait]
pub trait Transport: Send + Sync {
    fn kind(&self) -> TransportKind;

    async fn get(&self, url: &Url, headers: &HeaderMap) -> Result<RawResponse, TransportError>;
}
