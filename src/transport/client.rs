//! Reqwest-backed transport implementations.
//!
//! Three differently-configured clients stand in for genuinely different
//! client software: two TLS stacks, divergent redirect/cookie/compression
//! behavior, all speaking HTTP/1.1 so the keep-alive connection header stays
//! meaningful.

use async_trait::async_trait;
use http::HeaderMap;
use reqwest::{redirect::Policy, Client};
use url::Url;

use super::{RawResponse, Transport, TransportError, TransportKind};

/// Transport built on a preconfigured [`reqwest::Client`].
pub struct ReqwestTransport {
    kind: TransportKind,
    client: Client,
}

impl ReqwestTransport {
    /// The no-frills strategy: native-tls, a handful of redirects, no cookie
    /// jar, no automatic decompression.
    pub fn plain() -> Result<Self, TransportError> {
        let client = Client::builder()
            .use_native_tls()
            .http1_only()
            .redirect(Policy::limited(5))
            .no_gzip()
            .no_brotli()
            .build()
            .map_err(|err| TransportError::Build(err.to_string()))?;
        Ok(Self {
            kind: TransportKind::Plain,
            client,
        })
    }

    /// The raw-header strategy: rustls for a second TLS fingerprint,
    /// redirects disabled so interstitial responses and their `Set-Cookie`
    /// headers are observed verbatim instead of being followed away.
    pub fn raw() -> Result<Self, TransportError> {
        let client = Client::builder()
            .use_rustls_tls()
            .http1_only()
            .redirect(Policy::none())
            .no_gzip()
            .no_brotli()
            .build()
            .map_err(|err| TransportError::Build(err.to_string()))?;
        Ok(Self {
            kind: TransportKind::Raw,
            client,
        })
    }

    /// The browser-like strategy: cookie jar and gzip/brotli decompression,
    /// the closest shape to an ordinary interactive session.
    pub fn browser() -> Result<Self, TransportError> {
        let client = Client::builder()
            .use_native_tls()
            .http1_only()
            .cookie_store(true)
            .redirect(Policy::limited(5))
            .build()
            .map_err(|err| TransportError::Build(err.to_string()))?;
        Ok(Self {
            kind: TransportKind::Browser,
            client,
        })
    }

    /// Wrap an existing client, mainly useful for tests that need a
    /// specific configuration.
    pub fn from_client(kind: TransportKind, client: Client) -> Self {
        Self { kind, client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    async fn get(&self, url: &Url, headers: &HeaderMap) -> Result<RawResponse, TransportError> {
        let response = self
            .client
            .get(url.clone())
            .headers(headers.clone())
            .send()
            .await
            .map_err(|err| TransportError::Send(err.to_string()))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|err| TransportError::Body(err.to_string()))?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}
