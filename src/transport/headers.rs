//! Fixed browser-impersonation header set.
//!
//! The mitigation layer differentiates clients primarily by TLS fingerprint
//! and header shape. Requests therefore carry the header profile of an
//! ordinary desktop Chrome navigation rather than whatever a bare HTTP
//! library would send.

use http::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, CACHE_CONTROL, CONNECTION,
    COOKIE, USER_AGENT,
};

const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

const BROWSER_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

/// Header profile for both the priming navigation and the usage fetch.
pub fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(CHROME_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers.insert(
        ACCEPT_ENCODING,
        HeaderValue::from_static("gzip, deflate, br"),
    );
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers
}

/// Browser headers plus a `Cookie` header. A cookie value that fails header
/// validation (control characters and the like) is dropped rather than
/// aborting the request.
pub fn browser_headers_with_cookie(cookie: &str) -> HeaderMap {
    let mut headers = browser_headers();
    if let Ok(value) = HeaderValue::from_str(cookie) {
        headers.insert(COOKIE, value);
    } else {
        log::debug!("cookie header rejected by validation, sending without it");
    }
    headers
}
