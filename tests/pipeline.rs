//! End-to-end pipeline behavior against scripted transports.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use http::header::{HeaderValue, COOKIE, SET_COOKIE};
use http::HeaderMap;
use url::Url;

use usagewatch::{
    percent_left, FailureKind, FetchOutcome, RawResponse, Transport, TransportError,
    TransportKind, UsageSession,
};

const USAGE_BODY: &str =
    r#"{"five_hour":{"utilization":42.4,"resets_at":"2025-01-01T00:00:00Z"}}"#;

const CHALLENGE_BODY: &str = concat!(
    "<!DOCTYPE html><html><head><title>Just a moment...</title></head>",
    "<body>Checking your browser before accessing</body></html>",
);

#[derive(Clone)]
enum Reply {
    Respond { status: u16, body: &'static str },
    Cookie { value: &'static str },
    Fail(&'static str),
    Hang,
}

struct StubTransport {
    kind: TransportKind,
    reply: Reply,
    calls: AtomicUsize,
    seen_cookie: Mutex<Option<String>>,
}

impl StubTransport {
    fn new(kind: TransportKind, reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            kind,
            reply,
            calls: AtomicUsize::new(0),
            seen_cookie: Mutex::new(None),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn seen_cookie(&self) -> Option<String> {
        self.seen_cookie.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for StubTransport {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    async fn get(&self, _url: &Url, headers: &HeaderMap) -> Result<RawResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.seen_cookie.lock().unwrap() = headers
            .get(COOKIE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        match &self.reply {
            Reply::Respond { status, body } => Ok(RawResponse {
                status: *status,
                headers: HeaderMap::new(),
                body: (*body).to_string(),
            }),
            Reply::Cookie { value } => {
                let mut response_headers = HeaderMap::new();
                response_headers.append(
                    SET_COOKIE,
                    HeaderValue::from_str(&format!("__cf_bm={value}; Path=/; HttpOnly")).unwrap(),
                );
                Ok(RawResponse {
                    status: 200,
                    headers: response_headers,
                    body: "<!DOCTYPE html><html></html>".to_string(),
                })
            }
            Reply::Fail(message) => Err(TransportError::Send((*message).to_string())),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Err(TransportError::Send("unreachable".to_string()))
            }
        }
    }
}

fn session_with(
    transports: &[Arc<StubTransport>],
    priming: &[Arc<StubTransport>],
) -> UsageSession {
    let as_dyn = |stubs: &[Arc<StubTransport>]| {
        stubs
            .iter()
            .map(|stub| stub.clone() as Arc<dyn Transport>)
            .collect::<Vec<_>>()
    };
    UsageSession::builder()
        .with_attempt_timeout(Duration::from_millis(200))
        .with_transports(as_dyn(transports))
        .with_priming_transports(as_dyn(priming))
        .build()
        .expect("session")
}

#[tokio::test]
async fn falls_through_challenges_to_the_working_strategy() {
    let first = StubTransport::new(TransportKind::Plain, Reply::Respond {
        status: 403,
        body: CHALLENGE_BODY,
    });
    let second = StubTransport::new(TransportKind::Raw, Reply::Respond {
        status: 403,
        body: CHALLENGE_BODY,
    });
    let third = StubTransport::new(TransportKind::Browser, Reply::Respond {
        status: 200,
        body: USAGE_BODY,
    });

    let session = session_with(&[first.clone(), second.clone(), third.clone()], &[]);
    let outcome = session.fetch_usage("abc123", "sk-test-token").await;

    let payload = match outcome {
        FetchOutcome::Success(payload) => payload,
        FetchOutcome::Failure(failure) => panic!("expected success, got {failure}"),
    };
    let window = payload.five_hour_window().expect("window");
    assert_eq!(percent_left(window.utilization), 58);

    assert_eq!(first.calls(), 1);
    assert_eq!(second.calls(), 1);
    assert_eq!(third.calls(), 1);
}

#[tokio::test]
async fn substantive_http_error_is_terminal() {
    let first = StubTransport::new(TransportKind::Plain, Reply::Respond {
        status: 404,
        body: r#"{"error":"organization not found"}"#,
    });
    let second = StubTransport::new(TransportKind::Raw, Reply::Respond {
        status: 200,
        body: USAGE_BODY,
    });

    let session = session_with(&[first.clone(), second.clone()], &[]);
    let outcome = session.fetch_usage("missing-org", "sk-test-token").await;

    let failure = outcome.failure().expect("failure");
    assert_eq!(failure.kind, FailureKind::Http(404));
    assert!(failure.message.contains("HTTP 404"));
    assert_eq!(first.calls(), 1);
    assert_eq!(second.calls(), 0, "remaining strategies must not run");
}

#[tokio::test]
async fn exhausted_challenges_return_remediation_guidance() {
    let stubs: Vec<Arc<StubTransport>> = [
        TransportKind::Plain,
        TransportKind::Raw,
        TransportKind::Browser,
    ]
    .into_iter()
    .map(|kind| {
        StubTransport::new(kind, Reply::Respond {
            status: 403,
            body: CHALLENGE_BODY,
        })
    })
    .collect();

    let session = session_with(&stubs, &[]);
    let outcome = session.fetch_usage("abc123", "sk-test-token").await;

    let failure = outcome.failure().expect("failure");
    assert_eq!(failure.kind, FailureKind::BotChallenge);
    assert!(
        failure.message.contains("bot-mitigation layer"),
        "remediation block missing: {}",
        failure.message
    );
    assert!(!failure.message.contains("sk-test-token"));
    for stub in &stubs {
        assert_eq!(stub.calls(), 1);
    }
}

#[tokio::test]
async fn transport_failures_advance_to_next_strategy() {
    let first = StubTransport::new(TransportKind::Plain, Reply::Fail("connection refused"));
    let second = StubTransport::new(TransportKind::Raw, Reply::Respond {
        status: 200,
        body: USAGE_BODY,
    });

    let session = session_with(&[first.clone(), second.clone()], &[]);
    let outcome = session.fetch_usage("abc123", "sk-test-token").await;

    assert!(outcome.is_success());
    assert_eq!(first.calls(), 1);
    assert_eq!(second.calls(), 1);
}

#[tokio::test]
async fn malformed_success_body_advances() {
    let first = StubTransport::new(TransportKind::Plain, Reply::Respond {
        status: 200,
        body: "<!DOCTYPE html>this is not json",
    });
    let second = StubTransport::new(TransportKind::Raw, Reply::Respond {
        status: 200,
        body: USAGE_BODY,
    });

    let session = session_with(&[first.clone(), second.clone()], &[]);
    let outcome = session.fetch_usage("abc123", "sk-test-token").await;

    assert!(outcome.is_success());
    assert_eq!(second.calls(), 1);
}

#[tokio::test]
async fn dispatch_timeout_advances_to_next_strategy() {
    let first = StubTransport::new(TransportKind::Plain, Reply::Hang);
    let second = StubTransport::new(TransportKind::Raw, Reply::Respond {
        status: 200,
        body: USAGE_BODY,
    });

    let session = session_with(&[first.clone(), second.clone()], &[]);
    let outcome = session.fetch_usage("abc123", "sk-test-token").await;

    assert!(outcome.is_success());
    assert_eq!(first.calls(), 1);
    assert_eq!(second.calls(), 1);
}

#[tokio::test]
async fn harvested_cookie_rides_along_and_is_cached() {
    let priming = StubTransport::new(TransportKind::Raw, Reply::Cookie { value: "bm-token" });
    let fetcher = StubTransport::new(TransportKind::Plain, Reply::Respond {
        status: 200,
        body: USAGE_BODY,
    });

    let session = session_with(&[fetcher.clone()], &[priming.clone()]);

    let outcome = session.fetch_usage("abc123", "sk-test-token").await;
    assert!(outcome.is_success());
    assert_eq!(
        fetcher.seen_cookie().as_deref(),
        Some("__cf_bm=bm-token; sessionKey=sk-test-token")
    );
    assert_eq!(
        priming.seen_cookie().as_deref(),
        Some("sessionKey=sk-test-token"),
        "priming request must not carry the not-yet-known mitigation cookie"
    );

    // Second invocation hits the cache; the priming transport is not touched.
    let outcome = session.fetch_usage("abc123", "sk-test-token").await;
    assert!(outcome.is_success());
    assert_eq!(priming.calls(), 1);
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn priming_timeout_does_not_fall_back() {
    let hanging = StubTransport::new(TransportKind::Raw, Reply::Hang);
    let fallback = StubTransport::new(TransportKind::Browser, Reply::Cookie { value: "late" });
    let fetcher = StubTransport::new(TransportKind::Plain, Reply::Respond {
        status: 200,
        body: USAGE_BODY,
    });

    let session = session_with(&[fetcher.clone()], &[hanging.clone(), fallback.clone()]);
    let outcome = session.fetch_usage("abc123", "sk-test-token").await;

    assert!(outcome.is_success(), "absent cookie must not fail the fetch");
    assert_eq!(hanging.calls(), 1);
    assert_eq!(fallback.calls(), 0, "timeout must abandon acquisition");
    assert_eq!(
        fetcher.seen_cookie().as_deref(),
        Some("sessionKey=sk-test-token")
    );
}

#[tokio::test]
async fn priming_failure_falls_back_to_second_transport() {
    let failing = StubTransport::new(TransportKind::Raw, Reply::Fail("tls handshake failed"));
    let fallback = StubTransport::new(TransportKind::Browser, Reply::Cookie { value: "bm2" });
    let fetcher = StubTransport::new(TransportKind::Plain, Reply::Respond {
        status: 200,
        body: USAGE_BODY,
    });

    let session = session_with(&[fetcher.clone()], &[failing.clone(), fallback.clone()]);
    let outcome = session.fetch_usage("abc123", "sk-test-token").await;

    assert!(outcome.is_success());
    assert_eq!(failing.calls(), 1);
    assert_eq!(fallback.calls(), 1);
    assert_eq!(
        fetcher.seen_cookie().as_deref(),
        Some("__cf_bm=bm2; sessionKey=sk-test-token")
    );
}

#[tokio::test]
async fn full_cookie_header_credential_is_passed_through() {
    let fetcher = StubTransport::new(TransportKind::Plain, Reply::Respond {
        status: 200,
        body: USAGE_BODY,
    });

    let session = session_with(&[fetcher.clone()], &[]);
    let credential = "sessionKey=abc; theme=dark";
    let outcome = session.fetch_usage("abc123", credential).await;

    assert!(outcome.is_success());
    assert_eq!(fetcher.seen_cookie().as_deref(), Some(credential));
}
