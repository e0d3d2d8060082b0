//! Failure classification.
//!
//! One heuristic shared by the cookie acquirer and the request dispatcher:
//! decide whether a failed attempt was rejected by the bot-mitigation layer
//! (worth retrying with a different client), by the API itself (not worth
//! retrying), or never produced a usable response at all.

use once_cell::sync::Lazy;
use regex::RegexBuilder;

/// Category assigned to a failed fetch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The anti-automation layer served an interstitial challenge or a 403.
    BotChallenge,
    /// The API rejected the request for a substantive reason.
    Http(u16),
    /// No usable response: network failure, timeout, malformed body.
    Transport,
}

/// Literal markers observed on interstitial challenge pages.
const CHALLENGE_MARKERS: [&str; 8] = [
    "just a moment",
    "checking your browser",
    "verify you are human",
    "cf-browser-verification",
    "challenge-platform",
    "cf-chl",
    "enable javascript and cookies",
    "attention required",
];

static CHALLENGE_RE: Lazy<regex::Regex> = Lazy::new(|| {
    let alternation = CHALLENGE_MARKERS
        .iter()
        .map(|marker| regex::escape(marker))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&alternation)
        .case_insensitive(true)
        .build()
        .expect("invalid challenge marker regex")
});

/// Returns true if the text matches any known challenge-page marker.
pub fn is_challenge_text(text: &str) -> bool {
    CHALLENGE_RE.is_match(text)
}

/// Classify a failed attempt from its HTTP status (if one was observed) and
/// its textual detail.
pub fn classify(status: Option<u16>, text: &str) -> FailureKind {
    if status == Some(403) || is_challenge_text(text) {
        return FailureKind::BotChallenge;
    }
    match status {
        Some(code) => FailureKind::Http(code),
        None => FailureKind::Transport,
    }
}

impl FailureKind {
    /// Whether the dispatcher should advance to the next transport strategy.
    ///
    /// Challenge rejections depend on client fingerprint, transport failures
    /// on network luck; both can succeed elsewhere. A substantive HTTP error
    /// will repeat on every client.
    pub fn is_retryable(self) -> bool {
        matches!(self, FailureKind::BotChallenge | FailureKind::Transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_403_is_bot_challenge() {
        assert_eq!(
            classify(Some(403), "HTTP 403: Forbidden"),
            FailureKind::BotChallenge
        );
    }

    #[test]
    fn challenge_markers_are_case_insensitive() {
        assert_eq!(
            classify(Some(503), "<title>Just a Moment...</title>"),
            FailureKind::BotChallenge
        );
        assert!(is_challenge_text("CHECKING YOUR BROWSER before accessing"));
    }

    #[test]
    fn challenge_marker_without_status_is_bot_challenge() {
        assert_eq!(
            classify(None, "body contained cf-chl-widget"),
            FailureKind::BotChallenge
        );
    }

    #[test]
    fn plain_http_error_keeps_status() {
        assert_eq!(
            classify(Some(404), "HTTP 404: not found"),
            FailureKind::Http(404)
        );
        assert_eq!(
            classify(Some(500), "HTTP 500: internal"),
            FailureKind::Http(500)
        );
    }

    #[test]
    fn no_status_is_transport() {
        assert_eq!(
            classify(None, "connection reset by peer"),
            FailureKind::Transport
        );
    }

    #[test]
    fn retryability_split() {
        assert!(FailureKind::BotChallenge.is_retryable());
        assert!(FailureKind::Transport.is_retryable());
        assert!(!FailureKind::Http(404).is_retryable());
        assert!(!FailureKind::Http(500).is_retryable());
    }
}
