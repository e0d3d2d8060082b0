//! Caller-facing outcome types.

use std::fmt;

use crate::classify::FailureKind;
use crate::usage::UsagePayload;

/// Result of one complete pipeline invocation. Built fresh every time, never
/// cached.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Success(UsagePayload),
    Failure(FetchFailure),
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }

    pub fn failure(&self) -> Option<&FetchFailure> {
        match self {
            FetchOutcome::Failure(failure) => Some(failure),
            FetchOutcome::Success(_) => None,
        }
    }
}

/// The single synthesized error returned when an invocation fails.
///
/// The message is bounded, never contains the credential, and for
/// challenge-classified failures carries remediation guidance instead of a
/// raw error dump.
#[derive(Debug, Clone)]
pub struct FetchFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FailureKind::BotChallenge => write!(f, "bot challenge: {}", self.message),
            FailureKind::Http(status) => write!(f, "http {status}: {}", self.message),
            FailureKind::Transport => write!(f, "transport failure: {}", self.message),
        }
    }
}

impl std::error::Error for FetchFailure {}
