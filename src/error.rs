use thiserror::Error;

use crate::models::{SessionId, UserId};

/// Every failure the voting core can report to its caller.
///
/// Transport and parsing failures are normalized into these kinds in
/// [`crate::api`] before they reach the components.
#[derive(Debug, Error)]
pub enum VoteError {
    #[error("authentication rejected: {0}")]
    AuthRejected(String),

    #[error("authentication service unavailable: {0}")]
    AuthUnavailable(String),

    /// Credentials could not be recovered; the caller must authenticate again.
    #[error("session expired, re-authentication required")]
    SessionExpired,

    #[error("participant roster unavailable: {0}")]
    RosterUnavailable(String),

    #[error("invalid score for user {user_id}: {reason}")]
    InvalidScore { user_id: UserId, reason: String },

    #[error("ballot is incomplete: {missing} target(s) not scored")]
    IncompleteBallot { missing: usize },

    #[error("voting session is closed")]
    SessionClosed,

    #[error("votes already submitted for session {0}")]
    AlreadySubmitted(SessionId),

    #[error("submission rejected: {0}")]
    SubmissionRejected(String),

    #[error("a submission is already in flight")]
    SubmissionInProgress,

    /// A newer request for the same resource was issued; this result was dropped.
    #[error("request superseded by a newer one")]
    Superseded,

    #[error("forbidden: {0}")]
    Forbidden(String),

    /// No response was received at all.
    #[error("network error: {0}")]
    Network(String),

    #[error("server responded with {status}: {message}")]
    Server { status: u16, message: String },

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl VoteError {
    /// Errors after which the credential store holds no usable credential.
    pub fn is_fatal_to_session(&self) -> bool {
        matches!(self, VoteError::SessionExpired | VoteError::AuthRejected(_))
    }
}

impl From<reqwest::Error> for VoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            VoteError::Decode(e.to_string())
        } else if e.is_builder() {
            VoteError::Config(e.to_string())
        } else {
            VoteError::Network(e.to_string())
        }
    }
}
