use crate::data::SessionKey;
use thiserror::Error;

/// Outcome of a handler that produced no message for either peer.
///
/// Peer rejections and per-bearer partial failures are not errors - they travel to the peers as
/// causes inside well-formed messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("no session {0}")]
    NotFound(SessionKey),

    #[error("session {0} already exists")]
    DuplicateKey(SessionKey),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("no handler for {0}")]
    UnexpectedMessage(&'static str),
}

impl SessionError {
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            SessionError::DuplicateKey(_) | SessionError::InvariantViolation(_)
        )
    }
}
