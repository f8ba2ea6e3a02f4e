//! Error types for greetcard
//!
//! Covers the failure modes of the claim flow and its collaborators:
//! - Payload validation
//! - One-time policy rejections
//! - Send capability (mail relay) failures
//! - Platform effects and the client-side flag store
//!
//! The card state machine has no error type: every input is either a defined
//! transition or ignored.

use std::time::Duration;

/// Field of a claim payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClaimField {
    /// Recipient address
    To,
    /// Subject line
    Subject,
    /// Message body
    Message,
}

impl ClaimField {
    /// Wire name of the field
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::To => "to",
            Self::Subject => "subject",
            Self::Message => "message",
        }
    }
}

impl std::fmt::Display for ClaimField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claim attempt errors
#[derive(Debug, thiserror::Error)]
pub enum ClaimError {
    /// A required payload field is missing or blank
    #[error("missing required field: {0}")]
    ValidationFailed(ClaimField),

    /// The identifier has already claimed (or has a claim in flight)
    #[error("identifier has already claimed")]
    AlreadyClaimed,

    /// The caller could not be identified and the policy rejects such callers
    #[error("caller could not be identified")]
    Unidentified,

    /// The send capability failed; the reservation was released
    #[error("send failed: {0}")]
    SendFailed(#[from] NotifyError),
}

impl ClaimError {
    /// Check if the caller may retry the same claim
    ///
    /// Only send failures are retryable; policy rejections are terminal for
    /// the identifier and validation failures need corrected input.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SendFailed(_))
    }

    /// HTTP status code equivalent for this error
    #[inline]
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::ValidationFailed(_) | Self::Unidentified => 400,
            Self::AlreadyClaimed => 403,
            Self::SendFailed(_) => 500,
        }
    }

    /// Short label used in logs and metrics
    #[inline]
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::ValidationFailed(_) => "validation_failed",
            Self::AlreadyClaimed => "already_claimed",
            Self::Unidentified => "unidentified",
            Self::SendFailed(_) => "send_failed",
        }
    }
}

/// Send capability errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    /// Relay answered with a non-success status
    #[error("relay rejected message with status {status}")]
    Rejected {
        /// HTTP status returned by the relay
        status: u16,
    },

    /// Relay could not be reached
    #[error("relay transport error: {0}")]
    Transport(String),

    /// Relay call exceeded the configured bound
    #[error("relay call timed out after {0:?}")]
    Timeout(Duration),

    /// Relay is not usable with the current configuration
    #[error("relay misconfigured: {0}")]
    Misconfigured(String),
}

/// Platform effect errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EffectError {
    /// Platform does not expose the capability (e.g. no vibration motor)
    #[error("effect not supported on this platform")]
    Unsupported,
}

/// Client-side flag store errors
#[derive(Debug, thiserror::Error)]
pub enum FlagStoreError {
    /// Backing file could not be read or written
    #[error("flag store io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_error_display() {
        let err = ClaimError::ValidationFailed(ClaimField::Message);
        assert!(err.to_string().contains("message"));
    }

    #[test]
    fn claim_error_is_retryable() {
        assert!(ClaimError::SendFailed(NotifyError::Transport("down".into())).is_retryable());
        assert!(!ClaimError::AlreadyClaimed.is_retryable());
        assert!(!ClaimError::ValidationFailed(ClaimField::To).is_retryable());
        assert!(!ClaimError::Unidentified.is_retryable());
    }

    #[test]
    fn claim_error_status_codes() {
        assert_eq!(ClaimError::ValidationFailed(ClaimField::Subject).status_code(), 400);
        assert_eq!(ClaimError::Unidentified.status_code(), 400);
        assert_eq!(ClaimError::AlreadyClaimed.status_code(), 403);
        assert_eq!(
            ClaimError::SendFailed(NotifyError::Rejected { status: 502 }).status_code(),
            500
        );
    }

    #[test]
    fn notify_error_converts_into_send_failed() {
        let err: ClaimError = NotifyError::Timeout(Duration::from_secs(5)).into();
        assert!(matches!(err, ClaimError::SendFailed(NotifyError::Timeout(_))));
    }
}
