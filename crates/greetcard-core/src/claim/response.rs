//! Wire response of the claim endpoint

use super::guard::Sent;
use crate::error::ClaimError;
use serde::{Deserialize, Serialize};

/// Body for a successful claim
pub const SENT_MESSAGE: &str = "Email sent successfully";
/// Body for a validation failure
pub const MISSING_FIELDS_MESSAGE: &str = "Missing required fields";
/// Body for a policy rejection
pub const ALREADY_SENT_MESSAGE: &str = "You have already submitted your feature request";
/// Body for an unidentified caller under the reject policy
pub const UNIDENTIFIED_MESSAGE: &str = "Unable to identify caller";
/// Body for a send failure or unreadable request
pub const FAILED_MESSAGE: &str = "Failed to send email";

/// JSON body returned by `POST /claim`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimResponse {
    /// Human-readable outcome
    pub message: String,
    /// Present (and true) only on policy rejections
    #[serde(rename = "alreadySent", default, skip_serializing_if = "Option::is_none")]
    pub already_sent: Option<bool>,
}

impl ClaimResponse {
    fn plain(message: &str) -> Self {
        Self {
            message: message.to_string(),
            already_sent: None,
        }
    }

    /// Response for a request body that could not be read
    #[must_use]
    pub fn failed() -> (u16, Self) {
        (500, Self::plain(FAILED_MESSAGE))
    }

    /// Status code and body for a claim outcome
    #[must_use]
    pub fn from_outcome(outcome: &Result<Sent, ClaimError>) -> (u16, Self) {
        match outcome {
            Ok(_) => (200, Self::plain(SENT_MESSAGE)),
            Err(e @ ClaimError::ValidationFailed(_)) => {
                (e.status_code(), Self::plain(MISSING_FIELDS_MESSAGE))
            }
            Err(e @ ClaimError::Unidentified) => {
                (e.status_code(), Self::plain(UNIDENTIFIED_MESSAGE))
            }
            Err(e @ ClaimError::AlreadyClaimed) => (
                e.status_code(),
                Self {
                    message: ALREADY_SENT_MESSAGE.to_string(),
                    already_sent: Some(true),
                },
            ),
            Err(e @ ClaimError::SendFailed(_)) => (e.status_code(), Self::plain(FAILED_MESSAGE)),
        }
    }
}
