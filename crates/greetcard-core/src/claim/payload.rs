//! Claim payload and the outbound mail built from it

use crate::error::{ClaimError, ClaimField};
use serde::{Deserialize, Serialize};

/// Footer appended to the HTML alternative of every claim mail
pub const MAIL_FOOTER: &str = "Sent via Birthday Card App";

/// Body of a claim request
///
/// Every field is optional on the wire so that a missing field is reported
/// as a validation failure rather than a parse error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimPayload {
    /// Recipient address
    #[serde(default)]
    pub to: Option<String>,
    /// Subject line
    #[serde(default)]
    pub subject: Option<String>,
    /// Message body
    #[serde(default)]
    pub message: Option<String>,
}

impl ClaimPayload {
    /// Build a payload with every field present
    #[must_use]
    pub fn new(
        to: impl Into<String>,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            to: Some(to.into()),
            subject: Some(subject.into()),
            message: Some(message.into()),
        }
    }

    /// Check that every field is present and not blank
    ///
    /// # Errors
    /// - `ClaimError::ValidationFailed` naming the first offending field
    pub fn validate(&self) -> Result<ValidClaim<'_>, ClaimError> {
        Ok(ValidClaim {
            to: required(self.to.as_deref(), ClaimField::To)?,
            subject: required(self.subject.as_deref(), ClaimField::Subject)?,
            message: required(self.message.as_deref(), ClaimField::Message)?,
        })
    }
}

fn required(value: Option<&str>, field: ClaimField) -> Result<&str, ClaimError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ClaimError::ValidationFailed(field)),
    }
}

/// A payload that passed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidClaim<'a> {
    /// Recipient address
    pub to: &'a str,
    /// Subject line
    pub subject: &'a str,
    /// Message body
    pub message: &'a str,
}

impl ValidClaim<'_> {
    /// Render the mail handed to the send capability
    #[must_use]
    pub fn to_mail(&self, from: &str) -> OutboundMail {
        OutboundMail {
            from: from.to_string(),
            to: self.to.to_string(),
            subject: self.subject.to_string(),
            text: self.message.to_string(),
            html: render_html(self.message),
        }
    }
}

/// Mail delivered through the relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMail {
    /// Sender address
    pub from: String,
    /// Recipient address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// Plain-text body
    pub text: String,
    /// HTML alternative
    pub html: String,
}

fn render_html(message: &str) -> String {
    let body = escape_html(message).replace('\n', "<br>");
    format!(
        "<div style=\"font-family: Arial, sans-serif; line-height: 1.6;\">\
         <p>{body}</p>\
         <p style=\"margin-top: 20px; color: #666;\">{MAIL_FOOTER}</p>\
         </div>"
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
