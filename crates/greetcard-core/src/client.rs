//! Client-side claim form model
//!
//! Mirrors the guard with a locally persisted flag so the form is hidden
//! after a known submission. The flag is advisory: it only affects what the
//! visitor sees and is never sent to, or trusted by, the server.
//!
//! A submission goes editing → confirming → sending and back to editing
//! once its outcome is applied. Only [`ClaimForm::confirm`] starts a send.

use crate::claim::response::MISSING_FIELDS_MESSAGE;
use crate::claim::{ClaimPayload, ClaimResponse};
use crate::error::FlagStoreError;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Name of the persisted "already submitted" flag
pub const SUBMITTED_FLAG: &str = "featureRequestSubmitted";

/// Named boolean storage with no expiry
pub trait FlagStore: Send + Sync {
    /// Read a flag; unset flags read as `false`
    ///
    /// # Errors
    /// - `FlagStoreError::Io` if the backing storage cannot be read
    fn get(&self, name: &str) -> Result<bool, FlagStoreError>;

    /// Write a flag
    ///
    /// # Errors
    /// - `FlagStoreError::Io` if the backing storage cannot be written
    fn set(&self, name: &str, value: bool) -> Result<(), FlagStoreError>;
}

/// In-memory flags, lost with the process
#[derive(Debug, Default)]
pub struct MemoryFlagStore {
    flags: Mutex<HashMap<String, bool>>,
}

impl MemoryFlagStore {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl FlagStore for MemoryFlagStore {
    fn get(&self, name: &str) -> Result<bool, FlagStoreError> {
        Ok(self.flags.lock().get(name).copied().unwrap_or(false))
    }

    fn set(&self, name: &str, value: bool) -> Result<(), FlagStoreError> {
        self.flags.lock().insert(name.to_string(), value);
        Ok(())
    }
}

/// Flags persisted as one file per flag under a directory
#[derive(Debug, Clone)]
pub struct FileFlagStore {
    dir: PathBuf,
}

impl FileFlagStore {
    /// Store flags under `dir`, created on first write
    #[inline]
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the flag files
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl FlagStore for FileFlagStore {
    fn get(&self, name: &str) -> Result<bool, FlagStoreError> {
        match std::fs::read_to_string(self.path(name)) {
            Ok(content) => Ok(content.trim() == "true"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, name: &str, value: bool) -> Result<(), FlagStoreError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path(name), if value { "true" } else { "false" })?;
        Ok(())
    }
}

/// Classified outcome of one submission attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    /// Server accepted and sent the claim
    Sent,
    /// Server reports this visitor already claimed
    AlreadyClaimed,
    /// Server reports a missing or blank field
    ValidationFailed,
    /// Anything else, including transport failures
    Failed,
}

impl ClaimStatus {
    /// Classify an HTTP response
    ///
    /// Only a 400 carrying the missing-fields message is a validation
    /// failure; other 400s (an unidentified caller) are plain failures.
    #[must_use]
    pub fn classify(status: u16, body: Option<&ClaimResponse>) -> Self {
        if (200..300).contains(&status) {
            Self::Sent
        } else if body.and_then(|b| b.already_sent).unwrap_or(false) {
            Self::AlreadyClaimed
        } else if status == 400 && body.is_some_and(|b| b.message == MISSING_FIELDS_MESSAGE) {
            Self::ValidationFailed
        } else {
            Self::Failed
        }
    }

    /// Whether the advisory flag should be set
    #[inline]
    #[must_use]
    pub fn marks_submitted(self) -> bool {
        matches!(self, Self::Sent | Self::AlreadyClaimed)
    }

    /// Notification shown for this outcome
    #[must_use]
    pub fn notice(self) -> Notice {
        match self {
            Self::Sent => Notice {
                level: NoticeLevel::Success,
                title: "Request Sent!",
                description: "Your website request has been submitted successfully.",
            },
            Self::AlreadyClaimed => Notice {
                level: NoticeLevel::Error,
                title: "Already Submitted",
                description: "You have already submitted a feature request.",
            },
            Self::ValidationFailed => Notice {
                level: NoticeLevel::Error,
                title: "Missing Information",
                description: "Please fill in every field before sending.",
            },
            Self::Failed => Notice {
                level: NoticeLevel::Error,
                title: "Error",
                description: "Failed to send your request. Please try again.",
            },
        }
    }
}

/// Severity of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    /// Positive outcome
    Success,
    /// Negative outcome
    Error,
    /// Neutral information
    Info,
}

/// Transient notification shown after a submission attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Notice {
    /// Severity
    pub level: NoticeLevel,
    /// Headline
    pub title: &'static str,
    /// Body text
    pub description: &'static str,
}

/// Dialog asking the visitor to confirm before anything is sent
pub const CONFIRM_PROMPT: Notice = Notice {
    level: NoticeLevel::Info,
    title: "Confirm Voucher Claim",
    description: "Are you sure you want to claim your voucher? \
                  Remember, you can only submit one request.",
};

/// Banner shown above the form once an attempt has been made
pub const ONE_SUBMISSION_NOTICE: Notice = Notice {
    level: NoticeLevel::Info,
    title: "One submission only",
    description: "Please note that you can only submit one feature request.",
};

/// Where the form is in a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormStage {
    /// Fields editable, nothing pending
    #[default]
    Editing,
    /// Waiting for the visitor to confirm
    Confirming,
    /// Request in flight; the submit control is disabled
    Sending,
}

/// Claim form embedded in the opened card
#[derive(Debug)]
pub struct ClaimForm<S> {
    store: S,
    submitted: bool,
    stage: FormStage,
    attempts: u32,
    default_recipient: String,
    draft: ClaimPayload,
}

impl<S: FlagStore> ClaimForm<S> {
    /// Mount the form, reading the advisory flag
    ///
    /// An unreadable flag is treated as unset.
    pub fn mount(store: S, default_recipient: impl Into<String>) -> Self {
        let submitted = store.get(SUBMITTED_FLAG).unwrap_or_else(|e| {
            tracing::warn!("could not read submission flag: {e}");
            false
        });
        let default_recipient = default_recipient.into();
        Self {
            store,
            submitted,
            stage: FormStage::Editing,
            attempts: 0,
            draft: blank_draft(&default_recipient),
            default_recipient,
        }
    }

    /// Whether the form (rather than the "already submitted" banner) is shown
    #[inline]
    #[must_use]
    pub fn should_show_form(&self) -> bool {
        !self.submitted
    }

    /// Current submission stage
    #[inline]
    #[must_use]
    pub fn stage(&self) -> FormStage {
        self.stage
    }

    /// Confirmed attempts so far in this mount
    #[inline]
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Banner to show above the form, once an attempt has been made
    #[inline]
    #[must_use]
    pub fn banner(&self) -> Option<Notice> {
        (self.attempts > 0).then_some(ONE_SUBMISSION_NOTICE)
    }

    /// Label of the submit control
    #[inline]
    #[must_use]
    pub fn submit_label(&self) -> &'static str {
        match self.stage {
            FormStage::Sending => "Sending...",
            FormStage::Editing | FormStage::Confirming => "Claim Voucher",
        }
    }

    /// Ask to submit; opens the confirmation dialog
    ///
    /// Returns the prompt to show, or `None` if the form is hidden or a
    /// submission is already under way.
    pub fn request_submit(&mut self) -> Option<Notice> {
        if self.submitted || self.stage != FormStage::Editing {
            return None;
        }
        self.stage = FormStage::Confirming;
        Some(CONFIRM_PROMPT)
    }

    /// Dismiss the confirmation dialog without sending
    pub fn cancel(&mut self) {
        if self.stage == FormStage::Confirming {
            self.stage = FormStage::Editing;
        }
    }

    /// Confirm the pending submission and start sending
    ///
    /// Returns the payload to send, or `None` unless the dialog is open.
    pub fn confirm(&mut self) -> Option<ClaimPayload> {
        if self.stage != FormStage::Confirming {
            return None;
        }
        self.stage = FormStage::Sending;
        self.attempts += 1;
        Some(self.draft.clone())
    }

    /// Set the subject line
    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.draft.subject = Some(subject.into());
    }

    /// Set the message body
    pub fn set_message(&mut self, message: impl Into<String>) {
        self.draft.message = Some(message.into());
    }

    /// Override the recipient
    pub fn set_recipient(&mut self, to: impl Into<String>) {
        self.draft.to = Some(to.into());
    }

    /// Payload to submit
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &ClaimPayload {
        &self.draft
    }

    /// Record the outcome of an attempt and return the notice to show
    ///
    /// Closes the dialog and re-enables the form. A flag write failure is
    /// logged and otherwise ignored.
    pub fn apply(&mut self, status: ClaimStatus) -> Notice {
        self.stage = FormStage::Editing;
        if status.marks_submitted() {
            if let Err(e) = self.store.set(SUBMITTED_FLAG, true) {
                tracing::warn!("could not persist submission flag: {e}");
            }
            self.submitted = true;
        }
        if status == ClaimStatus::Sent {
            self.draft = blank_draft(&self.default_recipient);
        }
        status.notice()
    }
}

fn blank_draft(recipient: &str) -> ClaimPayload {
    ClaimPayload {
        to: Some(recipient.to_string()),
        subject: Some(String::new()),
        message: Some(String::new()),
    }
}
