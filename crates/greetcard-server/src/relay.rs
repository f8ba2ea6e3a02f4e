//! Mail delivery
//!
//! - [`RelayNotifier`]: posts each mail as JSON to an HTTP relay
//! - [`LogNotifier`]: dry run, logs and reports success

use crate::config::RelaySettings;
use async_trait::async_trait;
use greetcard_core::claim::{Notifier, OutboundMail};
use greetcard_core::error::NotifyError;
use std::time::Duration;

/// Credential variables, in lookup order
pub const USER_VARS: [&str; 2] = ["GREETCARD_RELAY_USER", "EMAIL_USER"];
/// Password variables, in lookup order
pub const PASS_VARS: [&str; 2] = ["GREETCARD_RELAY_PASS", "EMAIL_PASS"];

/// Basic-auth credentials for the relay
#[derive(Clone, PartialEq, Eq)]
pub struct RelayCredentials {
    user: String,
    pass: String,
}

impl std::fmt::Debug for RelayCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayCredentials")
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

impl RelayCredentials {
    #[must_use]
    pub fn new(user: impl Into<String>, pass: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            pass: pass.into(),
        }
    }

    /// Read credentials from the process environment
    #[must_use]
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read credentials through `lookup`; both user and password must be set
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let first = |names: [&str; 2]| names.into_iter().find_map(&lookup);
        Some(Self::new(first(USER_VARS)?, first(PASS_VARS)?))
    }
}

/// Notifier posting to an HTTP mail relay
#[derive(Debug, Clone)]
pub struct RelayNotifier {
    client: reqwest::Client,
    url: String,
    credentials: Option<RelayCredentials>,
    timeout: Option<Duration>,
}

impl RelayNotifier {
    /// Build a notifier from relay settings
    ///
    /// # Errors
    /// - `NotifyError::Misconfigured` if no URL is set or the client cannot be built
    pub fn new(
        settings: &RelaySettings,
        credentials: Option<RelayCredentials>,
    ) -> Result<Self, NotifyError> {
        let url = settings
            .url
            .clone()
            .ok_or_else(|| NotifyError::Misconfigured("relay url is not set".into()))?;

        let timeout = settings.timeout();
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| NotifyError::Misconfigured(e.to_string()))?;

        if credentials.is_none() {
            tracing::warn!("no relay credentials configured; sending unauthenticated");
        }

        Ok(Self {
            client,
            url,
            credentials,
            timeout,
        })
    }

    /// Relay endpoint
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Notifier for RelayNotifier {
    async fn send(&self, mail: &OutboundMail) -> Result<(), NotifyError> {
        let mut request = self.client.post(&self.url).json(mail);
        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(&credentials.user, Some(&credentials.pass));
        }

        let response = request.send().await.map_err(|e| match self.timeout {
            Some(limit) if e.is_timeout() => NotifyError::Timeout(limit),
            _ => NotifyError::Transport(e.to_string()),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

/// Dry-run notifier; mails are logged and dropped
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, mail: &OutboundMail) -> Result<(), NotifyError> {
        tracing::info!(
            to = %mail.to,
            subject_len = mail.subject.len(),
            text_len = mail.text.len(),
            "dry run: mail not sent"
        );
        Ok(())
    }
}
