//! Testing utilities for the greetcard workspace
//!
//! Shared fixtures and scripted notifiers.

#![allow(missing_docs)]

use async_trait::async_trait;
use greetcard_core::claim::{ClaimPayload, Identifier, MemoryRegistry, Notifier, OutboundMail};
use greetcard_core::error::NotifyError;
use greetcard_core::SubmissionGuard;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const SENDER: &str = "card@example.com";
pub const SCENARIO_IP: &str = "203.0.113.5";

pub fn scenario_identifier() -> Identifier {
    Identifier::new(SCENARIO_IP)
}

pub fn scenario_payload() -> ClaimPayload {
    ClaimPayload::new("x@example.com", "a@b.com", "build me a site")
}

/// Notifier that succeeds and keeps every mail, optionally after a delay
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<OutboundMail>>,
    delay: Option<Duration>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold each send for `delay` so concurrent attempts overlap
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            sent: Mutex::default(),
            delay: Some(delay),
        }
    }

    pub fn count(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn mails(&self) -> Vec<OutboundMail> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, mail: &OutboundMail) -> Result<(), NotifyError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.sent.lock().push(mail.clone());
        Ok(())
    }
}

/// Notifier that fails its first `failures` sends, then records like
/// [`RecordingNotifier`]
#[derive(Debug)]
pub struct FlakyNotifier {
    failures_left: AtomicUsize,
    attempts: AtomicUsize,
    inner: RecordingNotifier,
}

impl FlakyNotifier {
    pub fn failing(failures: usize) -> Self {
        Self {
            failures_left: AtomicUsize::new(failures),
            attempts: AtomicUsize::new(0),
            inner: RecordingNotifier::new(),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn delivered(&self) -> usize {
        self.inner.count()
    }
}

#[async_trait]
impl Notifier for FlakyNotifier {
    async fn send(&self, mail: &OutboundMail) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(NotifyError::Rejected { status: 503 });
        }
        self.inner.send(mail).await
    }
}

/// Guard over a fresh in-memory registry
pub fn memory_guard(notifier: Arc<dyn Notifier>) -> SubmissionGuard {
    SubmissionGuard::new(Arc::new(MemoryRegistry::new()), notifier, SENDER)
}
