//! One-time submission guard
//!
//! [`SubmissionGuard::attempt_claim`] enforces at most one successful claim
//! per identifier:
//! 1. validate the payload
//! 2. reserve the identifier (atomic insert-if-absent)
//! 3. send through the [`Notifier`]
//! 4. confirm on success, release on failure so the caller may retry
//!
//! A claim dropped before step 4 (the HTTP client went away mid-send) still
//! releases its reservation, from a task spawned when the claim is dropped.

use super::identity::{Identifier, UnknownCallerPolicy};
use super::payload::{ClaimPayload, OutboundMail};
use super::registry::{ReservationToken, SubmissionRegistry};
use crate::error::{ClaimError, NotifyError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Send capability backed by an external mail relay
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `mail`; success or failure only
    async fn send(&self, mail: &OutboundMail) -> Result<(), NotifyError>;
}

/// Successful claim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    /// Identifier that claimed
    pub identifier: Identifier,
    /// When the claim was recorded
    pub at: DateTime<Utc>,
}

/// Policy object enforcing one claim per identifier
#[derive(Clone)]
pub struct SubmissionGuard {
    registry: Arc<dyn SubmissionRegistry>,
    notifier: Arc<dyn Notifier>,
    sender: String,
    unknown_policy: UnknownCallerPolicy,
}

impl std::fmt::Debug for SubmissionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionGuard")
            .field("sender", &self.sender)
            .field("unknown_policy", &self.unknown_policy)
            .finish_non_exhaustive()
    }
}

impl SubmissionGuard {
    /// Create a guard over `registry` sending through `notifier` as `sender`
    #[must_use]
    pub fn new(
        registry: Arc<dyn SubmissionRegistry>,
        notifier: Arc<dyn Notifier>,
        sender: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            notifier,
            sender: sender.into(),
            unknown_policy: UnknownCallerPolicy::default(),
        }
    }

    /// Set the policy for unidentified callers
    #[inline]
    #[must_use]
    pub fn with_unknown_policy(mut self, policy: UnknownCallerPolicy) -> Self {
        self.unknown_policy = policy;
        self
    }

    /// Backing registry
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<dyn SubmissionRegistry> {
        &self.registry
    }

    /// Whether `id` may still claim
    pub async fn can_submit(&self, id: &Identifier) -> bool {
        !self.registry.contains(id).await
    }

    /// Mark `id` as having claimed (idempotent)
    pub async fn record_submission(&self, id: &Identifier) {
        self.registry.confirm(id).await;
    }

    /// Attempt the one-time claim for `id`
    ///
    /// # Errors
    /// - `ClaimError::ValidationFailed` if a field is missing or blank; nothing is sent
    /// - `ClaimError::Unidentified` if `id` is the sentinel and the policy rejects it
    /// - `ClaimError::AlreadyClaimed` if `id` has claimed or has a claim in flight
    /// - `ClaimError::SendFailed` if the notifier fails; the identifier stays unclaimed
    pub async fn attempt_claim(
        &self,
        id: &Identifier,
        payload: &ClaimPayload,
    ) -> Result<Sent, ClaimError> {
        let result = self.claim(id, payload).await;

        let outcome = match &result {
            Ok(_) => "sent",
            Err(e) => e.label(),
        };
        metrics::counter!("greetcard_claims_total", "outcome" => outcome).increment(1);

        match &result {
            Ok(_) => tracing::info!(caller = %id.fingerprint(), "claim sent"),
            Err(ClaimError::SendFailed(e)) => {
                tracing::warn!(caller = %id.fingerprint(), "claim send failed: {e}");
            }
            Err(e) => tracing::info!(caller = %id.fingerprint(), "claim rejected: {e}"),
        }

        result
    }

    async fn claim(&self, id: &Identifier, payload: &ClaimPayload) -> Result<Sent, ClaimError> {
        let valid = payload.validate()?;

        if id.is_unknown() && self.unknown_policy == UnknownCallerPolicy::Reject {
            return Err(ClaimError::Unidentified);
        }

        let Some(token) = self.registry.try_reserve(id).await else {
            return Err(ClaimError::AlreadyClaimed);
        };
        let reservation = Reservation::new(Arc::clone(&self.registry), id.clone(), token);

        let mail = valid.to_mail(&self.sender);
        if let Err(e) = self.notifier.send(&mail).await {
            reservation.release().await;
            return Err(ClaimError::SendFailed(e));
        }

        reservation.confirm().await;
        Ok(Sent {
            identifier: id.clone(),
            at: Utc::now(),
        })
    }
}

/// Pending reservation owned by one in-flight claim
///
/// Settled by [`confirm`](Self::confirm) or [`release`](Self::release).
/// Dropping it unsettled spawns the release on the current runtime.
struct Reservation {
    registry: Arc<dyn SubmissionRegistry>,
    id: Identifier,
    token: ReservationToken,
    settled: bool,
}

impl Reservation {
    fn new(
        registry: Arc<dyn SubmissionRegistry>,
        id: Identifier,
        token: ReservationToken,
    ) -> Self {
        Self {
            registry,
            id,
            token,
            settled: false,
        }
    }

    async fn confirm(mut self) {
        self.registry.confirm(&self.id).await;
        self.settled = true;
    }

    async fn release(mut self) {
        self.registry.release(&self.id, self.token).await;
        self.settled = true;
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        tracing::debug!(caller = %self.id.fingerprint(), "claim abandoned mid-send");

        let registry = Arc::clone(&self.registry);
        let id = self.id.clone();
        let token = self.token;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { registry.release(&id, token).await });
            }
            Err(_) => {
                tracing::warn!(caller = %id.fingerprint(), "no runtime to release reservation");
            }
        }
    }
}
