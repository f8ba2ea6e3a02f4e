//! Greetcard Core - interactive greeting card with a one-time claim
//!
//! Two independent pieces:
//! - [`card`]: open/close state machine with time-gated content visibility
//!   and a celebration burst on every open
//! - [`claim`]: server-side guard allowing each caller to claim once, plus
//!   the advisory client-side form model in [`client`]
//!
//! # Example
//!
//! ```rust,ignore
//! use greetcard_core::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example(notifier: Arc<dyn Notifier>) {
//! let guard = SubmissionGuard::new(Arc::new(MemoryRegistry::new()), notifier, "card@example.com");
//! let id = Identifier::from_headers(Some("203.0.113.5"), None);
//! let payload = ClaimPayload::new("x@example.com", "a@b.com", "build me a site");
//!
//! assert!(guard.attempt_claim(&id, &payload).await.is_ok());
//! assert!(guard.attempt_claim(&id, &payload).await.is_err());
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod card;
pub mod claim;
pub mod client;
pub mod error;

pub use card::{
    CardEffect, CardEffects, CardEvent, CardHandle, CardMachine, CardRuntime, CardSession,
    CardState, ConfettiBurst, EffectRecord, EffectRecorder, NoopEffects, Phase, TimerQueue,
};
pub use claim::{
    ClaimPayload, ClaimResponse, ExpiringRegistry, Identifier, MemoryRegistry, Notifier,
    OutboundMail, Sent, SubmissionGuard, SubmissionRegistry, UnknownCallerPolicy,
};
pub use client::{
    ClaimForm, ClaimStatus, FileFlagStore, FlagStore, FormStage, MemoryFlagStore, Notice,
};
pub use error::{ClaimError, ClaimField, EffectError, FlagStoreError, NotifyError};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Greetcard Core
    pub use crate::{
        CardSession, CardState, ClaimError, ClaimPayload, Identifier, MemoryRegistry, Notifier,
        OutboundMail, Phase, SubmissionGuard, SubmissionRegistry,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
