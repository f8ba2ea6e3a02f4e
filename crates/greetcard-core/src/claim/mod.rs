//! One-time claim flow
//!
//! The card's embedded form lets each visitor request the voucher exactly
//! once. The server-side [`SubmissionGuard`] is the authority; the client
//! keeps only an advisory flag (see [`crate::client`]).

pub mod guard;
pub mod identity;
pub mod payload;
pub mod registry;
pub mod response;

pub use guard::{Notifier, Sent, SubmissionGuard};
pub use identity::{Identifier, UnknownCallerPolicy, UNKNOWN_IDENTIFIER};
pub use payload::{ClaimPayload, OutboundMail, ValidClaim};
pub use registry::{
    ExpiringRegistry, MemoryRegistry, ReservationToken, SubmissionRecord, SubmissionRegistry,
    SubmissionStatus,
};
pub use response::ClaimResponse;
