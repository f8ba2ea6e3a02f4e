//! Submission registries
//!
//! A [`SubmissionRegistry`] remembers which identifiers have claimed. The
//! only way to start a claim is [`SubmissionRegistry::try_reserve`], an
//! atomic insert-if-absent: two concurrent requests from one identifier can
//! never both observe "not yet submitted". Each reservation carries a
//! [`ReservationToken`]; releasing needs the matching token, so a stale
//! release can never drop a newer reservation of the same identifier.
//!
//! Backends:
//! - [`MemoryRegistry`]: `DashMap`, entries live for the whole process
//! - [`ExpiringRegistry`]: `moka` cache with a time-to-live and a capacity

use super::identity::Identifier;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use moka::future::Cache;
use moka::ops::compute::Op;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

static NEXT_RESERVATION: AtomicU64 = AtomicU64::new(1);

/// Handle to one pending reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ReservationToken(u64);

impl ReservationToken {
    fn next() -> Self {
        Self(NEXT_RESERVATION.fetch_add(1, Ordering::Relaxed))
    }
}

/// Lifecycle of a registry entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    /// Send in flight
    Pending,
    /// Mail sent; identifier is done
    Claimed,
}

/// Registry entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubmissionRecord {
    /// Entry status
    pub status: SubmissionStatus,
    /// Token of the reservation, while pending
    pub reservation: Option<ReservationToken>,
    /// When the entry last changed
    pub updated_at: DateTime<Utc>,
}

impl SubmissionRecord {
    fn pending(token: ReservationToken) -> Self {
        Self {
            status: SubmissionStatus::Pending,
            reservation: Some(token),
            updated_at: Utc::now(),
        }
    }

    fn claimed() -> Self {
        Self {
            status: SubmissionStatus::Claimed,
            reservation: None,
            updated_at: Utc::now(),
        }
    }

    /// Whether this is the pending entry created by `token`
    #[inline]
    #[must_use]
    pub fn is_reserved_by(&self, token: ReservationToken) -> bool {
        self.status == SubmissionStatus::Pending && self.reservation == Some(token)
    }
}

/// Store of identifiers that have claimed
#[async_trait]
pub trait SubmissionRegistry: Send + Sync {
    /// Whether `id` has an entry (pending or claimed)
    async fn contains(&self, id: &Identifier) -> bool;

    /// Atomically insert a pending entry for `id` if none exists
    ///
    /// Returns the new reservation's token if this call created the entry.
    async fn try_reserve(&self, id: &Identifier) -> Option<ReservationToken>;

    /// Mark `id` claimed, creating the entry if needed (idempotent)
    async fn confirm(&self, id: &Identifier);

    /// Drop the pending reservation made with `token`
    ///
    /// Claimed entries and reservations made with another token are left alone.
    async fn release(&self, id: &Identifier, token: ReservationToken);

    /// Entry for `id`, if any
    async fn record(&self, id: &Identifier) -> Option<SubmissionRecord>;

    /// Number of entries currently held
    async fn len(&self) -> u64;
}

/// Process-lifetime registry; never evicts
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    entries: DashMap<Identifier, SubmissionRecord>,
}

impl MemoryRegistry {
    /// Create an empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubmissionRegistry for MemoryRegistry {
    async fn contains(&self, id: &Identifier) -> bool {
        self.entries.contains_key(id)
    }

    async fn try_reserve(&self, id: &Identifier) -> Option<ReservationToken> {
        match self.entries.entry(id.clone()) {
            MapEntry::Occupied(_) => None,
            MapEntry::Vacant(slot) => {
                let token = ReservationToken::next();
                slot.insert(SubmissionRecord::pending(token));
                Some(token)
            }
        }
    }

    async fn confirm(&self, id: &Identifier) {
        self.entries.insert(id.clone(), SubmissionRecord::claimed());
    }

    async fn release(&self, id: &Identifier, token: ReservationToken) {
        self.entries
            .remove_if(id, |_, record| record.is_reserved_by(token));
    }

    async fn record(&self, id: &Identifier) -> Option<SubmissionRecord> {
        self.entries.get(id).map(|entry| *entry.value())
    }

    async fn len(&self) -> u64 {
        self.entries.len() as u64
    }
}

/// Registry whose entries expire after a fixed lifetime
///
/// Bounded in both time and size; an identifier may claim again once its
/// entry has expired or been evicted.
#[derive(Debug, Clone)]
pub struct ExpiringRegistry {
    entries: Cache<Identifier, SubmissionRecord>,
}

impl ExpiringRegistry {
    /// Create a registry keeping at most `max_entries` for `ttl` each
    #[must_use]
    pub fn new(ttl: Duration, max_entries: u64) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(max_entries)
                .time_to_live(ttl)
                .build(),
        }
    }
}

#[async_trait]
impl SubmissionRegistry for ExpiringRegistry {
    async fn contains(&self, id: &Identifier) -> bool {
        self.entries.contains_key(id)
    }

    async fn try_reserve(&self, id: &Identifier) -> Option<ReservationToken> {
        let token = ReservationToken::next();
        self.entries
            .entry_by_ref(id)
            .or_insert(SubmissionRecord::pending(token))
            .await
            .is_fresh()
            .then_some(token)
    }

    async fn confirm(&self, id: &Identifier) {
        self.entries.insert(id.clone(), SubmissionRecord::claimed()).await;
    }

    async fn release(&self, id: &Identifier, token: ReservationToken) {
        // check and removal run under the entry's lock
        self.entries
            .entry_by_ref(id)
            .and_compute_with(|entry| {
                let op = match entry {
                    Some(entry) if entry.value().is_reserved_by(token) => Op::Remove,
                    _ => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;
    }

    async fn record(&self, id: &Identifier) -> Option<SubmissionRecord> {
        self.entries.get(id).await
    }

    async fn len(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }
}
