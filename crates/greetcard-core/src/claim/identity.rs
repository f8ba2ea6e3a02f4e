//! Caller identifiers
//!
//! The guard keys submissions by network address. Precedence:
//! 1. leftmost non-empty entry of `X-Forwarded-For`
//! 2. `X-Real-IP`
//! 3. the shared [`UNKNOWN_IDENTIFIER`] sentinel
//!
//! The sentinel collapses every unidentifiable caller into one identity, so
//! one of them claiming blocks all the others. [`UnknownCallerPolicy`] makes
//! that trade-off an explicit setting.

use serde::{Deserialize, Serialize};

/// Header carrying the proxy chain
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Header carrying the direct client address
pub const REAL_IP_HEADER: &str = "x-real-ip";

/// Identifier shared by callers without address headers
pub const UNKNOWN_IDENTIFIER: &str = "unknown";

/// Opaque caller identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identifier(String);

impl Identifier {
    /// Wrap a raw identifier
    #[inline]
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The shared sentinel identity
    #[inline]
    #[must_use]
    pub fn unknown() -> Self {
        Self(UNKNOWN_IDENTIFIER.to_string())
    }

    /// Derive an identifier from the address headers of a request
    #[must_use]
    pub fn from_headers(forwarded_for: Option<&str>, real_ip: Option<&str>) -> Self {
        let forwarded = forwarded_for
            .and_then(|chain| chain.split(',').map(str::trim).find(|hop| !hop.is_empty()));
        let real = real_ip.map(str::trim).filter(|ip| !ip.is_empty());

        forwarded
            .or(real)
            .map_or_else(Self::unknown, |ip| Self(ip.to_string()))
    }

    /// Whether this is the shared sentinel
    #[inline]
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_IDENTIFIER
    }

    /// Raw identifier
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short stable fingerprint for logs; the raw address is never logged
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let hash = blake3::hash(self.0.as_bytes());
        hash.to_hex()[..12].to_string()
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// What to do with callers that resolve to [`UNKNOWN_IDENTIFIER`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownCallerPolicy {
    /// All unidentified callers share one claim
    #[default]
    Shared,
    /// Unidentified callers cannot claim
    Reject,
}
