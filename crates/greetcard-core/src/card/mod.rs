//! Card interaction model
//!
//! The card flips open and closed with a single continuous rotation. Inner
//! content must never render on the wrong face mid-flip, so visibility is
//! gated by fixed delays tied to the external flip animation:
//! - Opening reveals content last (after the rotation)
//! - Closing hides content first (before the rotation)
//!
//! Layers:
//! - [`CardMachine`]: pure transition table, timers requested as effects
//! - [`TimerQueue`]: the single scheduler owned by a card instance
//! - [`CardSession`]: machine + timers + effect sink on a virtual clock
//! - [`CardRuntime`]: drives a session on the tokio clock until unmount

pub mod confetti;
pub mod effects;
pub mod machine;
pub mod runtime;
pub mod session;
pub mod timer;

pub use confetti::{ConfettiBurst, ConfettiPiece, DecorativeElement, Shape};
pub use effects::{CardEffects, EffectRecord, EffectRecorder, NoopEffects};
pub use machine::{CardEffect, CardEvent, CardMachine, TimerKind};
pub use runtime::{CardHandle, CardRuntime};
pub use session::CardSession;
pub use timer::TimerQueue;

use serde::Serialize;
use std::time::Duration;

/// Delay between an open toggle and the inner content being revealed
pub const OPEN_REVEAL_DELAY: Duration = Duration::from_millis(400);

/// Delay between a close toggle (content hidden) and the rotation back
pub const CLOSE_HIDE_DELAY: Duration = Duration::from_millis(300);

/// Delay between the rotation back starting and the lock being released
pub const CLOSE_UNLOCK_DELAY: Duration = Duration::from_millis(500);

/// Lifetime of the celebration effect started on open
pub const CELEBRATION_DURATION: Duration = Duration::from_millis(3000);

/// Length of the haptic pulse on open
pub const HAPTIC_PULSE: Duration = Duration::from_millis(50);

/// Visual/interaction phase of the card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Front face showing, resting state
    Closed,
    /// Rotating open, content still hidden
    Opening,
    /// Inside showing, content visible
    Open,
    /// Content hidden, waiting to rotate back
    Closing,
}

impl Phase {
    /// Whether the phase is a resting phase
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Open)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Closed => "closed",
            Self::Opening => "opening",
            Self::Open => "open",
            Self::Closing => "closing",
        };
        f.write_str(name)
    }
}

/// State of a single card view
///
/// Created on mount with `phase = Closed` and every flag false. Never
/// persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CardState {
    /// Current phase
    pub phase: Phase,
    /// Set on the first open; never resets for the lifetime of the view
    pub has_interacted_once: bool,
    /// True while any transition is in flight; toggles are ignored
    pub is_animation_locked: bool,
    /// Whether the inner content is rendered
    pub content_visible: bool,
    /// Whether the celebration effect is running
    pub celebrating: bool,
}

impl CardState {
    /// Fresh state for a newly mounted card
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: Phase::Closed,
            has_interacted_once: false,
            is_animation_locked: false,
            content_visible: false,
            celebrating: false,
        }
    }

    /// Whether the rotation target is the open (inside) face
    ///
    /// Stays true through `Closing` because the rotation back only starts
    /// once the content is hidden.
    #[inline]
    #[must_use]
    pub fn is_flipped(&self) -> bool {
        matches!(self.phase, Phase::Opening | Phase::Open | Phase::Closing)
    }

    /// Whether the "tap to open" affordance is shown
    #[inline]
    #[must_use]
    pub fn shows_hint(&self) -> bool {
        !self.has_interacted_once
    }

    /// Prompt shown under the card
    #[must_use]
    pub fn prompt(&self) -> &'static str {
        if self.is_flipped() {
            "Click card to close"
        } else {
            "Click card to open"
        }
    }
}

impl Default for CardState {
    fn default() -> Self {
        Self::new()
    }
}
