//! Card transition table
//!
//! [`CardMachine`] owns the [`CardState`] and maps every `(phase, event)`
//! pair to a new state plus a list of [`CardEffect`]s. It never touches a
//! clock: delays are requested through [`CardEffect::Schedule`] and come back
//! as [`CardEvent::TimerFired`].

use super::{
    CardState, Phase, CELEBRATION_DURATION, CLOSE_HIDE_DELAY, CLOSE_UNLOCK_DELAY, HAPTIC_PULSE,
    OPEN_REVEAL_DELAY,
};
use std::time::Duration;

/// Timers a card can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Flip-open finished; reveal content and settle in `Open`
    RevealContent,
    /// Content is hidden; rotate back to `Closed`
    BeginCloseRotation,
    /// Close rotation finished; accept toggles again
    ReleaseLock,
    /// Celebration started by the open with this generation has run its course
    EndCelebration {
        /// Open generation that started the celebration
        generation: u64,
    },
}

/// Input to the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardEvent {
    /// User clicked / tapped the card
    Toggle,
    /// A previously scheduled timer fired
    TimerFired(TimerKind),
}

/// Side effects requested by a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardEffect {
    /// Render the inner content
    ShowContent,
    /// Stop rendering the inner content
    HideContent,
    /// Start the celebration (confetti) effect
    StartCelebration {
        /// Open generation
        generation: u64,
    },
    /// Clear the celebration effect
    StopCelebration {
        /// Open generation
        generation: u64,
    },
    /// Best-effort haptic pulse
    HapticPulse(Duration),
    /// Fire `timer` after `after`
    Schedule {
        /// Timer to fire
        timer: TimerKind,
        /// Delay from now
        after: Duration,
    },
}

/// Card interaction state machine
#[derive(Debug, Clone, Default)]
pub struct CardMachine {
    state: CardState,
    generation: u64,
}

impl CardMachine {
    /// Create a machine for a freshly mounted card
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> CardState {
        self.state
    }

    /// Number of opens so far
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Apply an event and return the effects to perform, in order
    pub fn handle(&mut self, event: CardEvent) -> Vec<CardEffect> {
        match event {
            CardEvent::Toggle => self.toggle(),
            CardEvent::TimerFired(timer) => self.timer_fired(timer),
        }
    }

    /// Toggle request; ignored while locked
    pub fn toggle(&mut self) -> Vec<CardEffect> {
        if self.state.is_animation_locked {
            tracing::trace!(phase = %self.state.phase, "toggle ignored while animating");
            return Vec::new();
        }

        match self.state.phase {
            Phase::Closed => self.begin_open(),
            Phase::Open => self.begin_close(),
            // Both are only reachable while locked
            Phase::Opening | Phase::Closing => Vec::new(),
        }
    }

    fn begin_open(&mut self) -> Vec<CardEffect> {
        self.generation += 1;
        let generation = self.generation;

        self.state.is_animation_locked = true;
        self.state.phase = Phase::Opening;
        self.state.has_interacted_once = true;
        self.state.celebrating = true;
        tracing::debug!(generation, "card opening");

        vec![
            CardEffect::StartCelebration { generation },
            CardEffect::Schedule {
                timer: TimerKind::EndCelebration { generation },
                after: CELEBRATION_DURATION,
            },
            CardEffect::Schedule {
                timer: TimerKind::RevealContent,
                after: OPEN_REVEAL_DELAY,
            },
            CardEffect::HapticPulse(HAPTIC_PULSE),
        ]
    }

    fn begin_close(&mut self) -> Vec<CardEffect> {
        self.state.is_animation_locked = true;
        self.state.content_visible = false;
        self.state.phase = Phase::Closing;
        tracing::debug!("card closing");

        vec![
            CardEffect::HideContent,
            CardEffect::Schedule {
                timer: TimerKind::BeginCloseRotation,
                after: CLOSE_HIDE_DELAY,
            },
        ]
    }

    fn timer_fired(&mut self, timer: TimerKind) -> Vec<CardEffect> {
        match (timer, self.state.phase) {
            (TimerKind::RevealContent, Phase::Opening) => {
                self.state.phase = Phase::Open;
                self.state.content_visible = true;
                self.state.is_animation_locked = false;
                tracing::debug!("card open");
                vec![CardEffect::ShowContent]
            }
            (TimerKind::BeginCloseRotation, Phase::Closing) => {
                self.state.phase = Phase::Closed;
                vec![CardEffect::Schedule {
                    timer: TimerKind::ReleaseLock,
                    after: CLOSE_UNLOCK_DELAY,
                }]
            }
            (TimerKind::ReleaseLock, Phase::Closed) if self.state.is_animation_locked => {
                self.state.is_animation_locked = false;
                tracing::debug!("card closed");
                Vec::new()
            }
            (TimerKind::EndCelebration { generation }, _)
                if self.state.celebrating && generation == self.generation =>
            {
                self.state.celebrating = false;
                vec![CardEffect::StopCelebration { generation }]
            }
            _ => {
                tracing::trace!(?timer, phase = %self.state.phase, "stale timer ignored");
                Vec::new()
            }
        }
    }
}
