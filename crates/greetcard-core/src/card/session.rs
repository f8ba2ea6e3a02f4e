//! A mounted card on a virtual clock
//!
//! [`CardSession`] ties a [`CardMachine`] to its [`TimerQueue`] and an effect
//! sink. Time only moves when the owner calls [`CardSession::advance`] or
//! [`CardSession::advance_to`], which makes the whole interaction
//! deterministic. [`CardRuntime`](super::CardRuntime) maps the same session
//! onto the tokio clock.
//!
//! The floating background decorations are drawn once, at mount, from the
//! same random source as the confetti.

use super::confetti::{ConfettiBurst, DecorativeElement};
use super::effects::CardEffects;
use super::machine::{CardEffect, CardEvent, CardMachine, TimerKind};
use super::timer::TimerQueue;
use super::CardState;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;

/// Card view lifetime: state machine, pending timers and effect sink
#[derive(Debug)]
pub struct CardSession<E> {
    machine: CardMachine,
    timers: TimerQueue<TimerKind>,
    effects: E,
    rng: StdRng,
    decorations: Vec<DecorativeElement>,
    mounted: bool,
}

impl<E: CardEffects> CardSession<E> {
    /// Mount a card delivering effects to `effects`
    #[must_use]
    pub fn new(effects: E) -> Self {
        Self::with_rng(effects, StdRng::from_os_rng())
    }

    /// Mount a card with reproducible confetti
    #[must_use]
    pub fn with_seed(effects: E, seed: u64) -> Self {
        Self::with_rng(effects, StdRng::seed_from_u64(seed))
    }

    fn with_rng(effects: E, mut rng: StdRng) -> Self {
        let decorations = DecorativeElement::generate_set(&mut rng);
        Self {
            machine: CardMachine::new(),
            timers: TimerQueue::new(),
            effects,
            rng,
            decorations,
            mounted: true,
        }
    }

    /// Current card state
    #[inline]
    #[must_use]
    pub fn state(&self) -> CardState {
        self.machine.state()
    }

    /// Time since mount
    #[inline]
    #[must_use]
    pub fn now(&self) -> Duration {
        self.timers.now()
    }

    /// Deadline of the next pending timer, measured from mount
    #[inline]
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    /// Number of timers still pending
    #[inline]
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Background decorations drawn at mount
    #[inline]
    #[must_use]
    pub fn decorations(&self) -> &[DecorativeElement] {
        &self.decorations
    }

    /// Whether the card is still mounted
    #[inline]
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Effect sink
    #[inline]
    pub fn effects(&self) -> &E {
        &self.effects
    }

    /// User toggle at the current time
    pub fn toggle(&mut self) {
        self.dispatch(CardEvent::Toggle);
    }

    /// Let `by` elapse, firing every timer that comes due
    pub fn advance(&mut self, by: Duration) {
        let target = self.timers.now() + by;
        self.advance_to(target);
    }

    /// Move the clock to `at` (time since mount), firing due timers in order
    pub fn advance_to(&mut self, at: Duration) {
        while self.mounted {
            let Some(timer) = self.timers.fire_next(at) else {
                break;
            };
            self.dispatch(CardEvent::TimerFired(timer));
        }
        self.timers.advance_to(at);
    }

    /// Tear the card down; pending timers are cancelled and later input ignored
    pub fn unmount(&mut self) {
        if self.mounted {
            tracing::debug!(pending = self.timers.len(), "card unmounted");
        }
        self.mounted = false;
        self.timers.clear();
    }

    fn dispatch(&mut self, event: CardEvent) {
        if !self.mounted {
            return;
        }
        for effect in self.machine.handle(event) {
            self.perform(effect);
        }
    }

    fn perform(&mut self, effect: CardEffect) {
        match effect {
            CardEffect::ShowContent => self.effects.set_content_visible(true),
            CardEffect::HideContent => self.effects.set_content_visible(false),
            CardEffect::StartCelebration { .. } => {
                let burst = ConfettiBurst::generate(&mut self.rng);
                self.effects.start_celebration(&burst);
            }
            CardEffect::StopCelebration { .. } => self.effects.stop_celebration(),
            CardEffect::HapticPulse(duration) => {
                if let Err(e) = self.effects.haptic_pulse(duration) {
                    tracing::trace!("haptic pulse skipped: {e}");
                }
            }
            CardEffect::Schedule { timer, after } => {
                self.timers.schedule(after, timer);
            }
        }
    }
}
