//! Virtual-clock card run
//!
//! Mounts a card, toggles it at a fixed interval and collects every effect
//! with the time it happened. Nothing sleeps; the whole run is computed
//! instantly.

use greetcard_core::card::{DecorativeElement, EffectRecord, EffectRecorder, Phase};
use greetcard_core::CardSession;
use serde::Serialize;
use std::time::Duration;

/// Simulation parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Simulation {
    /// Number of clicks
    pub toggles: u32,
    /// Time between clicks
    pub interval: Duration,
    /// Confetti seed
    pub seed: u64,
}

/// One observed step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationStep {
    /// Milliseconds since mount
    pub at_ms: u64,
    /// Phase after the step
    pub phase: Phase,
    /// What happened
    #[serde(flatten)]
    pub event: StepEvent,
}

/// Step payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StepEvent {
    /// The card mounted with its background decorations
    Mounted {
        /// Decorations drawn at mount
        decorations: Vec<DecorativeElement>,
    },
    /// A click, and whether it was accepted
    Toggle {
        /// Click index
        toggle: u32,
        /// `false` if swallowed by the animation lock
        accepted: bool,
    },
    /// An effect reached the sink
    Effect(EffectRecord),
}

impl Simulation {
    /// Run to completion, draining every timer after the last click
    #[must_use]
    pub fn run(&self) -> Vec<SimulationStep> {
        let recorder = EffectRecorder::new();
        let mut card = CardSession::with_seed(recorder.clone(), self.seed);
        let mut steps = vec![SimulationStep {
            at_ms: 0,
            phase: card.state().phase,
            event: StepEvent::Mounted {
                decorations: card.decorations().to_vec(),
            },
        }];

        for toggle in 0..self.toggles {
            if toggle > 0 {
                advance_collecting(&mut card, &recorder, self.interval, &mut steps);
            }
            let before = card.state();
            card.toggle();
            let after = card.state();
            steps.push(SimulationStep {
                at_ms: millis(card.now()),
                phase: after.phase,
                event: StepEvent::Toggle {
                    toggle,
                    accepted: before != after,
                },
            });
            collect(&card, &recorder, &mut steps);
        }

        while let Some(deadline) = card.next_deadline() {
            let wait = deadline.saturating_sub(card.now());
            advance_collecting(&mut card, &recorder, wait, &mut steps);
        }
        steps
    }
}

fn advance_collecting(
    card: &mut CardSession<EffectRecorder>,
    recorder: &EffectRecorder,
    by: Duration,
    steps: &mut Vec<SimulationStep>,
) {
    let target = card.now() + by;
    // step timer by timer so each effect carries its own timestamp
    while let Some(deadline) = card.next_deadline().filter(|d| *d <= target) {
        card.advance_to(deadline);
        collect(card, recorder, steps);
    }
    card.advance_to(target);
}

fn collect(
    card: &CardSession<EffectRecorder>,
    recorder: &EffectRecorder,
    steps: &mut Vec<SimulationStep>,
) {
    let at_ms = millis(card.now());
    let phase = card.state().phase;
    steps.extend(recorder.take().into_iter().map(|record| SimulationStep {
        at_ms,
        phase,
        event: StepEvent::Effect(record),
    }));
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
