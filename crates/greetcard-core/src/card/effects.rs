//! Effect sinks
//!
//! The rendering layer, confetti overlay and vibration motor live outside
//! this crate. A [`CardEffects`] implementation receives the visible
//! consequences of each transition.

use super::confetti::ConfettiBurst;
use crate::error::EffectError;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Receiver of card side effects
#[cfg_attr(test, mockall::automock)]
pub trait CardEffects: Send {
    /// Show or hide the inner content
    fn set_content_visible(&self, visible: bool);

    /// Start the celebration overlay with a fresh confetti burst
    fn start_celebration(&self, burst: &ConfettiBurst);

    /// Clear the celebration overlay
    fn stop_celebration(&self);

    /// Vibrate for `duration` if the platform supports it
    ///
    /// # Errors
    /// - `EffectError::Unsupported` when no haptic device is available
    fn haptic_pulse(&self, duration: Duration) -> Result<(), EffectError>;
}

/// Sink that drops every effect; haptics are reported unsupported
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEffects;

impl CardEffects for NoopEffects {
    fn set_content_visible(&self, _visible: bool) {}

    fn start_celebration(&self, _burst: &ConfettiBurst) {}

    fn stop_celebration(&self) {}

    fn haptic_pulse(&self, _duration: Duration) -> Result<(), EffectError> {
        Err(EffectError::Unsupported)
    }
}

/// One observed effect
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum EffectRecord {
    /// Content visibility changed
    ContentVisible {
        /// New visibility
        visible: bool,
    },
    /// Celebration started
    CelebrationStarted {
        /// Confetti pieces in the burst
        pieces: usize,
    },
    /// Celebration cleared
    CelebrationStopped,
    /// Haptic pulse requested
    Haptic {
        /// Pulse length in milliseconds
        millis: u64,
    },
}

/// Sink that records effects in order; clones share the same log
#[derive(Debug, Clone, Default)]
pub struct EffectRecorder {
    records: Arc<Mutex<Vec<EffectRecord>>>,
    haptics_supported: bool,
}

impl EffectRecorder {
    /// Recorder on a platform with haptics
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Arc::default(),
            haptics_supported: true,
        }
    }

    /// Recorder on a platform without haptics
    #[inline]
    #[must_use]
    pub fn without_haptics() -> Self {
        Self {
            records: Arc::default(),
            haptics_supported: false,
        }
    }

    /// Snapshot of everything recorded so far
    #[must_use]
    pub fn records(&self) -> Vec<EffectRecord> {
        self.records.lock().clone()
    }

    /// Drain the log
    pub fn take(&self) -> Vec<EffectRecord> {
        std::mem::take(&mut *self.records.lock())
    }

    fn push(&self, record: EffectRecord) {
        self.records.lock().push(record);
    }
}

impl CardEffects for EffectRecorder {
    fn set_content_visible(&self, visible: bool) {
        self.push(EffectRecord::ContentVisible { visible });
    }

    fn start_celebration(&self, burst: &ConfettiBurst) {
        self.push(EffectRecord::CelebrationStarted {
            pieces: burst.pieces.len(),
        });
    }

    fn stop_celebration(&self) {
        self.push(EffectRecord::CelebrationStopped);
    }

    fn haptic_pulse(&self, duration: Duration) -> Result<(), EffectError> {
        if !self.haptics_supported {
            return Err(EffectError::Unsupported);
        }
        self.push(EffectRecord::Haptic {
            millis: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        });
        Ok(())
    }
}
