//! Tokio driver for a mounted card
//!
//! One task owns the [`CardSession`] and its timers; everything else talks
//! to it through a [`CardHandle`]. The task sleeps until the next timer
//! deadline or the next command, so all transitions happen on a single
//! logical thread. Unmounting (or dropping every handle) ends the task and
//! drops the pending timers with it.

use super::effects::CardEffects;
use super::session::CardSession;
use super::CardState;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

const COMMAND_BUFFER: usize = 32;

#[derive(Debug)]
enum Command {
    Toggle,
    Snapshot(oneshot::Sender<CardState>),
    Unmount,
}

/// Handle to a running card
#[derive(Debug, Clone)]
pub struct CardHandle {
    sender: mpsc::Sender<Command>,
}

impl CardHandle {
    /// Request a toggle; silently ignored if the card is gone
    pub async fn toggle(&self) {
        let _ = self.sender.send(Command::Toggle).await;
    }

    /// Current state, or `None` once the card is unmounted
    pub async fn snapshot(&self) -> Option<CardState> {
        let (tx, rx) = oneshot::channel();
        self.sender.send(Command::Snapshot(tx)).await.ok()?;
        rx.await.ok()
    }

    /// Tear the card down
    pub async fn unmount(&self) {
        let _ = self.sender.send(Command::Unmount).await;
    }

    /// Whether the card task is still running
    #[inline]
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        !self.sender.is_closed()
    }
}

/// Spawns card sessions onto the tokio runtime
#[derive(Debug, Clone, Copy, Default)]
pub struct CardRuntime;

impl CardRuntime {
    /// Mount `session` in its own task
    ///
    /// The session clock starts now. Returns the handle and the task's join
    /// handle; the task ends on [`CardHandle::unmount`] or when every handle
    /// has been dropped.
    pub fn spawn<E>(session: CardSession<E>) -> (CardHandle, JoinHandle<()>)
    where
        E: CardEffects + 'static,
    {
        let (sender, receiver) = mpsc::channel(COMMAND_BUFFER);
        let task = tokio::spawn(run_card(session, receiver));
        (CardHandle { sender }, task)
    }
}

async fn run_card<E: CardEffects>(
    mut session: CardSession<E>,
    mut commands: mpsc::Receiver<Command>,
) {
    let origin = Instant::now() - session.now();

    loop {
        let deadline = session.next_deadline().map(|at| origin + at);

        tokio::select! {
            command = commands.recv() => {
                // Timers due before this command fire first
                session.advance_to(origin.elapsed());
                match command {
                    Some(Command::Toggle) => session.toggle(),
                    Some(Command::Snapshot(reply)) => {
                        let _ = reply.send(session.state());
                    }
                    Some(Command::Unmount) | None => break,
                }
            }
            () = wait_for(deadline) => {
                session.advance_to(origin.elapsed());
            }
        }
    }

    session.unmount();
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::effects::{EffectRecord, EffectRecorder};
    use crate::card::Phase;
    use std::time::Duration;
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn runtime_drives_open_close_cycle() {
        let recorder = EffectRecorder::new();
        let (card, task) = CardRuntime::spawn(CardSession::with_seed(recorder.clone(), 1));

        card.toggle().await;
        assert_eq!(card.snapshot().await.unwrap().phase, Phase::Opening);

        sleep(Duration::from_millis(450)).await;
        let state = card.snapshot().await.unwrap();
        assert_eq!(state.phase, Phase::Open);
        assert!(state.content_visible);

        card.toggle().await;
        assert_eq!(card.snapshot().await.unwrap().phase, Phase::Closing);

        sleep(Duration::from_millis(350)).await;
        let state = card.snapshot().await.unwrap();
        assert_eq!(state.phase, Phase::Closed);
        assert!(state.is_animation_locked);

        sleep(Duration::from_millis(500)).await;
        let state = card.snapshot().await.unwrap();
        assert!(!state.is_animation_locked);
        assert!(state.has_interacted_once);

        card.unmount().await;
        task.await.unwrap();
        assert!(card.snapshot().await.is_none());
        assert!(recorder.records().contains(&EffectRecord::ContentVisible { visible: false }));
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_toggles_are_ignored() {
        let (card, _task) = CardRuntime::spawn(CardSession::with_seed(EffectRecorder::new(), 2));

        for _ in 0..10 {
            card.toggle().await;
        }
        let state = card.snapshot().await.unwrap();
        assert_eq!(state.phase, Phase::Opening);
        assert!(state.is_animation_locked);
    }

    #[tokio::test(start_paused = true)]
    async fn unmount_mid_animation_drops_timers() {
        let recorder = EffectRecorder::new();
        let (card, task) = CardRuntime::spawn(CardSession::with_seed(recorder.clone(), 3));

        card.toggle().await;
        card.snapshot().await.unwrap();
        recorder.take();

        card.unmount().await;
        task.await.unwrap();
        sleep(Duration::from_secs(5)).await;

        assert!(recorder.records().is_empty());
        assert!(!card.is_mounted());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_last_handle_ends_task() {
        let (card, task) = CardRuntime::spawn(CardSession::with_seed(EffectRecorder::new(), 4));
        card.toggle().await;
        drop(card);
        task.await.unwrap();
    }
}
