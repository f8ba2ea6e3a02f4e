//! Card interaction tests
//!
//! Drives whole open/close cycles through the public session API and checks
//! the observable effect stream.

use greetcard_core::card::{CardRuntime, EffectRecord, EffectRecorder, Phase};
use greetcard_core::CardSession;
use pretty_assertions::assert_eq;
use std::time::Duration;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
fn open_then_close_emits_effects_in_order() {
    let recorder = EffectRecorder::new();
    let mut card = CardSession::with_seed(recorder.clone(), 7);

    card.toggle();
    card.advance(ms(400));
    card.advance(ms(1_000));
    card.toggle();
    card.advance(ms(800));

    assert_eq!(
        recorder.take(),
        vec![
            EffectRecord::CelebrationStarted { pieces: 60 },
            EffectRecord::Haptic { millis: 50 },
            EffectRecord::ContentVisible { visible: true },
            EffectRecord::ContentVisible { visible: false },
        ]
    );
    let state = card.state();
    assert_eq!(state.phase, Phase::Closed);
    assert!(state.has_interacted_once);
    assert!(!state.is_animation_locked);

    // the celebration outlives the close
    card.advance(ms(1_000));
    assert_eq!(recorder.take(), vec![EffectRecord::CelebrationStopped]);
    assert_eq!(card.pending_timers(), 0);
}

#[test]
fn rapid_clicks_are_swallowed() {
    let recorder = EffectRecorder::without_haptics();
    let mut card = CardSession::with_seed(recorder.clone(), 7);

    card.toggle();
    for _ in 0..5 {
        card.advance(ms(50));
        card.toggle();
    }
    assert_eq!(card.state().phase, Phase::Opening);
    assert!(!card.state().content_visible);

    card.advance(ms(150));
    assert_eq!(card.state().phase, Phase::Open);

    let starts = recorder
        .records()
        .into_iter()
        .filter(|r| matches!(r, EffectRecord::CelebrationStarted { .. }))
        .count();
    assert_eq!(starts, 1);
}

#[test]
fn reopening_quickly_keeps_new_celebration() {
    let recorder = EffectRecorder::new();
    let mut card = CardSession::with_seed(recorder.clone(), 3);

    card.toggle();
    card.advance(ms(400));
    card.toggle();
    card.advance(ms(800));
    card.toggle();
    recorder.take();

    // first celebration timer is due at 3000 ms and must not end the second
    card.advance_to(ms(3_000));
    assert!(card.state().celebrating);
    assert!(!recorder.records().contains(&EffectRecord::CelebrationStopped));

    card.advance_to(ms(1_200 + 3_000));
    assert!(!card.state().celebrating);
    assert_eq!(recorder.records().last(), Some(&EffectRecord::CelebrationStopped));
}

#[tokio::test(start_paused = true)]
async fn dropping_every_handle_unmounts_card() {
    let recorder = EffectRecorder::new();
    let (card, task) = CardRuntime::spawn(CardSession::with_seed(recorder.clone(), 1));

    card.toggle().await;
    assert_eq!(card.snapshot().await.map(|s| s.phase), Some(Phase::Opening));
    drop(card);

    task.await.unwrap();
    tokio::time::sleep(ms(5_000)).await;

    // only the open effects; no reveal and no celebration stop
    assert_eq!(
        recorder.records(),
        vec![
            EffectRecord::CelebrationStarted { pieces: 60 },
            EffectRecord::Haptic { millis: 50 },
        ]
    );
}
