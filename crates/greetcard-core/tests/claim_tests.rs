//! Submission guard tests
//!
//! End-to-end claim flows over the real registries with scripted notifiers.

use futures::future::join_all;
use greetcard_core::claim::{
    ClaimResponse, ExpiringRegistry, Identifier, MemoryRegistry, SubmissionRegistry,
    SubmissionStatus,
};
use greetcard_core::error::ClaimError;
use greetcard_core::{ClaimPayload, SubmissionGuard};
use greetcard_test_utils::{
    memory_guard, scenario_identifier, scenario_payload, FlakyNotifier, RecordingNotifier, SENDER,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn scenario_claims_once() {
    let notifier = Arc::new(RecordingNotifier::new());
    let guard = memory_guard(notifier.clone());
    let id = scenario_identifier();

    let first = guard.attempt_claim(&id, &scenario_payload()).await;
    assert!(first.is_ok());

    let second = guard.attempt_claim(&id, &scenario_payload()).await;
    assert!(matches!(second, Err(ClaimError::AlreadyClaimed)));

    let (status, body) = ClaimResponse::from_outcome(&second);
    assert_eq!(status, 403);
    assert_eq!(body.already_sent, Some(true));

    let mails = notifier.mails();
    assert_eq!(mails.len(), 1);
    assert_eq!(mails[0].from, SENDER);
    assert_eq!(mails[0].to, "x@example.com");
    assert!(mails[0].html.contains("build me a site"));
}

#[tokio::test]
async fn distinct_callers_claim_independently() {
    let notifier = Arc::new(RecordingNotifier::new());
    let guard = memory_guard(notifier.clone());

    for ip in ["203.0.113.5", "198.51.100.7", "192.0.2.1"] {
        let id = Identifier::from_headers(Some(ip), None);
        assert!(guard.attempt_claim(&id, &scenario_payload()).await.is_ok());
    }
    assert_eq!(notifier.count(), 3);
    assert_eq!(guard.registry().len().await, 3);
}

#[tokio::test]
async fn transient_failure_then_retry() {
    let notifier = Arc::new(FlakyNotifier::failing(1));
    let guard = memory_guard(notifier.clone());
    let id = scenario_identifier();

    let first = guard.attempt_claim(&id, &scenario_payload()).await;
    match first {
        Err(ref e @ ClaimError::SendFailed(_)) => assert!(e.is_retryable()),
        other => panic!("expected send failure, got {other:?}"),
    }
    assert!(guard.can_submit(&id).await);
    assert!(guard.registry().record(&id).await.is_none());

    assert!(guard.attempt_claim(&id, &scenario_payload()).await.is_ok());
    assert_eq!(notifier.attempts(), 2);
    assert_eq!(notifier.delivered(), 1);
    assert_eq!(
        guard.registry().record(&id).await.map(|r| r.status),
        Some(SubmissionStatus::Claimed)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_attempts_send_once() {
    const ATTEMPTS: usize = 16;

    let notifier = Arc::new(RecordingNotifier::with_delay(Duration::from_millis(50)));
    let guard = memory_guard(notifier.clone());
    let id = scenario_identifier();

    let attempts = (0..ATTEMPTS).map(|_| {
        let guard = guard.clone();
        let id = id.clone();
        tokio::spawn(async move { guard.attempt_claim(&id, &scenario_payload()).await })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let sent = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(ClaimError::AlreadyClaimed)))
        .count();
    assert_eq!(sent, 1);
    assert_eq!(rejected, ATTEMPTS - 1);
    assert_eq!(notifier.count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_attempts_on_expiring_registry_send_once() {
    let notifier = Arc::new(RecordingNotifier::with_delay(Duration::from_millis(20)));
    let guard = SubmissionGuard::new(
        Arc::new(ExpiringRegistry::new(Duration::from_secs(60), 1_000)),
        notifier.clone(),
        SENDER,
    );
    let id = scenario_identifier();

    let attempts = (0..8).map(|_| {
        let guard = guard.clone();
        let id = id.clone();
        async move { guard.attempt_claim(&id, &scenario_payload()).await }
    });
    let sent = join_all(attempts)
        .await
        .into_iter()
        .filter(Result::is_ok)
        .count();

    assert_eq!(sent, 1);
    assert_eq!(notifier.count(), 1);
}

#[tokio::test]
async fn invalid_payloads_leave_caller_free() {
    let notifier = Arc::new(RecordingNotifier::new());
    let guard = memory_guard(notifier.clone());
    let id = scenario_identifier();

    for payload in [
        ClaimPayload::default(),
        ClaimPayload::new("   ", "a@b.com", "build me a site"),
        ClaimPayload::new("x@example.com", "", "build me a site"),
    ] {
        let result = guard.attempt_claim(&id, &payload).await;
        assert!(matches!(result, Err(ClaimError::ValidationFailed(_))));
    }

    assert_eq!(notifier.count(), 0);
    assert!(guard.attempt_claim(&id, &scenario_payload()).await.is_ok());
}

#[tokio::test]
async fn dropped_claim_frees_caller_on_every_registry() {
    let registries: Vec<Arc<dyn SubmissionRegistry>> = vec![
        Arc::new(MemoryRegistry::new()),
        Arc::new(ExpiringRegistry::new(Duration::from_secs(60), 1_000)),
    ];

    for registry in registries {
        let hanging = Arc::new(RecordingNotifier::with_delay(Duration::from_secs(3600)));
        let guard = SubmissionGuard::new(Arc::clone(&registry), hanging.clone(), SENDER);
        let id = scenario_identifier();
        let payload = scenario_payload();

        let abandoned =
            tokio::time::timeout(Duration::from_millis(10), guard.attempt_claim(&id, &payload))
                .await;
        assert!(abandoned.is_err());

        for _ in 0..100 {
            if guard.can_submit(&id).await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert!(guard.can_submit(&id).await);
        assert_eq!(hanging.count(), 0);

        let notifier = Arc::new(RecordingNotifier::new());
        let retry = SubmissionGuard::new(registry, notifier.clone(), SENDER);
        assert!(retry.attempt_claim(&id, &scenario_payload()).await.is_ok());
        assert_eq!(notifier.count(), 1);
    }
}
