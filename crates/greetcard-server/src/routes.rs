//! HTTP routes
//!
//! - `POST /claim` (alias `POST /api/send-email`): one-time claim
//! - `GET /health`: liveness

use greetcard_core::claim::{ClaimPayload, ClaimResponse, Identifier};
use greetcard_core::claim::identity::{FORWARDED_FOR_HEADER, REAL_IP_HEADER};
use greetcard_core::SubmissionGuard;
use std::convert::Infallible;
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::{Filter, Rejection, Reply};

/// Largest accepted claim body
pub const MAX_BODY_BYTES: u64 = 16 * 1024;

/// Every route served by the claim service
pub fn routes(
    guard: SubmissionGuard,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let claim = warp::path("claim")
        .and(warp::path::end())
        .and(claim_handler(guard.clone()));
    let legacy = warp::path!("api" / "send-email").and(claim_handler(guard));
    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| warp::reply::json(&serde_json::json!({ "status": "ok" })));

    claim.or(legacy).or(health).with(warp::trace::request())
}

fn claim_handler(
    guard: SubmissionGuard,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::post()
        .and(warp::header::optional::<String>(FORWARDED_FOR_HEADER))
        .and(warp::header::optional::<String>(REAL_IP_HEADER))
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::bytes())
        .and(warp::any().map(move || guard.clone()))
        .and_then(handle_claim)
}

async fn handle_claim(
    forwarded_for: Option<String>,
    real_ip: Option<String>,
    body: Bytes,
    guard: SubmissionGuard,
) -> Result<impl Reply, Infallible> {
    let id = Identifier::from_headers(forwarded_for.as_deref(), real_ip.as_deref());

    let (status, response) = match serde_json::from_slice::<ClaimPayload>(&body) {
        Ok(payload) => ClaimResponse::from_outcome(&guard.attempt_claim(&id, &payload).await),
        Err(e) => {
            tracing::warn!(caller = %id.fingerprint(), "unreadable claim body: {e}");
            ClaimResponse::failed()
        }
    };

    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Ok(warp::reply::with_status(warp::reply::json(&response), status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use greetcard_core::claim::response::{
        ALREADY_SENT_MESSAGE, FAILED_MESSAGE, MISSING_FIELDS_MESSAGE, SENT_MESSAGE,
    };
    use greetcard_core::claim::{MemoryRegistry, Notifier, OutboundMail};
    use greetcard_core::error::NotifyError;
    use greetcard_core::UnknownCallerPolicy;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    struct Accept;

    #[async_trait]
    impl Notifier for Accept {
        async fn send(&self, _mail: &OutboundMail) -> Result<(), NotifyError> {
            Ok(())
        }
    }

    struct Refuse;

    #[async_trait]
    impl Notifier for Refuse {
        async fn send(&self, _mail: &OutboundMail) -> Result<(), NotifyError> {
            Err(NotifyError::Rejected { status: 502 })
        }
    }

    fn guard(notifier: impl Notifier + 'static) -> SubmissionGuard {
        SubmissionGuard::new(
            Arc::new(MemoryRegistry::new()),
            Arc::new(notifier),
            "card@example.com",
        )
    }

    const BODY: &str = r#"{"to":"x@example.com","subject":"a@b.com","message":"build me a site"}"#;

    fn body_of(response: &warp::http::Response<Bytes>) -> ClaimResponse {
        serde_json::from_slice(response.body()).unwrap()
    }

    #[tokio::test]
    async fn claim_then_repeat() {
        let api = routes(guard(Accept));

        let first = warp::test::request()
            .method("POST")
            .path("/claim")
            .header("x-forwarded-for", "203.0.113.5")
            .body(BODY)
            .reply(&api)
            .await;
        assert_eq!(first.status(), 200);
        assert_eq!(body_of(&first).message, SENT_MESSAGE);

        let second = warp::test::request()
            .method("POST")
            .path("/claim")
            .header("x-forwarded-for", "203.0.113.5")
            .body(BODY)
            .reply(&api)
            .await;
        assert_eq!(second.status(), 403);
        let body = body_of(&second);
        assert_eq!(body.message, ALREADY_SENT_MESSAGE);
        assert_eq!(body.already_sent, Some(true));
    }

    #[tokio::test]
    async fn legacy_path_shares_registry() {
        let api = routes(guard(Accept));

        let first = warp::test::request()
            .method("POST")
            .path("/api/send-email")
            .header("x-real-ip", "198.51.100.7")
            .body(BODY)
            .reply(&api)
            .await;
        assert_eq!(first.status(), 200);

        let second = warp::test::request()
            .method("POST")
            .path("/claim")
            .header("x-real-ip", "198.51.100.7")
            .body(BODY)
            .reply(&api)
            .await;
        assert_eq!(second.status(), 403);
    }

    #[tokio::test]
    async fn missing_field_is_bad_request() {
        let api = routes(guard(Accept));
        let response = warp::test::request()
            .method("POST")
            .path("/claim")
            .body(r#"{"to":"x@example.com","subject":"a@b.com","message":"  "}"#)
            .reply(&api)
            .await;
        assert_eq!(response.status(), 400);
        assert_eq!(body_of(&response).message, MISSING_FIELDS_MESSAGE);
    }

    #[tokio::test]
    async fn unreadable_body_is_server_error() {
        let api = routes(guard(Accept));
        let response = warp::test::request()
            .method("POST")
            .path("/claim")
            .body("not json")
            .reply(&api)
            .await;
        assert_eq!(response.status(), 500);
        assert_eq!(body_of(&response).message, FAILED_MESSAGE);
    }

    #[tokio::test]
    async fn send_failure_is_server_error_and_retryable() {
        let api = routes(guard(Refuse));
        for _ in 0..2 {
            let response = warp::test::request()
                .method("POST")
                .path("/claim")
                .body(BODY)
                .reply(&api)
                .await;
            assert_eq!(response.status(), 500);
            assert_eq!(body_of(&response).already_sent, None);
        }
    }

    #[tokio::test]
    async fn reject_policy_refuses_unidentified_callers() {
        let api = routes(guard(Accept).with_unknown_policy(UnknownCallerPolicy::Reject));
        let response = warp::test::request()
            .method("POST")
            .path("/claim")
            .body(BODY)
            .reply(&api)
            .await;
        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn oversized_body_is_refused() {
        let api = routes(guard(Accept));
        let message = "a".repeat(usize::try_from(MAX_BODY_BYTES).unwrap());
        let body = serde_json::json!({"to": "x", "subject": "y", "message": message}).to_string();
        let response = warp::test::request()
            .method("POST")
            .path("/claim")
            .body(body)
            .reply(&api)
            .await;
        assert_eq!(response.status(), 413);
    }

    #[tokio::test]
    async fn health_and_unknown_routes() {
        let api = routes(guard(Accept));

        let health = warp::test::request().path("/health").reply(&api).await;
        assert_eq!(health.status(), 200);
        assert_eq!(health.body().as_ref(), br#"{"status":"ok"}"#);

        let missing = warp::test::request().path("/nope").reply(&api).await;
        assert_eq!(missing.status(), 404);

        let wrong_method = warp::test::request().path("/claim").reply(&api).await;
        assert_eq!(wrong_method.status(), 405);
    }
}
