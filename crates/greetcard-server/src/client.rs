//! HTTP client for the claim endpoint

use greetcard_core::claim::{ClaimPayload, ClaimResponse};
use greetcard_core::client::{ClaimForm, ClaimStatus, FlagStore, Notice};
use thiserror::Error;

/// Client-side failures talking to the claim service
#[derive(Debug, Error)]
pub enum ClaimClientError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("unexpected response (status {status}): {body}")]
    UnexpectedResponse { status: u16, body: String },
}

/// Client for `POST /claim`
#[derive(Debug, Clone)]
pub struct ClaimClient {
    http: reqwest::Client,
    endpoint: String,
}

impl ClaimClient {
    /// Client for the service at `base_url`
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: format!("{}/claim", base_url.trim_end_matches('/')),
        }
    }

    /// Full URL of the claim endpoint
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Submit `payload` and classify the response
    ///
    /// # Errors
    /// - `ClaimClientError::Network` if the request could not complete
    /// - `ClaimClientError::UnexpectedResponse` if a non-success body is not a claim response
    pub async fn submit(&self, payload: &ClaimPayload) -> Result<ClaimStatus, ClaimClientError> {
        let response = self.http.post(&self.endpoint).json(payload).send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;

        if (200..300).contains(&status) {
            return Ok(ClaimStatus::Sent);
        }
        let body: ClaimResponse = serde_json::from_str(&text)
            .map_err(|_| ClaimClientError::UnexpectedResponse { status, body: text })?;
        Ok(ClaimStatus::classify(status, Some(&body)))
    }

    /// Confirm the form's pending submission, send it and apply the outcome
    ///
    /// Returns `None` without sending unless the form's confirmation dialog
    /// is open. Client errors map to the generic failure notice.
    pub async fn submit_form<S: FlagStore>(&self, form: &mut ClaimForm<S>) -> Option<Notice> {
        let payload = form.confirm()?;
        let status = match self.submit(&payload).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!("claim request failed: {e}");
                ClaimStatus::Failed
            }
        };
        Some(form.apply(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use greetcard_core::client::{FormStage, MemoryFlagStore};

    #[test]
    fn endpoint_joins_base_url() {
        assert_eq!(
            ClaimClient::new("http://127.0.0.1:3000/").endpoint(),
            "http://127.0.0.1:3000/claim"
        );
        assert_eq!(
            ClaimClient::new("http://card.local").endpoint(),
            "http://card.local/claim"
        );
    }

    #[tokio::test]
    async fn unconfirmed_form_is_not_sent() {
        let client = ClaimClient::new("http://127.0.0.1:9");
        let mut form = ClaimForm::mount(MemoryFlagStore::new(), "x@example.com");
        form.set_subject("a@b.com");
        form.set_message("hi");

        assert_eq!(client.submit_form(&mut form).await, None);
        assert_eq!(form.attempts(), 0);
    }

    #[tokio::test]
    async fn unreachable_server_fails_confirmed_form() {
        let client = ClaimClient::new("http://127.0.0.1:9");
        let mut form = ClaimForm::mount(MemoryFlagStore::new(), "x@example.com");
        form.set_subject("a@b.com");
        form.set_message("hi");
        form.request_submit();

        let notice = client.submit_form(&mut form).await.unwrap();
        assert_eq!(notice, ClaimStatus::Failed.notice());
        assert_eq!(form.stage(), FormStage::Editing);
        assert!(form.banner().is_some());
        assert!(form.should_show_form());
    }

    #[tokio::test]
    async fn unreachable_server_is_network_error() {
        let client = ClaimClient::new("http://127.0.0.1:9");
        let payload = ClaimPayload::new("x@example.com", "a@b.com", "hi");
        let err = client.submit(&payload).await.unwrap_err();
        assert!(matches!(err, ClaimClientError::Network(_)));
    }
}
