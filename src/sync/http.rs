//! `reqwest`-backed snapshot source talking to a running backend.

use futures::future::BoxFuture;
use reqwest::{Client, StatusCode};

use crate::{
    dto::game::{GuessResponse, SnapshotResponse, SubmitGuessRequest},
    error::ErrorBody,
    sync::{SnapshotSource, SubmitError, SyncError},
};

/// Snapshot source over HTTP, pointing at a backend base URL.
#[derive(Clone)]
pub struct HttpSnapshotSource {
    client: Client,
    base_url: String,
}

impl HttpSnapshotSource {
    /// Build a source for the given base URL (no trailing slash needed).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl SnapshotSource for HttpSnapshotSource {
    fn fetch_snapshot(&self) -> BoxFuture<'static, Result<SnapshotResponse, SyncError>> {
        let client = self.client.clone();
        let url = self.url("/public/snapshot");

        Box::pin(async move {
            let response = client
                .get(&url)
                .send()
                .await
                .map_err(|err| SyncError::Transport(err.to_string()))?;

            if !response.status().is_success() {
                return Err(SyncError::Transport(format!(
                    "snapshot request returned {}",
                    response.status()
                )));
            }

            response
                .json::<SnapshotResponse>()
                .await
                .map_err(|err| SyncError::Decode(err.to_string()))
        })
    }

    fn submit_guess(
        &self,
        request: SubmitGuessRequest,
    ) -> BoxFuture<'static, Result<GuessResponse, SubmitError>> {
        let client = self.client.clone();
        let url = self.url("/public/guesses");

        Box::pin(async move {
            let response = client
                .post(&url)
                .json(&request)
                .send()
                .await
                .map_err(|err| SubmitError::Transport(err.to_string()))?;

            let status = response.status();
            if status.is_success() {
                return response
                    .json::<GuessResponse>()
                    .await
                    .map_err(|err| SubmitError::Transport(err.to_string()));
            }

            let body = response.json::<ErrorBody>().await.ok();
            Err(map_rejection(status, body))
        })
    }
}

/// Map an HTTP rejection to the specific submission error, using the stable
/// error code when the body carries one.
fn map_rejection(status: StatusCode, body: Option<ErrorBody>) -> SubmitError {
    match body {
        Some(body) => match body.code.as_str() {
            "duplicate_value" => SubmitError::DuplicateValue,
            "duplicate_participant" => SubmitError::DuplicateParticipant,
            "bad_request" => SubmitError::InvalidInput(body.message),
            _ => SubmitError::Transport(format!("{status}: {}", body.message)),
        },
        None if status == StatusCode::BAD_REQUEST => {
            SubmitError::InvalidInput("request rejected".into())
        }
        None => SubmitError::Transport(format!("submission returned {status}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(code: &str) -> Option<ErrorBody> {
        Some(ErrorBody {
            code: code.into(),
            message: "details".into(),
        })
    }

    #[test]
    fn rejection_codes_map_to_specific_errors() {
        assert_eq!(
            map_rejection(StatusCode::CONFLICT, body("duplicate_value")),
            SubmitError::DuplicateValue
        );
        assert_eq!(
            map_rejection(StatusCode::CONFLICT, body("duplicate_participant")),
            SubmitError::DuplicateParticipant
        );
        assert!(matches!(
            map_rejection(StatusCode::BAD_REQUEST, body("bad_request")),
            SubmitError::InvalidInput(_)
        ));
    }

    #[test]
    fn opaque_rejections_become_transport_errors() {
        assert!(matches!(
            map_rejection(StatusCode::SERVICE_UNAVAILABLE, None),
            SubmitError::Transport(_)
        ));
        assert!(matches!(
            map_rejection(StatusCode::CONFLICT, body("already_ended")),
            SubmitError::Transport(_)
        ));
    }

    #[test]
    fn base_url_trailing_slash_is_normalised() {
        let source = HttpSnapshotSource::new("http://localhost:8080/");
        assert_eq!(source.url("/public/snapshot"), "http://localhost:8080/public/snapshot");
    }
}
