//! HTTP submitter posting frames as multipart forms.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::debug;

use crate::config::RelayConfig;
use crate::core::{Cause, NetworkError, SchedulerError};
use crate::producer::{Acknowledgment, Submission, Submitter};

/// Posts each submission to `<endpoint>/api/actions`.
///
/// Form fields: `capture` (the image file), `location_x` (latitude) and
/// `location_y` (longitude). Every request is bounded by the configured
/// deadline, independent of the polling interval.
#[derive(Debug, Clone)]
pub struct HttpSubmitter {
    client: reqwest::Client,
    url: String,
    deadline: Duration,
}

impl HttpSubmitter {
    /// Build a submitter for `cfg`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Backend`] if the HTTP client cannot be built.
    pub fn new(cfg: &RelayConfig) -> Result<Self, SchedulerError> {
        let deadline = cfg.submit_deadline();
        let client = reqwest::Client::builder()
            .timeout(deadline)
            .build()
            .map_err(|e| SchedulerError::Backend(format!("http client: {e}")))?;
        Ok(Self {
            client,
            url: cfg.actions_url(),
            deadline,
        })
    }

    /// Build a submitter around a preconfigured client.
    ///
    /// The configured deadline is still applied to every request.
    #[must_use]
    pub fn with_client(cfg: &RelayConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            url: cfg.actions_url(),
            deadline: cfg.submit_deadline(),
        }
    }

    /// Target URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    fn classify(&self, err: reqwest::Error) -> NetworkError {
        if err.is_timeout() {
            NetworkError::timeout(self.deadline).with_cause(Cause::new(err))
        } else {
            NetworkError::transport(format!("request failed: {err}")).with_cause(Cause::new(err))
        }
    }
}

#[async_trait]
impl Submitter for HttpSubmitter {
    async fn submit(&self, submission: Submission) -> Result<Acknowledgment, NetworkError> {
        let Submission {
            frame,
            fix,
            file_name,
        } = submission;

        let part = Part::bytes(frame.data)
            .file_name(file_name)
            .mime_str(&frame.content_type)
            .map_err(|e| self.classify(e))?;
        let form = Form::new()
            .part("capture", part)
            .text("location_x", fix.latitude.to_string())
            .text("location_y", fix.longitude.to_string());

        let response = self
            .client
            .post(&self.url)
            .timeout(self.deadline)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::transport(format!(
                "server responded with status {}",
                status.as_u16()
            )));
        }

        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).map_err(|e| {
                NetworkError::transport(format!("malformed response body: {e}"))
                    .with_cause(Cause::new(e))
            })?
        };
        debug!(url = %self.url, status = status.as_u16(), "submission accepted");

        Ok(Acknowledgment {
            status: status.as_u16(),
            body,
        })
    }
}
