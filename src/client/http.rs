//! Status source reading the HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;

use crate::config::API_KEY_HEADER;
use crate::error::ErrorResponse;
use crate::models::JobStatusResponse;

use super::{JobStatusSource, PollError};

/// Upper bound on a single status read.
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Reads `GET {base_url}/api/v1/jobs/{id}`.
#[derive(Clone)]
pub struct HttpStatusSource {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl HttpStatusSource {
    pub fn new(base_url: &str, api_key: Option<SecretString>) -> Result<Self, PollError> {
        let client = reqwest::Client::builder()
            .timeout(READ_TIMEOUT)
            .build()
            .map_err(|e| PollError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn job_url(&self, job_id: Uuid) -> String {
        format!("{}/api/v1/jobs/{}", self.base_url, job_id)
    }
}

#[async_trait]
impl JobStatusSource for HttpStatusSource {
    async fn fetch(&self, job_id: Uuid) -> Result<JobStatusResponse, PollError> {
        let mut request = self.client.get(self.job_url(job_id));
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| PollError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorResponse>().await {
                Ok(body) => body.message,
                Err(_) => status.canonical_reason().unwrap_or("unknown").to_string(),
            };
            return Err(PollError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<JobStatusResponse>()
            .await
            .map_err(|e| PollError::Decode(e.to_string()))
    }
}
