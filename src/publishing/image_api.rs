//! Client for the external post-image API: POST a vocabulary record, get
//! back the URL of the rendered image.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, error, info};

use super::vocab::VocabOutput;
use crate::error::AppError;

/// The image API sits behind a WAF that rejects non-browser agents.
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/113.0.0.0 Safari/537.36";

#[derive(Debug, Deserialize)]
struct ImageApiResponse {
    #[serde(default)]
    image_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ImageApiClient {
    client: Client,
    url: String,
}

impl ImageApiClient {
    pub fn new(url: impl Into<String>, timeout_seconds: u64) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::Config(format!("failed to build image API client: {e}")))?;
        Ok(Self { client, url: url.into() })
    }

    /// POST `payload`; `Some(image_url)` on 200/201 with a non-empty
    /// `image_url`, `None` for anything else.
    pub async fn create_image(&self, payload: &VocabOutput) -> Option<String> {
        debug!(url = %self.url, word = %payload.word, "requesting post image");

        let response = match self.client.post(&self.url).json(payload).send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                error!(url = %self.url, "image API request timed out");
                return None;
            }
            Err(e) => {
                error!(url = %self.url, error = %e, "image API request failed");
                return None;
            }
        };

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body.chars().take(300).collect::<String>(), "image API error");
            return None;
        }

        match response.json::<ImageApiResponse>().await {
            Ok(ImageApiResponse { image_url: Some(url) }) if !url.trim().is_empty() => {
                info!(word = %payload.word, image_url = %url, "post image created");
                Some(url)
            }
            Ok(_) => {
                error!("image API response has no image_url");
                None
            }
            Err(e) => {
                error!(error = %e, "image API response is not valid JSON");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_endpoint_is_none() {
        let client = ImageApiClient::new("http://127.0.0.1:9/api/posts/image", 2).unwrap();
        assert!(client.create_image(&VocabOutput::default()).await.is_none());
    }
}
