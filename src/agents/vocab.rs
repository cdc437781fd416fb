//! Vocabulary agent: turns a [`WordRequest`] into a post image, caching the
//! image location per normalized word.

use tracing::{error, info, warn};

use super::AgentContext;
use crate::error::AppError;
use crate::models::{VocabResponse, WordRequest};
use crate::publishing::{ImageLocation, Publisher};
use crate::relay::{Envelope, RelayError};

#[derive(Debug)]
pub struct VocabAgent {
    publisher: Publisher,
    publish_to_telegram: bool,
    telegram_ready: bool,
    llm_key_missing: bool,
}

/// Lowercased, trimmed form used as the cache key.
pub fn normalize_word(word: &str) -> String {
    word.trim().to_lowercase()
}

impl VocabAgent {
    pub fn new(publisher: Publisher, publish_to_telegram: bool, telegram_ready: bool, llm_key_missing: bool) -> Self {
        Self { publisher, publish_to_telegram, telegram_ready, llm_key_missing }
    }

    pub fn on_startup(&self, _ctx: &AgentContext) -> Result<(), AppError> {
        if self.llm_key_missing {
            warn!("LLM_API_KEY not set; vocabulary generation will fail");
        }
        if self.publish_to_telegram && !self.telegram_ready {
            warn!("publish_to_telegram is on but TELEGRAM_BOT_TOKEN or TELEGRAM_CHAT_ID is missing");
        }
        Ok(())
    }

    pub async fn on_envelope(&self, ctx: &AgentContext, envelope: &Envelope) -> Result<bool, RelayError> {
        if !envelope.is::<WordRequest>() {
            return Ok(false);
        }
        let msg = envelope.decode::<WordRequest>()?;
        info!(sender = %envelope.sender, word = %msg.word, "word request received");
        let response = self.respond(ctx, &msg.word).await;
        if let Err(e) = ctx.send(&envelope.sender, &response).await {
            error!(sender = %envelope.sender, word = %response.word, error = %e, "failed to deliver vocabulary response");
        }
        Ok(true)
    }

    /// Cached image if any, else generate → image → cache → optional Telegram.
    pub async fn respond(&self, ctx: &AgentContext, raw_word: &str) -> VocabResponse {
        let word = normalize_word(raw_word);
        if word.is_empty() {
            return VocabResponse::failed(word, "word must not be empty");
        }

        if let Some(cached) = ctx.storage.get_as::<String>(&word).filter(|s| !s.is_empty()) {
            info!(%word, image = %cached, "word already generated; returning cached image");
            return VocabResponse { word, image_url: Some(cached), data: None, error: None };
        }

        let Some(post) = self.publisher.generate(&word).await else {
            error!(%word, "failed to generate vocabulary data");
            return VocabResponse::failed(word, "failed to generate vocabulary data");
        };

        let image = self.publisher.produce_image(&post).await;
        match &image {
            Some(location) => {
                let location = location.as_string();
                info!(%word, image = %location, "post image ready");
                if let Err(e) = ctx.storage.set_as(&word, &location) {
                    error!(%word, error = %e, "failed to cache image location");
                }
            }
            None => warn!(%word, "no image produced"),
        }

        if self.publish_to_telegram {
            if let Some(location) = &image {
                self.publisher.post_to_telegram(&post, location).await;
            }
        }

        VocabResponse {
            word,
            image_url: image.as_ref().map(ImageLocation::as_string),
            data: Some(post),
            error: None,
        }
    }
}
