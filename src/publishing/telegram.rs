//! Telegram channel posting via the Bot API `sendPhoto` method.

use std::path::PathBuf;

use tracing::error;

use crate::config::TelegramConfig;

/// Where a post image lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageLocation {
    File(PathBuf),
    Url(String),
}

impl ImageLocation {
    pub fn as_string(&self) -> String {
        match self {
            ImageLocation::File(p) => p.display().to_string(),
            ImageLocation::Url(u) => u.clone(),
        }
    }
}

/// Post `image` with `caption` to the configured chat. `true` only when
/// Telegram accepted the photo; every failure is logged and yields `false`.
pub async fn post_image_to_telegram(config: &TelegramConfig, image: &ImageLocation, caption: &str) -> bool {
    let (Some(token), Some(chat_id)) = (config.bot_token.as_deref(), config.chat_id.as_deref()) else {
        error!("missing Telegram bot token or chat id; cannot post");
        return false;
    };
    if caption.trim().is_empty() {
        error!("missing caption; cannot post to Telegram");
        return false;
    }
    if let ImageLocation::File(path) = image {
        if !path.is_file() {
            error!(path = %path.display(), "image file not found; cannot post to Telegram");
            return false;
        }
    }
    send_photo(config, token, chat_id, image, caption).await
}

#[cfg(feature = "telegram")]
async fn send_photo(config: &TelegramConfig, token: &str, chat_id: &str, image: &ImageLocation, caption: &str) -> bool {
    use std::time::Duration;

    use teloxide::payloads::SendPhotoSetters;
    use teloxide::prelude::*;
    use teloxide::types::{ChatId, InputFile, ParseMode, Recipient};
    use tracing::info;

    use crate::config::CaptionParseMode;

    let client = match teloxide::net::default_reqwest_settings()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "failed to build Telegram HTTP client");
            return false;
        }
    };

    let mut bot = Bot::with_client(token, client);
    if let Some(api_url) = &config.api_url {
        match reqwest::Url::parse(api_url) {
            Ok(url) => bot = bot.set_api_url(url),
            Err(e) => {
                error!(%api_url, error = %e, "invalid [telegram].api_url");
                return false;
            }
        }
    }

    let recipient = match chat_id.parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) => Recipient::ChannelUsername(chat_id.to_string()),
    };

    let photo = match image {
        ImageLocation::File(path) => InputFile::file(path.clone()),
        ImageLocation::Url(url) => match reqwest::Url::parse(url) {
            Ok(url) => InputFile::url(url),
            Err(e) => {
                error!(%url, error = %e, "invalid image URL");
                return false;
            }
        },
    };

    let parse_mode = match config.parse_mode {
        CaptionParseMode::Html => ParseMode::Html,
        CaptionParseMode::MarkdownV2 => ParseMode::MarkdownV2,
    };

    info!(chat = %chat_id, image = %image.as_string(), "posting image to Telegram");
    match bot.send_photo(recipient, photo).caption(caption).parse_mode(parse_mode).await {
        Ok(_) => {
            info!(chat = %chat_id, "posted image to Telegram");
            true
        }
        Err(e) => {
            error!(chat = %chat_id, error = %e, "Telegram sendPhoto failed");
            false
        }
    }
}

#[cfg(not(feature = "telegram"))]
async fn send_photo(_config: &TelegramConfig, _token: &str, _chat_id: &str, _image: &ImageLocation, _caption: &str) -> bool {
    error!("built without the `telegram` feature; cannot post");
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CaptionParseMode;

    fn config() -> TelegramConfig {
        TelegramConfig {
            bot_token: Some("123:abc".into()),
            chat_id: Some("-100123".into()),
            parse_mode: CaptionParseMode::Html,
            timeout_seconds: 2,
            api_url: Some("http://127.0.0.1:9/".into()),
        }
    }

    #[tokio::test]
    async fn missing_credentials_is_false() {
        let cfg = TelegramConfig { bot_token: None, ..config() };
        assert!(!post_image_to_telegram(&cfg, &ImageLocation::Url("https://x/y.png".into()), "hi").await);
    }

    #[tokio::test]
    async fn missing_file_is_false() {
        let image = ImageLocation::File("/nonexistent/image.png".into());
        assert!(!post_image_to_telegram(&config(), &image, "hi").await);
    }

    #[tokio::test]
    async fn empty_caption_is_false() {
        assert!(!post_image_to_telegram(&config(), &ImageLocation::Url("https://x/y.png".into()), "  ").await);
    }

    #[tokio::test]
    async fn unreachable_api_is_false() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let image = ImageLocation::File(tmp.path().to_path_buf());
        assert!(!post_image_to_telegram(&config(), &image, "hi").await);
    }
}
