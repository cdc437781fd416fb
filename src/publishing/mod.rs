//! Vocabulary post pipeline: generate the record, turn it into an image
//! (image API or local render), optionally post it to Telegram.
//!
//! Every step degrades to `None`/`false` after logging; nothing here returns
//! an error to the caller once the [`Publisher`] has been built.

pub mod image_api;
pub mod render;
pub mod telegram;
pub mod vocab;

pub use image_api::ImageApiClient;
pub use render::{ImageRenderer, encode_image_base64, render_html_template};
pub use telegram::{ImageLocation, post_image_to_telegram};
pub use vocab::{VocabGenerator, VocabOutput, clean_json_response};

use handlebars::html_escape as escape_html;
use tracing::{info, warn};

use crate::config::{Config, ImageConfig, ImageMode, TelegramConfig};
use crate::error::AppError;
use crate::llm::LlmProvider;
use render::output_filename_for;

/// Telegram rejects photo captions longer than this.
pub const CAPTION_LIMIT: usize = 1024;

/// HTML caption for a post. Sections are appended in order until the next
/// one would exceed [`CAPTION_LIMIT`].
pub fn build_caption(post: &VocabOutput) -> String {
    let mut head = format!("<b>{}</b>", escape_html(&post.word));
    if !post.phonetics.is_empty() {
        head.push_str(&format!(" <i>{}</i>", escape_html(&post.phonetics)));
    }
    if !post.word_arabic.is_empty() {
        head.push_str(&format!("\n{}", escape_html(&post.word_arabic)));
    }

    let labelled = |label: &str, value: &str| -> Option<String> {
        (!value.is_empty()).then(|| format!("<b>{label}:</b> {}", escape_html(value)))
    };

    let sections: Vec<String> = [
        labelled("Meaning", &post.meaning),
        (!post.example.is_empty()).then(|| {
            let mut s = format!("<b>Example:</b> {}", escape_html(&post.example));
            if !post.example_arabic.is_empty() {
                s.push_str(&format!("\n{}", escape_html(&post.example_arabic)));
            }
            s
        }),
        labelled("Synonyms", &post.synonyms),
        labelled("Antonyms", &post.antonyms),
        post.question.as_deref().and_then(|q| labelled("Question", q)),
        post.url.as_deref().map(|u| format!("<a href=\"{}\">More</a>", escape_html(u))),
    ]
    .into_iter()
    .flatten()
    .collect();

    let mut caption = head;
    for section in sections {
        let candidate = format!("{caption}\n\n{section}");
        if candidate.chars().count() > CAPTION_LIMIT {
            break;
        }
        caption = candidate;
    }
    caption
}

/// Result of one full publish run.
#[derive(Debug, Clone)]
pub struct Published {
    pub post: VocabOutput,
    pub image: Option<ImageLocation>,
    pub posted: bool,
}

/// Wires the generator, the configured image backend and Telegram together.
#[derive(Debug, Clone)]
pub struct Publisher {
    generator: VocabGenerator,
    image: ImageConfig,
    image_api: ImageApiClient,
    renderer: ImageRenderer,
    telegram: TelegramConfig,
}

impl Publisher {
    pub fn from_config(config: &Config, llm: LlmProvider) -> Result<Self, AppError> {
        let renderer = match config.image.mode {
            ImageMode::Local => ImageRenderer::from_config(&config.image),
            ImageMode::Remote => ImageRenderer::new(
                None,
                config.image.output_dir.clone(),
                (config.image.width, config.image.height),
                std::time::Duration::from_secs(config.image.screenshot_timeout_seconds),
            ),
        };
        Ok(Self {
            generator: VocabGenerator::new(llm, &config.prompts_dir),
            image: config.image.clone(),
            image_api: ImageApiClient::new(&config.image.api_url, config.image.timeout_seconds)?,
            renderer,
            telegram: config.telegram.clone(),
        })
    }

    pub async fn generate(&self, word: &str) -> Option<VocabOutput> {
        self.generator.generate(word).await
    }

    /// Image for `post` using the configured mode.
    pub async fn produce_image(&self, post: &VocabOutput) -> Option<ImageLocation> {
        match self.image.mode {
            ImageMode::Remote => self.image_api.create_image(post).await.map(ImageLocation::Url),
            ImageMode::Local => self.render_local(post).await.map(ImageLocation::File),
        }
    }

    /// Template → HTML → screenshot. A missing background only drops the
    /// background; a missing template aborts.
    pub async fn render_local(&self, post: &VocabOutput) -> Option<std::path::PathBuf> {
        let background = if self.image.background.is_file() {
            encode_image_base64(&self.image.background)
        } else {
            warn!(path = %self.image.background.display(), "background image not found; rendering without it");
            None
        };
        let html = render_html_template(&self.image.templates_dir, &self.image.template, post, background.as_deref())?;
        self.renderer
            .generate_image_local(&html, None, &output_filename_for(&post.word))
            .await
    }

    pub async fn post_to_telegram(&self, post: &VocabOutput, image: &ImageLocation) -> bool {
        post_image_to_telegram(&self.telegram, image, &build_caption(post)).await
    }

    /// Generate, produce the image, and post when `to_telegram` is set.
    /// `None` only when generation itself failed.
    pub async fn publish(&self, word: &str, to_telegram: bool) -> Option<Published> {
        let post = self.generate(word).await?;
        let image = self.produce_image(&post).await;
        let posted = match (&image, to_telegram) {
            (Some(image), true) => self.post_to_telegram(&post, image).await,
            (None, true) => {
                warn!(word = %post.word, "no image produced; skipping Telegram");
                false
            }
            _ => false,
        };
        info!(word = %post.word, image = ?image.as_ref().map(ImageLocation::as_string), posted, "publish finished");
        Some(Published { post, image, posted })
    }
}
