//! Local image rendering: HTML template → headless browser screenshot.
//!
//! Templates are Handlebars with `post.<field>` and `background_image_base64`
//! in scope. Use `{{{ }}}` for values that must not be HTML-escaped, such as
//! base64 inside a `<style>` block.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use handlebars::Handlebars;
use serde_json::json;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use super::vocab::VocabOutput;
use crate::config::ImageConfig;

const BROWSER_FLAGS: [&str; 2] = ["--headless=new", "--hide-scrollbars"];

const BROWSER_NAMES: [&str; 7] = [
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "microsoft-edge",
    "microsoft-edge-stable",
    "chrome",
];

const WELL_KNOWN_BROWSERS: [&str; 3] = [
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Google Chrome Canary.app/Contents/MacOS/Google Chrome Canary",
    "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
];

/// Base64 of the file at `path`, or `None` (logged) if it cannot be read.
pub fn encode_image_base64(path: &Path) -> Option<String> {
    match std::fs::read(path) {
        Ok(bytes) => Some(BASE64.encode(bytes)),
        Err(e) => {
            error!(path = %path.display(), error = %e, "cannot read image for base64 encoding");
            None
        }
    }
}

/// Render `templates_dir/template` for `post`. `None` when the template is
/// missing, unreadable or malformed.
pub fn render_html_template(
    templates_dir: &Path,
    template: &str,
    post: &VocabOutput,
    background_base64: Option<&str>,
) -> Option<String> {
    let path = templates_dir.join(template);
    let source = match std::fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) => {
            error!(path = %path.display(), error = %e, "template not found");
            return None;
        }
    };
    let html = render_template_str(&source, post, background_base64)?;
    debug!(template = %template, bytes = html.len(), "rendered HTML template");
    Some(html)
}

/// Render a Handlebars template against `post` and the background image.
/// Unknown fields render empty; `{{ }}` values are HTML-escaped.
pub fn render_template_str(source: &str, post: &VocabOutput, background_base64: Option<&str>) -> Option<String> {
    let data = json!({
        "post": post,
        "background_image_base64": background_base64.unwrap_or_default(),
    });
    match Handlebars::new().render_template(source, &data) {
        Ok(html) => Some(html),
        Err(e) => {
            error!(error = %e, "cannot render HTML template");
            None
        }
    }
}

/// The configured browser if it exists, else the first Chrome/Chromium/Edge
/// found on `PATH` or in the usual macOS application paths.
pub fn find_browser(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        warn!(path = %path.display(), "configured browser_path does not exist");
    }

    if let Some(paths) = env::var_os("PATH") {
        for dir in env::split_paths(&paths) {
            for name in BROWSER_NAMES {
                let candidate = dir.join(name);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }
    }

    WELL_KNOWN_BROWSERS.iter().map(PathBuf::from).find(|p| p.is_file())
}

/// `vocab_<word>_<timestamp>.png` with the word reduced to `[a-z0-9_-]`.
pub fn output_filename_for(word: &str) -> String {
    let slug: String = word
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    let slug = if slug.is_empty() { "post".to_string() } else { slug };
    format!("vocab_{slug}_{}.png", chrono::Utc::now().format("%Y%m%d%H%M%S%3f"))
}

/// Screenshots HTML with a headless browser into `output_dir`.
#[derive(Debug, Clone)]
pub struct ImageRenderer {
    browser: Option<PathBuf>,
    output_dir: PathBuf,
    size: (u32, u32),
    timeout: Duration,
}

impl ImageRenderer {
    pub fn new(browser: Option<PathBuf>, output_dir: PathBuf, size: (u32, u32), timeout: Duration) -> Self {
        Self { browser, output_dir, size, timeout }
    }

    pub fn from_config(config: &ImageConfig) -> Self {
        let browser = find_browser(config.browser_path.as_deref());
        match &browser {
            Some(path) => info!(browser = %path.display(), "headless browser found"),
            None => warn!("no headless browser found; local image rendering is unavailable"),
        }
        Self::new(
            browser,
            config.output_dir.clone(),
            (config.width, config.height),
            Duration::from_secs(config.screenshot_timeout_seconds),
        )
    }

    /// Screenshot `html` (plus optional `css`) to `output_dir/output_filename`.
    ///
    /// `None` if no browser is available, the browser fails or times out, or
    /// the screenshot file is missing afterwards.
    pub async fn generate_image_local(
        &self,
        html: &str,
        css: Option<&str>,
        output_filename: &str,
    ) -> Option<PathBuf> {
        let Some(browser) = &self.browser else {
            error!("cannot render image: no headless browser available");
            return None;
        };

        if let Err(e) = tokio::fs::create_dir_all(&self.output_dir).await {
            error!(dir = %self.output_dir.display(), error = %e, "cannot create image output directory");
            return None;
        }

        let page = self.output_dir.join(format!("{output_filename}.html"));
        if let Err(e) = tokio::fs::write(&page, with_css(html, css)).await {
            error!(path = %page.display(), error = %e, "cannot write HTML for screenshot");
            return None;
        }

        let result = self.screenshot(browser, &page, output_filename).await;
        let _ = tokio::fs::remove_file(&page).await;
        result
    }

    async fn screenshot(&self, browser: &Path, page: &Path, output_filename: &str) -> Option<PathBuf> {
        let page = tokio::fs::canonicalize(page).await.ok()?;
        let output_dir = tokio::fs::canonicalize(&self.output_dir).await.ok()?;
        let output = output_dir.join(output_filename);
        let (width, height) = self.size;

        let mut cmd = Command::new(browser);
        cmd.args(BROWSER_FLAGS)
            .arg(format!("--screenshot={}", output.display()))
            .arg(format!("--window-size={width},{height}"))
            .arg(format!("file://{}", page.display()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(browser = %browser.display(), output = %output.display(), "taking screenshot");

        let run = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(run)) => run,
            Ok(Err(e)) => {
                error!(browser = %browser.display(), error = %e, "failed to launch browser");
                return None;
            }
            Err(_) => {
                error!(timeout_secs = self.timeout.as_secs(), "browser screenshot timed out");
                return None;
            }
        };

        if !run.status.success() {
            let stderr = String::from_utf8_lossy(&run.stderr);
            error!(status = %run.status, stderr = %stderr.trim(), "browser exited with failure");
            return None;
        }

        if tokio::fs::metadata(&output).await.is_err() {
            error!(path = %output.display(), "browser finished but screenshot is missing");
            return None;
        }

        info!(path = %output.display(), "image generated locally");
        Some(output)
    }
}

fn with_css(html: &str, css: Option<&str>) -> String {
    match css.map(str::trim).filter(|c| !c.is_empty()) {
        Some(css) => format!("{html}<style>{css}</style>"),
        None => html.to_string(),
    }
}
