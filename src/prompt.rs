//! Prompt templates loaded from `config/prompts/`.
//!
//! Variable substitution uses `{{key}}` syntax and is applied once at
//! [`build()`](PromptBuilder::build) time, after all parts are joined.
//! A missing template file falls back to the built-in text passed to
//! [`PromptBuilder::layer_or`], so the binary works without the config tree.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

const SEPARATOR: &str = "\n\n";

pub struct PromptBuilder {
    prompts_dir: PathBuf,
    parts: Vec<String>,
    vars: HashMap<String, String>,
}

impl PromptBuilder {
    pub fn new(prompts_dir: impl Into<PathBuf>) -> Self {
        Self { prompts_dir: prompts_dir.into(), parts: Vec::new(), vars: HashMap::new() }
    }

    /// Append `filename` from the prompts directory, or `fallback` when the
    /// file is missing or blank.
    pub fn layer_or(mut self, filename: &str, fallback: &str) -> Self {
        let path = self.prompts_dir.join(filename);
        let text = match fs::read_to_string(&path) {
            Ok(text) if !text.trim().is_empty() => text,
            _ => {
                tracing::debug!("prompt: '{}' not found, using built-in text", path.display());
                fallback.to_string()
            }
        };
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            self.parts.push(trimmed.to_string());
        }
        self
    }

    pub fn var(mut self, key: &str, value: impl Into<String>) -> Self {
        self.vars.insert(key.to_string(), value.into());
        self
    }

    /// Join all parts with blank lines and apply variable substitution.
    pub fn build(self) -> String {
        let mut prompt = self.parts.join(SEPARATOR);
        for (k, v) in &self.vars {
            let placeholder = format!("{{{{{k}}}}}");
            prompt = prompt.replace(&placeholder, v);
        }
        prompt
    }
}
