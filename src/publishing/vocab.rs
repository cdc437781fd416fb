//! Vocabulary record generation: prompt → LLM (JSON-schema output) →
//! cleaned JSON → [`VocabOutput`] with defaults for anything missing.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{error, info, warn};

use crate::llm::{CompletionRequest, LlmProvider, ResponseFormat};
use crate::prompt::PromptBuilder;

const VOCAB_PROMPT_FILE: &str = "vocab_entry.txt";

const DEFAULT_VOCAB_PROMPT: &str = "\
You are an English vocabulary teacher writing short posts for Arabic-speaking learners.
Produce a vocabulary entry for the English word \"{{word}}\".
Respond with a single JSON object and nothing else, using exactly these keys:
word, translation (Arabic), phonetics (IPA), meaning (one short English sentence),
synonyms (comma-separated), antonyms (comma-separated), example_sentence,
example_translation (Arabic), reference_url (a dictionary page for the word),
discussion_question (one question inviting learners to use the word).";

/// The record shape the external web backend expects.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VocabOutput {
    pub word: String,
    pub word_arabic: String,
    pub phonetics: String,
    pub meaning: String,
    pub synonyms: String,
    pub antonyms: String,
    pub example: String,
    pub example_arabic: String,
    #[serde(default)]
    pub icon: String,
    pub description: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
}

/// Keys the model is asked for, in schema order.
const SCHEMA_KEYS: [&str; 10] = [
    "word",
    "translation",
    "phonetics",
    "meaning",
    "synonyms",
    "antonyms",
    "example_sentence",
    "example_translation",
    "reference_url",
    "discussion_question",
];

/// JSON schema sent as `response_format` so the model returns the fixed keys.
pub fn vocab_schema() -> Value {
    let properties: Map<String, Value> = SCHEMA_KEYS
        .iter()
        .map(|k| (k.to_string(), json!({ "type": "string" })))
        .collect();
    json!({
        "type": "object",
        "properties": properties,
        "required": SCHEMA_KEYS,
        "additionalProperties": false,
    })
}

/// Strip Markdown code fences (```` ```json ````, ```` ``` ````) and surrounding
/// whitespace, repeating until nothing changes.
pub fn clean_json_response(text: &str) -> String {
    let mut current = text.trim();
    loop {
        let mut next = current;
        if let Some(rest) = strip_prefix_ignore_case(next, "```json") {
            next = rest.trim_start();
        } else if let Some(rest) = next.strip_prefix("```") {
            next = rest.trim_start();
        }
        if let Some(rest) = next.strip_suffix("```") {
            next = rest.trim_end();
        }
        let next = next.trim();
        if next == current {
            return current.to_string();
        }
        current = next;
    }
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &text[prefix.len()..])
}

/// Parse model output into a record.
///
/// Returns `None` only when the content is not a JSON object after cleaning.
/// Missing or oddly-typed keys fall back to defaults: `word` to the
/// requested word, strings to `""`, `description` to `meaning`, `url` and
/// `question` to `None`. Arrays are joined with `", "`.
pub fn parse_vocab_content(requested_word: &str, content: &str) -> Option<VocabOutput> {
    let cleaned = clean_json_response(content);
    let value: Value = match serde_json::from_str(&cleaned) {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, content = %truncate(&cleaned, 300), "LLM content is not valid JSON");
            return None;
        }
    };
    let Some(obj) = record_object(&value) else {
        error!(content = %truncate(&cleaned, 300), "LLM content is not a JSON object");
        return None;
    };

    let field = |keys: &[&str]| -> String {
        keys.iter()
            .find_map(|k| obj.get(*k).and_then(text_of))
            .unwrap_or_default()
    };
    let optional = |keys: &[&str]| -> Option<String> { Some(field(keys)).filter(|s| !s.is_empty()) };

    let word = optional(&["word"]).unwrap_or_else(|| requested_word.to_string());
    let meaning = field(&["meaning", "definition"]);
    let description = optional(&["description"]).unwrap_or_else(|| meaning.clone());

    let missing: Vec<&str> = SCHEMA_KEYS.iter().copied().filter(|k| !obj.contains_key(*k)).collect();
    if !missing.is_empty() {
        warn!(word = %word, ?missing, "LLM response missing keys; using defaults");
    }

    Some(VocabOutput {
        word,
        word_arabic: field(&["translation", "word_arabic", "arabic"]),
        phonetics: field(&["phonetics", "pronunciation"]),
        meaning,
        synonyms: field(&["synonyms"]),
        antonyms: field(&["antonyms"]),
        example: field(&["example_sentence", "example"]),
        example_arabic: field(&["example_translation", "example_arabic"]),
        icon: field(&["icon"]),
        description,
        url: optional(&["reference_url", "url"]),
        question: optional(&["discussion_question", "question"]),
    })
}

/// The record object, unwrapping a single-key wrapper like `{"vocabulary": {...}}`.
fn record_object(value: &Value) -> Option<&Map<String, Value>> {
    let obj = value.as_object()?;
    if obj.len() == 1 && !SCHEMA_KEYS.iter().any(|k| obj.contains_key(*k)) {
        if let Some(inner) = obj.values().next().and_then(Value::as_object) {
            return Some(inner);
        }
    }
    Some(obj)
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(text_of).filter(|s| !s.is_empty()).collect();
            Some(parts.join(", "))
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Object(_) => None,
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// Generates [`VocabOutput`] records through the configured LLM.
#[derive(Debug, Clone)]
pub struct VocabGenerator {
    llm: LlmProvider,
    prompts_dir: PathBuf,
}

impl VocabGenerator {
    pub fn new(llm: LlmProvider, prompts_dir: impl Into<PathBuf>) -> Self {
        Self { llm, prompts_dir: prompts_dir.into() }
    }

    pub fn prompt_for(&self, word: &str) -> String {
        PromptBuilder::new(&self.prompts_dir)
            .layer_or(VOCAB_PROMPT_FILE, DEFAULT_VOCAB_PROMPT)
            .var("word", word)
            .build()
    }

    /// Generate the record for `word`. `None` on any HTTP, timeout, or
    /// format failure; never panics.
    pub async fn generate(&self, word: &str) -> Option<VocabOutput> {
        let word = word.trim();
        if word.is_empty() {
            warn!("refusing to generate vocabulary for an empty word");
            return None;
        }

        let request = CompletionRequest::user(self.prompt_for(word)).with_response_format(
            ResponseFormat::JsonSchema { name: "vocabulary_entry".into(), schema: vocab_schema() },
        );

        info!(%word, provider = self.llm.name(), "requesting vocabulary entry");
        let response = match self.llm.complete(&request).await {
            Ok(r) => r,
            Err(e) => {
                error!(%word, error = %e, "vocabulary LLM call failed");
                return None;
            }
        };

        let record = parse_vocab_content(word, &response.text)?;
        info!(
            %word,
            input_tokens = ?response.usage.map(|u| u.input_tokens),
            output_tokens = ?response.usage.map(|u| u.output_tokens),
            "vocabulary entry generated"
        );
        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_strips_json_fence() {
        assert_eq!(clean_json_response("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
    }

    #[test]
    fn clean_is_case_insensitive_and_handles_bare_fence() {
        assert_eq!(clean_json_response("```JSON {\"a\": 1} ```"), "{\"a\": 1}");
        assert_eq!(clean_json_response("```\n{}\n```"), "{}");
    }

    #[test]
    fn clean_trims_plain_text() {
        assert_eq!(clean_json_response("  \n{\"a\": 1}\t "), "{\"a\": 1}");
    }

    #[test]
    fn clean_is_idempotent() {
        let inputs = [
            "```json\n{\"a\": 1}\n```",
            "```json ```json {} ``` ```",
            "  plain  ",
            "```",
            "",
            "```json",
        ];
        for input in inputs {
            let once = clean_json_response(input);
            assert_eq!(clean_json_response(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn clean_leaves_inner_backticks() {
        assert_eq!(clean_json_response("{\"code\": \"`x`\"}"), "{\"code\": \"`x`\"}");
    }

    #[test]
    fn full_response_maps_every_field() {
        let content = r#"```json
{
  "word": "Resilient",
  "translation": "مرن",
  "phonetics": "/rɪˈzɪliənt/",
  "meaning": "Able to recover quickly.",
  "synonyms": "tough, hardy",
  "antonyms": "fragile",
  "example_sentence": "She is resilient.",
  "example_translation": "هي مرنة.",
  "reference_url": "https://dictionary.example/resilient",
  "discussion_question": "When were you resilient?"
}
```"#;
        let out = parse_vocab_content("resilient", content).unwrap();
        assert_eq!(out.word, "Resilient");
        assert_eq!(out.word_arabic, "مرن");
        assert_eq!(out.example, "She is resilient.");
        assert_eq!(out.example_arabic, "هي مرنة.");
        assert_eq!(out.description, "Able to recover quickly.");
        assert_eq!(out.icon, "");
        assert_eq!(out.url.as_deref(), Some("https://dictionary.example/resilient"));
        assert_eq!(out.question.as_deref(), Some("When were you resilient?"));
    }

    #[test]
    fn missing_keys_degrade_to_defaults() {
        let out = parse_vocab_content("apple", r#"{"meaning": "A fruit."}"#).unwrap();
        assert_eq!(out.word, "apple");
        assert_eq!(out.word_arabic, "");
        assert_eq!(out.synonyms, "");
        assert_eq!(out.description, "A fruit.");
        assert!(out.url.is_none());
        assert!(out.question.is_none());
    }

    #[test]
    fn empty_object_degrades_to_defaults() {
        let out = parse_vocab_content("apple", "{}").unwrap();
        assert_eq!(out, VocabOutput { word: "apple".into(), ..Default::default() });
    }

    #[test]
    fn arrays_and_wrapper_object_are_accepted() {
        let content = r#"{"vocabulary": {"word": "swift", "synonyms": ["fast", "quick"], "antonyms": []}}"#;
        let out = parse_vocab_content("swift", content).unwrap();
        assert_eq!(out.synonyms, "fast, quick");
        assert_eq!(out.antonyms, "");
    }

    #[test]
    fn wrong_types_fall_back() {
        let out = parse_vocab_content("x", r#"{"word": null, "meaning": {"nested": true}, "phonetics": 7}"#).unwrap();
        assert_eq!(out.word, "x");
        assert_eq!(out.meaning, "");
        assert_eq!(out.phonetics, "7");
    }

    #[test]
    fn non_object_json_is_none() {
        assert!(parse_vocab_content("x", "[1, 2]").is_none());
        assert!(parse_vocab_content("x", "\"just a string\"").is_none());
    }

    #[test]
    fn malformed_json_is_none() {
        assert!(parse_vocab_content("x", "```json\n{\"word\": \n```").is_none());
        assert!(parse_vocab_content("x", "[echo] hello").is_none());
    }

    #[test]
    fn schema_requires_every_key() {
        let schema = vocab_schema();
        assert_eq!(schema["required"].as_array().unwrap().len(), SCHEMA_KEYS.len());
        assert_eq!(schema["additionalProperties"], false);
    }

    #[tokio::test]
    async fn dummy_provider_output_is_not_a_record() {
        let generator = VocabGenerator::new(
            LlmProvider::Dummy(crate::llm::providers::dummy::DummyProvider),
            "/nonexistent",
        );
        assert!(generator.generate("apple").await.is_none());
        assert!(generator.generate("   ").await.is_none());
    }

    #[test]
    fn fallback_prompt_mentions_word() {
        let generator = VocabGenerator::new(
            LlmProvider::Dummy(crate::llm::providers::dummy::DummyProvider),
            "/nonexistent",
        );
        assert!(generator.prompt_for("serendipity").contains("\"serendipity\""));
    }
}
