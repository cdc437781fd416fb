//! Vocabulary generation, image API and the vocab agent against mock HTTP
//! services.

mod common;

use std::sync::Arc;
use std::time::Duration;

use atelier::agents::{AgentContext, CreatorAgent, VocabAgent, creator::DRAFT_ERROR_TEXT};
use atelier::config::ImageMode;
use atelier::identity::Identity;
use atelier::llm::{CompletionRequest, LlmUsage, providers};
use atelier::models::CommissionRequest;
use atelier::models::{VocabResponse, WordRequest};
use atelier::publishing::{ImageApiClient, ImageLocation, Publisher, VocabGenerator, VocabOutput};
use atelier::relay::{Envelope, LocalRelay, Relay};
use atelier::storage::KvStore;
use axum::http::StatusCode;
use serde_json::json;
use tempfile::TempDir;

use common::{RESILIENT_JSON, chat_completion, config_with_llm, mock_image_api, mock_llm, mock_raw, slow_llm};

fn generator_for(tmp: &TempDir, llm_url: &str) -> VocabGenerator {
    let cfg = config_with_llm(tmp.path(), llm_url);
    let llm = providers::build(&cfg.llm, cfg.llm_api_key.clone()).unwrap();
    VocabGenerator::new(llm, &cfg.prompts_dir)
}

#[tokio::test]
async fn generates_record_from_fenced_json() {
    let tmp = TempDir::new().unwrap();
    let (url, seen) = mock_llm(StatusCode::OK, chat_completion(RESILIENT_JSON)).await;

    let record = generator_for(&tmp, &url).generate("resilient").await.unwrap();
    assert_eq!(record.word, "Resilient");
    assert_eq!(record.word_arabic, "مرن");
    assert_eq!(record.example, "Children are often very resilient.");
    assert_eq!(record.description, record.meaning);
    assert_eq!(record.icon, "");
    assert_eq!(record.question.as_deref(), Some("When did you last have to be resilient?"));

    let requests = seen.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["response_format"]["type"], "json_schema");
    assert!(requests[0]["messages"][0]["content"].as_str().unwrap().contains("\"resilient\""));
}

#[tokio::test]
async fn partial_record_gets_defaults() {
    let tmp = TempDir::new().unwrap();
    let (url, _) = mock_llm(StatusCode::OK, chat_completion(r#"{"meaning": "Quick to recover."}"#)).await;

    let record = generator_for(&tmp, &url).generate("resilient").await.unwrap();
    assert_eq!(record.word, "resilient");
    assert_eq!(record.synonyms, "");
    assert_eq!(record.description, "Quick to recover.");
    assert!(record.url.is_none());
}

#[tokio::test]
async fn http_error_is_none() {
    let tmp = TempDir::new().unwrap();
    let (url, _) = mock_llm(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": { "message": "boom", "type": "server_error" } }),
    )
    .await;
    assert!(generator_for(&tmp, &url).generate("resilient").await.is_none());
}

#[tokio::test]
async fn non_json_content_is_none() {
    let tmp = TempDir::new().unwrap();
    let (url, _) = mock_llm(StatusCode::OK, chat_completion("Sorry, I cannot help with that.")).await;
    assert!(generator_for(&tmp, &url).generate("resilient").await.is_none());
}

#[tokio::test]
async fn non_json_body_is_none() {
    let tmp = TempDir::new().unwrap();
    let url = mock_raw("/v1/chat/completions", StatusCode::OK, "<html>gateway login</html>").await;
    assert!(generator_for(&tmp, &url).generate("resilient").await.is_none());
}

#[tokio::test]
async fn non_json_body_gives_error_draft() {
    let tmp = TempDir::new().unwrap();
    let url = mock_raw("/v1/chat/completions", StatusCode::OK, "not json at all").await;
    let cfg = config_with_llm(tmp.path(), &url);
    let llm = providers::build(&cfg.llm, cfg.llm_api_key.clone()).unwrap();
    let creator = CreatorAgent::new(&cfg.agents.creator, "agent1qclient".into(), llm, cfg.prompts_dir.clone(), false);

    let request = CommissionRequest {
        client_name: "Walter Dark Inc.".into(),
        task_description: "Design a company logo".into(),
        budget: 500.0,
        deadline: "2025-05-10".into(),
    };
    assert_eq!(creator.draft_agreement(&request).await, DRAFT_ERROR_TEXT);
}

#[tokio::test]
async fn provider_reports_token_usage() {
    let tmp = TempDir::new().unwrap();
    let (url, _) = mock_llm(StatusCode::OK, chat_completion("  hello  ")).await;
    let cfg = config_with_llm(tmp.path(), &url);
    let llm = providers::build(&cfg.llm, cfg.llm_api_key.clone()).unwrap();

    let response = llm.complete(&CompletionRequest::user("hi")).await.unwrap();
    assert_eq!(response.text, "hello");
    assert_eq!(response.usage, Some(LlmUsage { input_tokens: 12, output_tokens: 34 }));
}

#[tokio::test]
async fn missing_choices_is_none() {
    let tmp = TempDir::new().unwrap();
    let (url, _) = mock_llm(StatusCode::OK, json!({ "id": "x", "choices": [] })).await;
    assert!(generator_for(&tmp, &url).generate("resilient").await.is_none());
}

#[tokio::test]
async fn timeout_is_none() {
    let tmp = TempDir::new().unwrap();
    let url = slow_llm(Duration::from_secs(5)).await;
    assert!(generator_for(&tmp, &url).generate("resilient").await.is_none());
}

#[tokio::test]
async fn image_api_returns_url_on_created() {
    let (url, seen) = mock_image_api(StatusCode::CREATED, json!({ "image_url": "https://img.example/a.png" })).await;
    let client = ImageApiClient::new(url, 2).unwrap();
    let post = VocabOutput { word: "apple".into(), word_arabic: "تفاحة".into(), ..Default::default() };

    assert_eq!(client.create_image(&post).await.as_deref(), Some("https://img.example/a.png"));
    let body = &seen.lock().unwrap()[0];
    assert_eq!(body["word_arabic"], "تفاحة");
    assert_eq!(body["icon"], "");
}

#[tokio::test]
async fn image_api_failures_are_none() {
    let post = VocabOutput::default();

    let (url, _) = mock_image_api(StatusCode::OK, json!({ "status": "queued" })).await;
    assert!(ImageApiClient::new(url, 2).unwrap().create_image(&post).await.is_none());

    let (url, _) = mock_image_api(StatusCode::UNPROCESSABLE_ENTITY, json!({ "message": "bad" })).await;
    assert!(ImageApiClient::new(url, 2).unwrap().create_image(&post).await.is_none());

    let url = mock_raw("/api/posts/image", StatusCode::OK, "<html>maintenance</html>").await;
    assert!(ImageApiClient::new(url, 2).unwrap().create_image(&post).await.is_none());
}

#[cfg(unix)]
#[tokio::test]
async fn publisher_local_mode_renders_file() {
    let tmp = TempDir::new().unwrap();
    let (llm_url, _) = mock_llm(StatusCode::OK, chat_completion(RESILIENT_JSON)).await;

    let mut cfg = config_with_llm(tmp.path(), &llm_url);
    cfg.image.mode = ImageMode::Local;
    cfg.image.templates_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("templates");
    cfg.image.browser_path = Some(common::fake_browser(tmp.path(), common::SCREENSHOT_SCRIPT));
    cfg.image.screenshot_timeout_seconds = 5;
    let llm = providers::build(&cfg.llm, cfg.llm_api_key.clone()).unwrap();
    let publisher = Publisher::from_config(&cfg, llm).unwrap();

    let published = publisher.publish("resilient", false).await.unwrap();
    let path = match published.image {
        Some(ImageLocation::File(path)) => path,
        other => panic!("expected a local file, got {other:?}"),
    };
    assert!(path.starts_with(std::fs::canonicalize(&cfg.image.output_dir).unwrap()));
    assert!(path.file_name().unwrap().to_string_lossy().starts_with("vocab_resilient_"));
    assert_eq!(std::fs::read(&path).unwrap(), b"PNG");
}

#[tokio::test]
async fn publisher_remote_mode_produces_url() {
    let tmp = TempDir::new().unwrap();
    let (llm_url, _) = mock_llm(StatusCode::OK, chat_completion(RESILIENT_JSON)).await;
    let (image_url, _) = mock_image_api(StatusCode::OK, json!({ "image_url": "https://img.example/r.png" })).await;

    let mut cfg = config_with_llm(tmp.path(), &llm_url);
    cfg.image.api_url = image_url;
    let llm = providers::build(&cfg.llm, cfg.llm_api_key.clone()).unwrap();
    let publisher = Publisher::from_config(&cfg, llm).unwrap();

    let published = publisher.publish("resilient", true).await.unwrap();
    assert_eq!(published.post.word, "Resilient");
    assert_eq!(published.image, Some(ImageLocation::Url("https://img.example/r.png".into())));
    // No Telegram credentials in the test config.
    assert!(!published.posted);
}

#[tokio::test]
async fn vocab_agent_generates_caches_and_replies() {
    let tmp = TempDir::new().unwrap();
    let (llm_url, llm_seen) = mock_llm(StatusCode::OK, chat_completion(RESILIENT_JSON)).await;
    let (image_url, image_seen) =
        mock_image_api(StatusCode::CREATED, json!({ "image_url": "https://img.example/r.png" })).await;

    let mut cfg = config_with_llm(tmp.path(), &llm_url);
    cfg.image.api_url = image_url;
    let llm = providers::build(&cfg.llm, cfg.llm_api_key.clone()).unwrap();
    let agent = VocabAgent::new(Publisher::from_config(&cfg, llm).unwrap(), false, false, false);

    let local = LocalRelay::new();
    let requester = Identity::from_seed("word requester").unwrap();
    let mut replies = local.register(requester.address());
    let ctx = AgentContext {
        name: "vocab".into(),
        identity: Arc::new(Identity::from_seed(&cfg.agents.vocab.agent.seed).unwrap()),
        storage: Arc::new(KvStore::open(tmp.path(), "vocab").unwrap()),
        relay: Relay::Local(local),
        endpoint: None,
    };

    for word in ["Resilient", "  resilient "] {
        let env = Envelope::new(&requester, ctx.address(), &WordRequest { word: word.into() }, None).unwrap();
        assert!(agent.on_envelope(&ctx, &env).await.unwrap());
    }

    let first = replies.recv().await.unwrap().decode::<VocabResponse>().unwrap();
    assert_eq!(first.word, "resilient");
    assert_eq!(first.image_url.as_deref(), Some("https://img.example/r.png"));
    assert_eq!(first.data.unwrap().word_arabic, "مرن");

    let second = replies.recv().await.unwrap().decode::<VocabResponse>().unwrap();
    assert_eq!(second.image_url.as_deref(), Some("https://img.example/r.png"));
    assert!(second.data.is_none());

    assert_eq!(llm_seen.lock().unwrap().len(), 1);
    assert_eq!(image_seen.lock().unwrap().len(), 1);

    let reopened = KvStore::open(tmp.path(), "vocab").unwrap();
    assert_eq!(reopened.get_as::<String>("resilient").as_deref(), Some("https://img.example/r.png"));
}
