//! Shared helpers for integration tests: throwaway axum servers standing in
//! for the LLM, the image API and the Telegram Bot API.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use atelier::config::Config;
use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, Uri, header},
    routing::post,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

/// Request bodies seen by a mock endpoint.
pub type Seen = Arc<Mutex<Vec<Value>>>;

/// Serve `router` on an ephemeral port; returns `http://127.0.0.1:<port>`.
pub async fn spawn(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn chat_completion(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }],
        "usage": { "prompt_tokens": 12, "completion_tokens": 34 }
    })
}

/// `POST /v1/chat/completions` answering `status` + `body`, recording requests.
pub async fn mock_llm(status: StatusCode, body: Value) -> (String, Seen) {
    let seen: Seen = Arc::default();
    let router = Router::new()
        .route(
            "/v1/chat/completions",
            post(|State((seen, status, body)): State<(Seen, StatusCode, Value)>, Json(req): Json<Value>| async move {
                seen.lock().unwrap().push(req);
                (status, Json(body))
            }),
        )
        .with_state((seen.clone(), status, body));
    let base = spawn(router).await;
    (format!("{base}/v1/chat/completions"), seen)
}

/// LLM endpoint that never answers within a test timeout.
pub async fn slow_llm(delay: Duration) -> String {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(move || async move {
            tokio::time::sleep(delay).await;
            Json(chat_completion("too late"))
        }),
    );
    format!("{}/v1/chat/completions", spawn(router).await)
}

/// `POST /api/posts/image` answering `status` + `body`, recording requests.
pub async fn mock_image_api(status: StatusCode, body: Value) -> (String, Seen) {
    let seen: Seen = Arc::default();
    let router = Router::new()
        .route(
            "/api/posts/image",
            post(|State((seen, status, body)): State<(Seen, StatusCode, Value)>, Json(req): Json<Value>| async move {
                seen.lock().unwrap().push(req);
                (status, Json(body))
            }),
        )
        .with_state((seen.clone(), status, body));
    (format!("{}/api/posts/image", spawn(router).await), seen)
}

/// `POST path` answering `status` with a raw (non-JSON) `body`.
pub async fn mock_raw(path: &str, status: StatusCode, body: &'static str) -> String {
    let router = Router::new().route(path, post(move || async move { (status, [(header::CONTENT_TYPE, "text/html")], body) }));
    format!("{}{path}", spawn(router).await)
}

/// Bot API stand-in answering every method with `body`; records request paths.
/// Returns the base URL (with trailing slash) for `[telegram].api_url`.
pub async fn mock_bot_api(body: Value) -> (String, Arc<Mutex<Vec<String>>>) {
    let paths: Arc<Mutex<Vec<String>>> = Arc::default();
    let router = Router::new()
        .fallback(|State((paths, body)): State<(Arc<Mutex<Vec<String>>>, Value)>, uri: Uri| async move {
            paths.lock().unwrap().push(uri.path().to_string());
            Json(body)
        })
        .with_state((paths.clone(), body));
    (format!("{}/", spawn(router).await), paths)
}

/// A successful `sendPhoto` reply.
pub fn sent_photo_message() -> Value {
    json!({
        "ok": true,
        "result": {
            "message_id": 7,
            "date": 1_700_000_000,
            "chat": { "id": -100123, "type": "channel", "title": "Vocab" },
            "photo": [{ "file_id": "f1", "file_unique_id": "u1", "width": 540, "height": 540 }],
            "caption": "<b>Resilient</b>"
        }
    })
}

/// Executable shell script standing in for a headless browser.
#[cfg(unix)]
pub fn fake_browser(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-chrome");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Browser script that writes a placeholder PNG to the `--screenshot=` path.
pub const SCREENSHOT_SCRIPT: &str = r#"for arg in "$@"; do
  case "$arg" in
    --screenshot=*) printf 'PNG' > "${arg#--screenshot=}" ;;
  esac
done"#;

/// A full, well-formed vocabulary entry as the model would return it.
pub const RESILIENT_JSON: &str = r#"```json
{
  "word": "Resilient",
  "translation": "مرن",
  "phonetics": "/rɪˈzɪliənt/",
  "meaning": "Able to recover quickly from difficulties.",
  "synonyms": "tough, hardy",
  "antonyms": "fragile",
  "example_sentence": "Children are often very resilient.",
  "example_translation": "الأطفال غالبًا ما يكونون مرنين جدًا.",
  "reference_url": "https://dictionary.example/resilient",
  "discussion_question": "When did you last have to be resilient?"
}
```"#;

/// Test config pointing the OpenAI-compatible provider at `llm_url`.
pub fn config_with_llm(work_dir: &Path, llm_url: &str) -> Config {
    let mut cfg = Config::test_default(work_dir);
    cfg.llm.provider = "openai".into();
    cfg.llm.openai.api_base_url = llm_url.into();
    cfg.llm.openai.timeout_seconds = 2;
    cfg.llm_api_key = Some("sk-test".into());
    cfg
}
