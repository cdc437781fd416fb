//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` (or `$ATELIER_CONFIG`) relative to the current
//! working directory, then applies `ATELIER_WORK_DIR`, `ATELIER_LOG_LEVEL`
//! and `PORT` overrides. Secrets (API keys, bot tokens, seeds) are read from
//! the environment and never need to live in the TOML.

use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;

/// OpenAI-compatible provider configuration (`[llm.openai]`).
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Full chat completions endpoint URL.
    pub api_base_url: String,
    /// Model name passed in the request body.
    pub model: String,
    pub temperature: f32,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

/// LLM configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Which provider is active (`"dummy"` or `"openai"`).
    pub provider: String,
    pub openai: OpenAiConfig,
}

/// Relay transport settings.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub timeout_seconds: u64,
    /// Static address book: agent address -> `/submit` endpoint URL.
    pub endpoints: HashMap<String, String>,
}

/// Settings shared by every long-running agent.
#[derive(Debug, Clone)]
pub struct AgentEndpointConfig {
    pub seed: String,
    pub host: String,
    pub port: u16,
    /// Public endpoint advertised to peers. Defaults to `http://{host}:{port}/submit`.
    pub endpoint: String,
}

#[derive(Debug, Clone)]
pub struct CreatorConfig {
    pub agent: AgentEndpointConfig,
    /// Empty means "derive from the client agent's seed".
    pub client_address: String,
    pub payment_address: String,
    pub denomination: String,
    pub max_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub agent: AgentEndpointConfig,
    /// Empty means "derive from the creator agent's seed".
    pub creator_address: String,
    pub auto_approve: bool,
}

#[derive(Debug, Clone)]
pub struct VocabAgentConfig {
    pub agent: AgentEndpointConfig,
    pub publish_to_telegram: bool,
}

/// One-shot trigger: who to send the sample commission to, and its content.
#[derive(Debug, Clone)]
pub struct TriggerConfig {
    pub seed: String,
    pub creator_address: String,
    pub client_name: String,
    pub task_description: String,
    pub budget: f64,
    pub deadline: String,
}

#[derive(Debug, Clone)]
pub struct AgentsConfig {
    pub creator: CreatorConfig,
    pub client: ClientConfig,
    pub vocab: VocabAgentConfig,
}

/// How the vocabulary agent turns a record into an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMode {
    /// POST the record to the external image API.
    Remote,
    /// Render the HTML template and screenshot it with a headless browser.
    Local,
}

#[derive(Debug, Clone)]
pub struct ImageConfig {
    pub mode: ImageMode,
    pub api_url: String,
    pub timeout_seconds: u64,
    pub templates_dir: PathBuf,
    pub template: String,
    pub background: PathBuf,
    pub output_dir: PathBuf,
    pub width: u32,
    pub height: u32,
    pub browser_path: Option<PathBuf>,
    pub screenshot_timeout_seconds: u64,
}

/// Telegram `parse_mode` for captions. Legacy `Markdown` is not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionParseMode {
    Html,
    MarkdownV2,
}

impl CaptionParseMode {
    fn parse(value: &str) -> Result<Self, AppError> {
        match value.to_ascii_lowercase().as_str() {
            "html" => Ok(CaptionParseMode::Html),
            "markdownv2" => Ok(CaptionParseMode::MarkdownV2),
            _ => Err(AppError::Config(format!(
                "unsupported [telegram].parse_mode '{value}' (expected \"HTML\" or \"MarkdownV2\")"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// From `TELEGRAM_BOT_TOKEN` only.
    pub bot_token: Option<String>,
    /// `TELEGRAM_CHAT_ID` overrides the TOML value.
    pub chat_id: Option<String>,
    pub parse_mode: CaptionParseMode,
    pub timeout_seconds: u64,
    /// Alternative Bot API server, mainly for tests and local bot-api servers.
    pub api_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind: String,
}

/// Fully-resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub name: String,
    /// Working directory for persistent agent data (already expanded, no `~`).
    pub work_dir: PathBuf,
    pub log_level: String,
    pub prompts_dir: PathBuf,
    pub llm: LlmConfig,
    /// From `LLM_API_KEY` (or `ASI_API_KEY`). `None` for keyless local models.
    pub llm_api_key: Option<String>,
    pub relay: RelayConfig,
    pub agents: AgentsConfig,
    pub trigger: TriggerConfig,
    pub image: ImageConfig,
    pub telegram: TelegramConfig,
    pub api: ApiConfig,
}

impl Config {
    /// `true` when the Telegram credentials needed for posting are present.
    pub fn telegram_ready(&self) -> bool {
        self.telegram.bot_token.is_some() && self.telegram.chat_id.is_some()
    }
}

// ── Raw TOML shape ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RawConfig {
    app: RawApp,
    #[serde(default)]
    llm: RawLlm,
    #[serde(default)]
    relay: RawRelay,
    #[serde(default)]
    agents: RawAgents,
    #[serde(default)]
    trigger: RawTrigger,
    #[serde(default)]
    image: RawImage,
    #[serde(default)]
    telegram: RawTelegram,
    #[serde(default)]
    api: RawApi,
}

#[derive(Deserialize)]
struct RawApp {
    name: String,
    work_dir: String,
    log_level: String,
    #[serde(default = "default_prompts_dir")]
    prompts_dir: String,
}

#[derive(Deserialize)]
struct RawLlm {
    /// Maps to `default = "..."` in `[llm]`.
    #[serde(rename = "default", default = "default_llm_provider")]
    provider: String,
    #[serde(default)]
    openai: RawOpenAiConfig,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self { provider: default_llm_provider(), openai: RawOpenAiConfig::default() }
    }
}

#[derive(Deserialize)]
struct RawOpenAiConfig {
    #[serde(default = "default_openai_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_openai_model")]
    model: String,
    #[serde(default = "default_openai_temperature")]
    temperature: f32,
    #[serde(default = "default_openai_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawOpenAiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_openai_api_base_url(),
            model: default_openai_model(),
            temperature: default_openai_temperature(),
            timeout_seconds: default_openai_timeout_seconds(),
        }
    }
}

#[derive(Deserialize)]
struct RawRelay {
    #[serde(default = "default_relay_timeout")]
    timeout_seconds: u64,
    #[serde(default)]
    endpoints: HashMap<String, String>,
}

impl Default for RawRelay {
    fn default() -> Self {
        Self { timeout_seconds: default_relay_timeout(), endpoints: HashMap::new() }
    }
}

#[derive(Deserialize, Default)]
struct RawAgents {
    #[serde(default)]
    creator: RawCreator,
    #[serde(default)]
    client: RawClient,
    #[serde(default)]
    vocab: RawVocab,
}

#[derive(Deserialize)]
struct RawAgentEndpoint {
    #[serde(default)]
    seed: Option<String>,
    #[serde(default = "default_host")]
    host: String,
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    endpoint: Option<String>,
}

impl Default for RawAgentEndpoint {
    fn default() -> Self {
        Self { seed: None, host: default_host(), port: None, endpoint: None }
    }
}

#[derive(Deserialize)]
struct RawCreator {
    #[serde(flatten)]
    agent: RawAgentEndpoint,
    #[serde(default)]
    client_address: String,
    #[serde(default = "default_payment_address")]
    payment_address: String,
    #[serde(default = "default_denomination")]
    denomination: String,
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,
}

impl Default for RawCreator {
    fn default() -> Self {
        Self {
            agent: RawAgentEndpoint::default(),
            client_address: String::new(),
            payment_address: default_payment_address(),
            denomination: default_denomination(),
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Deserialize)]
struct RawClient {
    #[serde(flatten)]
    agent: RawAgentEndpoint,
    #[serde(default)]
    creator_address: String,
    #[serde(default = "default_true")]
    auto_approve: bool,
}

impl Default for RawClient {
    fn default() -> Self {
        Self {
            agent: RawAgentEndpoint::default(),
            creator_address: String::new(),
            auto_approve: true,
        }
    }
}

#[derive(Deserialize, Default)]
struct RawVocab {
    #[serde(flatten)]
    agent: RawAgentEndpoint,
    #[serde(default)]
    publish_to_telegram: bool,
}

#[derive(Deserialize)]
struct RawTrigger {
    #[serde(default)]
    seed: Option<String>,
    #[serde(default)]
    creator_address: String,
    #[serde(default = "default_trigger_client")]
    client_name: String,
    #[serde(default = "default_trigger_task")]
    task_description: String,
    #[serde(default = "default_trigger_budget")]
    budget: f64,
    #[serde(default = "default_trigger_deadline")]
    deadline: String,
}

impl Default for RawTrigger {
    fn default() -> Self {
        Self {
            seed: None,
            creator_address: String::new(),
            client_name: default_trigger_client(),
            task_description: default_trigger_task(),
            budget: default_trigger_budget(),
            deadline: default_trigger_deadline(),
        }
    }
}

#[derive(Deserialize)]
struct RawImage {
    #[serde(default = "default_image_mode")]
    mode: String,
    #[serde(default = "default_image_api_url")]
    api_url: String,
    #[serde(default = "default_image_timeout")]
    timeout_seconds: u64,
    #[serde(default = "default_templates_dir")]
    templates_dir: String,
    #[serde(default = "default_template")]
    template: String,
    #[serde(default = "default_background")]
    background: String,
    #[serde(default = "default_output_dir")]
    output_dir: String,
    #[serde(default = "default_image_size")]
    width: u32,
    #[serde(default = "default_image_size")]
    height: u32,
    #[serde(default)]
    browser_path: Option<String>,
    #[serde(default = "default_image_timeout")]
    screenshot_timeout_seconds: u64,
}

impl Default for RawImage {
    fn default() -> Self {
        Self {
            mode: default_image_mode(),
            api_url: default_image_api_url(),
            timeout_seconds: default_image_timeout(),
            templates_dir: default_templates_dir(),
            template: default_template(),
            background: default_background(),
            output_dir: default_output_dir(),
            width: default_image_size(),
            height: default_image_size(),
            browser_path: None,
            screenshot_timeout_seconds: default_image_timeout(),
        }
    }
}

#[derive(Deserialize)]
struct RawTelegram {
    #[serde(default)]
    chat_id: Option<String>,
    #[serde(default = "default_parse_mode")]
    parse_mode: String,
    #[serde(default = "default_telegram_timeout")]
    timeout_seconds: u64,
    #[serde(default)]
    api_url: Option<String>,
}

impl Default for RawTelegram {
    fn default() -> Self {
        Self {
            chat_id: None,
            parse_mode: default_parse_mode(),
            timeout_seconds: default_telegram_timeout(),
            api_url: None,
        }
    }
}

#[derive(Deserialize)]
struct RawApi {
    #[serde(default = "default_api_bind")]
    bind: String,
}

impl Default for RawApi {
    fn default() -> Self {
        Self { bind: default_api_bind() }
    }
}

fn default_prompts_dir() -> String { "config/prompts".to_string() }
fn default_llm_provider() -> String { "openai".to_string() }
fn default_openai_api_base_url() -> String { "https://api.asi1.ai/v1/chat/completions".to_string() }
fn default_openai_model() -> String { "asi1-mini".to_string() }
fn default_openai_temperature() -> f32 { 0.2 }
fn default_openai_timeout_seconds() -> u64 { 30 }
fn default_relay_timeout() -> u64 { 10 }
fn default_host() -> String { "127.0.0.1".to_string() }
fn default_payment_address() -> String {
    "agent1qtdvskm3g5ngmvfuqek6shrpjz6ed8jc84s6phmark05z5a8naxawu5jsrq".to_string()
}
fn default_denomination() -> String { "USD".to_string() }
fn default_max_tokens() -> u32 { 150 }
fn default_trigger_client() -> String { "Walter Dark Inc.".to_string() }
fn default_trigger_task() -> String { "Design a company logo".to_string() }
fn default_trigger_budget() -> f64 { 500.0 }
fn default_trigger_deadline() -> String { "2025-05-10".to_string() }
fn default_image_mode() -> String { "remote".to_string() }
fn default_image_api_url() -> String { "https://tools.waleedalrashed.com/api/posts/image".to_string() }
fn default_image_timeout() -> u64 { 60 }
fn default_templates_dir() -> String { "templates".to_string() }
fn default_template() -> String { "post_template.html".to_string() }
fn default_background() -> String { "assets/images/post_background.png".to_string() }
fn default_output_dir() -> String { "generated_images".to_string() }
fn default_image_size() -> u32 { 540 }
fn default_parse_mode() -> String { "HTML".to_string() }
fn default_telegram_timeout() -> u64 { 45 }
fn default_api_bind() -> String { "0.0.0.0:8080".to_string() }
fn default_true() -> bool { true }

/// Fixed ports per agent when the TOML leaves them out.
const CREATOR_PORT: u16 = 8000;
const CLIENT_PORT: u16 = 8001;
const VOCAB_PORT: u16 = 8002;

/// Seeds used when neither env nor TOML supply one. Startup warns about them.
pub const PLACEHOLDER_CREATOR_SEED: &str = "creator_agent_placeholder_seed";
pub const PLACEHOLDER_CLIENT_SEED: &str = "client_agent_placeholder_seed";
pub const PLACEHOLDER_VOCAB_SEED: &str = "vocab_agent_placeholder_seed";
pub const PLACEHOLDER_TRIGGER_SEED: &str = "trigger_placeholder_seed";

// ── Loading ───────────────────────────────────────────────────────────────────

/// Process environment overrides, collected once so tests can inject them.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    pub work_dir: Option<String>,
    pub log_level: Option<String>,
    pub port: Option<String>,
    pub llm_api_key: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    /// Agent name (`creator`, `client`, `vocab`, `trigger`) -> seed.
    pub seeds: HashMap<String, String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        let seeds = ["creator", "client", "vocab", "trigger"]
            .iter()
            .filter_map(|name| {
                let key = format!("ATELIER_{}_SEED", name.to_uppercase());
                non_empty_env(&key).map(|seed| (name.to_string(), seed))
            })
            .collect();

        Self {
            work_dir: non_empty_env("ATELIER_WORK_DIR"),
            log_level: non_empty_env("ATELIER_LOG_LEVEL"),
            port: non_empty_env("PORT"),
            llm_api_key: non_empty_env("LLM_API_KEY").or_else(|| non_empty_env("ASI_API_KEY")),
            telegram_bot_token: non_empty_env("TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: non_empty_env("TELEGRAM_CHAT_ID"),
            seeds,
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Load config from `$ATELIER_CONFIG` or `config/default.toml`, then apply env overrides.
pub fn load() -> Result<Config, AppError> {
    let path = env::var("ATELIER_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());
    load_from(Path::new(&path), &EnvOverrides::from_env())
}

/// Internal loader: accepts an explicit path and overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(path: &Path, overrides: &EnvOverrides) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let app = parsed.app;
    let work_dir = expand_home(overrides.work_dir.as_deref().unwrap_or(&app.work_dir));
    let log_level = overrides.log_level.clone().unwrap_or(app.log_level);

    let mode = match parsed.image.mode.as_str() {
        "remote" => ImageMode::Remote,
        "local" => ImageMode::Local,
        other => {
            return Err(AppError::Config(format!(
                "unknown [image].mode '{other}' (expected \"remote\" or \"local\")"
            )));
        }
    };

    let api_bind = match overrides.port.as_deref() {
        Some(port) => {
            let port: u16 = port
                .parse()
                .map_err(|_| AppError::Config(format!("PORT is not a valid port: '{port}'")))?;
            with_port(&parsed.api.bind, port)
        }
        None => parsed.api.bind,
    };

    let seed_for = |name: &str, toml_seed: Option<String>, placeholder: &str| -> String {
        overrides
            .seeds
            .get(name)
            .cloned()
            .or(toml_seed)
            .unwrap_or_else(|| placeholder.to_string())
    };

    let creator_agent = resolve_endpoint(
        parsed.agents.creator.agent,
        seed_for("creator", None, PLACEHOLDER_CREATOR_SEED),
        CREATOR_PORT,
    );
    let client_agent = resolve_endpoint(
        parsed.agents.client.agent,
        seed_for("client", None, PLACEHOLDER_CLIENT_SEED),
        CLIENT_PORT,
    );
    let vocab_agent = resolve_endpoint(
        parsed.agents.vocab.agent,
        seed_for("vocab", None, PLACEHOLDER_VOCAB_SEED),
        VOCAB_PORT,
    );

    let trigger = parsed.trigger;

    Ok(Config {
        name: app.name,
        work_dir,
        log_level,
        prompts_dir: PathBuf::from(app.prompts_dir),
        llm: LlmConfig {
            provider: parsed.llm.provider,
            openai: OpenAiConfig {
                api_base_url: parsed.llm.openai.api_base_url,
                model: parsed.llm.openai.model,
                temperature: parsed.llm.openai.temperature,
                timeout_seconds: parsed.llm.openai.timeout_seconds,
            },
        },
        llm_api_key: overrides.llm_api_key.clone(),
        relay: RelayConfig {
            timeout_seconds: parsed.relay.timeout_seconds,
            endpoints: parsed.relay.endpoints,
        },
        agents: AgentsConfig {
            creator: CreatorConfig {
                agent: creator_agent,
                client_address: parsed.agents.creator.client_address,
                payment_address: parsed.agents.creator.payment_address,
                denomination: parsed.agents.creator.denomination,
                max_tokens: parsed.agents.creator.max_tokens,
            },
            client: ClientConfig {
                agent: client_agent,
                creator_address: parsed.agents.client.creator_address,
                auto_approve: parsed.agents.client.auto_approve,
            },
            vocab: VocabAgentConfig {
                agent: vocab_agent,
                publish_to_telegram: parsed.agents.vocab.publish_to_telegram,
            },
        },
        trigger: TriggerConfig {
            seed: seed_for("trigger", trigger.seed, PLACEHOLDER_TRIGGER_SEED),
            creator_address: trigger.creator_address,
            client_name: trigger.client_name,
            task_description: trigger.task_description,
            budget: trigger.budget,
            deadline: trigger.deadline,
        },
        image: ImageConfig {
            mode,
            api_url: parsed.image.api_url,
            timeout_seconds: parsed.image.timeout_seconds,
            templates_dir: PathBuf::from(parsed.image.templates_dir),
            template: parsed.image.template,
            background: PathBuf::from(parsed.image.background),
            output_dir: PathBuf::from(parsed.image.output_dir),
            width: parsed.image.width,
            height: parsed.image.height,
            browser_path: parsed.image.browser_path.map(PathBuf::from),
            screenshot_timeout_seconds: parsed.image.screenshot_timeout_seconds,
        },
        telegram: TelegramConfig {
            bot_token: overrides.telegram_bot_token.clone(),
            chat_id: overrides
                .telegram_chat_id
                .clone()
                .or(parsed.telegram.chat_id)
                .filter(|c| !c.trim().is_empty()),
            parse_mode: CaptionParseMode::parse(&parsed.telegram.parse_mode)?,
            timeout_seconds: parsed.telegram.timeout_seconds,
            api_url: parsed.telegram.api_url,
        },
        api: ApiConfig { bind: api_bind },
    })
}

/// Env seed wins over the TOML seed, which wins over the placeholder.
fn resolve_endpoint(raw: RawAgentEndpoint, env_or_placeholder: String, default_port: u16) -> AgentEndpointConfig {
    let seed = if is_placeholder_seed(&env_or_placeholder) {
        raw.seed.unwrap_or(env_or_placeholder)
    } else {
        env_or_placeholder
    };
    let port = raw.port.unwrap_or(default_port);
    let endpoint = raw
        .endpoint
        .unwrap_or_else(|| format!("http://{}:{}/submit", raw.host, port));
    AgentEndpointConfig { seed, host: raw.host, port, endpoint }
}

/// `true` for the built-in placeholder seeds.
pub fn is_placeholder_seed(seed: &str) -> bool {
    matches!(
        seed,
        PLACEHOLDER_CREATOR_SEED | PLACEHOLDER_CLIENT_SEED | PLACEHOLDER_VOCAB_SEED | PLACEHOLDER_TRIGGER_SEED
    )
}

/// Replace the port of a `host:port` bind string.
fn with_port(bind: &str, port: u16) -> String {
    let host = bind.rsplit_once(':').map(|(h, _)| h).unwrap_or(bind);
    format!("{host}:{port}")
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

// ── test helpers ──────────────────────────────────────────────────────────────

/// Safe `Config` for tests: dummy LLM, no API keys, no external calls.
impl Config {
    #[doc(hidden)]
    pub fn test_default(work_dir: &Path) -> Self {
        let agent = |seed: &str, port: u16| AgentEndpointConfig {
            seed: seed.to_string(),
            host: default_host(),
            port,
            endpoint: format!("http://127.0.0.1:{port}/submit"),
        };
        Self {
            name: "test".into(),
            work_dir: work_dir.to_path_buf(),
            log_level: "info".into(),
            prompts_dir: work_dir.join("prompts"),
            llm: LlmConfig {
                provider: "dummy".into(),
                openai: OpenAiConfig {
                    api_base_url: "http://127.0.0.1:9/v1/chat/completions".into(),
                    model: "test-model".into(),
                    temperature: 0.0,
                    timeout_seconds: 1,
                },
            },
            llm_api_key: None,
            relay: RelayConfig { timeout_seconds: 1, endpoints: HashMap::new() },
            agents: AgentsConfig {
                creator: CreatorConfig {
                    agent: agent("test creator seed", 0),
                    client_address: String::new(),
                    payment_address: default_payment_address(),
                    denomination: default_denomination(),
                    max_tokens: default_max_tokens(),
                },
                client: ClientConfig {
                    agent: agent("test client seed", 0),
                    creator_address: String::new(),
                    auto_approve: true,
                },
                vocab: VocabAgentConfig {
                    agent: agent("test vocab seed", 0),
                    publish_to_telegram: false,
                },
            },
            trigger: TriggerConfig {
                seed: "test trigger seed".into(),
                creator_address: String::new(),
                client_name: default_trigger_client(),
                task_description: default_trigger_task(),
                budget: default_trigger_budget(),
                deadline: default_trigger_deadline(),
            },
            image: ImageConfig {
                mode: ImageMode::Remote,
                api_url: "http://127.0.0.1:9/api/posts/image".into(),
                timeout_seconds: 1,
                templates_dir: work_dir.join("templates"),
                template: default_template(),
                background: work_dir.join("background.png"),
                output_dir: work_dir.join("generated_images"),
                width: default_image_size(),
                height: default_image_size(),
                browser_path: None,
                screenshot_timeout_seconds: 1,
            },
            telegram: TelegramConfig {
                bot_token: None,
                chat_id: None,
                parse_mode: CaptionParseMode::Html,
                timeout_seconds: 1,
                api_url: None,
            },
            api: ApiConfig { bind: "127.0.0.1:0".into() },
        }
    }
}
