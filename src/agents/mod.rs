//! Agents: typed message handlers bound to an address.
//!
//! Each agent is an [`Agent`] variant driven by an [`AgentRunner`], which
//! verifies every inbound [`Envelope`] and hands it to the agent one at a
//! time. Agent state lives in its [`KvStore`]; handlers themselves hold only
//! configuration.

pub mod client;
pub mod creator;
pub mod trigger;
pub mod vocab;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{AgentEndpointConfig, Config, is_placeholder_seed};
use crate::error::AppError;
use crate::identity::Identity;
use crate::llm::LlmProvider;
use crate::models::Model;
use crate::publishing::Publisher;
use crate::relay::{Envelope, InboundEndpoint, Relay, RelayError};
use crate::runtime::{Component, ComponentFuture};
use crate::storage::KvStore;

pub use client::ClientAgent;
pub use creator::CreatorAgent;
pub use vocab::VocabAgent;

const INBOX_CAPACITY: usize = 64;

/// Which long-running agent to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum AgentKind {
    Creator,
    Client,
    Vocab,
}

impl AgentKind {
    pub fn name(self) -> &'static str {
        match self {
            AgentKind::Creator => "creator",
            AgentKind::Client => "client",
            AgentKind::Vocab => "vocab",
        }
    }

    pub fn endpoint_config(self, config: &Config) -> &AgentEndpointConfig {
        match self {
            AgentKind::Creator => &config.agents.creator.agent,
            AgentKind::Client => &config.agents.client.agent,
            AgentKind::Vocab => &config.agents.vocab.agent,
        }
    }
}

// ── Context ──────────────────────────────────────────────────────────────────

/// Everything a handler needs to act as its agent.
#[derive(Debug, Clone)]
pub struct AgentContext {
    pub name: String,
    pub identity: Arc<Identity>,
    pub storage: Arc<KvStore>,
    pub relay: Relay,
    /// Advertised in outgoing envelopes so peers can reply.
    pub endpoint: Option<String>,
}

impl AgentContext {
    pub fn address(&self) -> &str {
        self.identity.address()
    }

    /// Sign `msg` and deliver it to `target`.
    pub async fn send<M: Model>(&self, target: &str, msg: &M) -> Result<(), RelayError> {
        let envelope = Envelope::new(&self.identity, target, msg, self.endpoint.clone())?;
        self.relay.deliver(envelope).await
    }
}

// ── Agent ────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum Agent {
    Creator(CreatorAgent),
    Client(ClientAgent),
    Vocab(VocabAgent),
}

impl Agent {
    pub async fn on_startup(&self, ctx: &AgentContext) -> Result<(), AppError> {
        info!(agent = %ctx.name, address = %ctx.address(), "agent started");
        match self {
            Agent::Creator(a) => a.on_startup(ctx),
            Agent::Client(a) => a.on_startup(ctx),
            Agent::Vocab(a) => a.on_startup(ctx),
        }
    }

    /// Handle one verified envelope. Unknown schemas are logged and dropped.
    pub async fn on_envelope(&self, ctx: &AgentContext, envelope: Envelope) {
        let handled = match self {
            Agent::Creator(a) => a.on_envelope(ctx, &envelope).await,
            Agent::Client(a) => a.on_envelope(ctx, &envelope).await,
            Agent::Vocab(a) => a.on_envelope(ctx, &envelope).await,
        };
        match handled {
            Ok(true) => {}
            Ok(false) => warn!(agent = %ctx.name, schema = %envelope.schema, sender = %envelope.sender, "no handler for message"),
            Err(e) => warn!(agent = %ctx.name, schema = %envelope.schema, error = %e, "dropping undecodable message"),
        }
    }
}

// ── Runner ───────────────────────────────────────────────────────────────────

/// Drives one agent: startup hook, then inbox envelopes in arrival order.
pub struct AgentRunner {
    agent: Agent,
    ctx: AgentContext,
    inbox: mpsc::Receiver<Envelope>,
}

impl AgentRunner {
    pub fn new(agent: Agent, ctx: AgentContext, inbox: mpsc::Receiver<Envelope>) -> Self {
        Self { agent, ctx, inbox }
    }
}

impl Component for AgentRunner {
    fn id(&self) -> &str {
        &self.ctx.name
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
        Box::pin(async move {
            let AgentRunner { agent, ctx, mut inbox } = *self;
            agent.on_startup(&ctx).await?;

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => {
                        info!(agent = %ctx.name, "agent shutting down");
                        break;
                    }
                    next = inbox.recv() => {
                        let Some(envelope) = next else {
                            debug!(agent = %ctx.name, "inbox closed");
                            break;
                        };
                        if envelope.target != ctx.address() {
                            warn!(agent = %ctx.name, target = %envelope.target, "dropping envelope for another address");
                            continue;
                        }
                        if let Err(e) = envelope.verify() {
                            warn!(agent = %ctx.name, sender = %envelope.sender, error = %e, "dropping unverified envelope");
                            continue;
                        }
                        debug!(agent = %ctx.name, sender = %envelope.sender, schema = %envelope.schema, "envelope received");
                        agent.on_envelope(&ctx, envelope).await;
                    }
                }
            }
            Ok(())
        })
    }
}

// ── Assembly ─────────────────────────────────────────────────────────────────

/// `configured` if set, else the address derived from the peer's seed.
pub fn resolve_peer_address(configured: &str, peer_seed: &str) -> Result<String, AppError> {
    if !configured.trim().is_empty() {
        return Ok(configured.trim().to_string());
    }
    if is_placeholder_seed(peer_seed) {
        warn!("peer address derived from a placeholder seed; set the peer's seed or address in config");
    }
    Ok(Identity::from_seed(peer_seed)?.address().to_string())
}

/// Build the agent of `kind` from config.
pub fn build_agent(kind: AgentKind, config: &Config, llm: &LlmProvider) -> Result<Agent, AppError> {
    let agents = &config.agents;
    Ok(match kind {
        AgentKind::Creator => Agent::Creator(CreatorAgent::new(
            &agents.creator,
            resolve_peer_address(&agents.creator.client_address, &agents.client.agent.seed)?,
            llm.clone(),
            config.prompts_dir.clone(),
            llm_key_missing(config),
        )),
        AgentKind::Client => Agent::Client(ClientAgent::new(
            resolve_peer_address(&agents.client.creator_address, &agents.creator.agent.seed)?,
            agents.client.auto_approve,
        )),
        AgentKind::Vocab => Agent::Vocab(VocabAgent::new(
            Publisher::from_config(config, llm.clone())?,
            agents.vocab.publish_to_telegram,
            config.telegram_ready(),
            llm_key_missing(config),
        )),
    })
}

fn llm_key_missing(config: &Config) -> bool {
    config.llm.provider != "dummy" && config.llm_api_key.is_none()
}

/// Components that run agent `kind` on `relay`: the runner, plus the
/// inbound HTTP endpoint when the relay is HTTP.
pub fn assemble(
    kind: AgentKind,
    config: &Config,
    llm: &LlmProvider,
    relay: &Relay,
) -> Result<Vec<Box<dyn Component>>, AppError> {
    let endpoint_cfg = kind.endpoint_config(config);
    let identity = Arc::new(Identity::from_seed(&endpoint_cfg.seed)?);
    if is_placeholder_seed(&endpoint_cfg.seed) {
        warn!(agent = kind.name(), "using the placeholder seed; set ATELIER_{}_SEED", kind.name().to_uppercase());
    }
    let storage = Arc::new(KvStore::open(&config.work_dir, kind.name())?);
    let agent = build_agent(kind, config, llm)?;

    let mut components: Vec<Box<dyn Component>> = Vec::new();
    let (inbox, endpoint) = match relay {
        Relay::Http(_) => {
            let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
            components.push(Box::new(InboundEndpoint::new(
                format!("{}-endpoint", kind.name()),
                format!("{}:{}", endpoint_cfg.host, endpoint_cfg.port),
                identity.address(),
                tx,
                relay.clone(),
            )));
            (rx, Some(endpoint_cfg.endpoint.clone()))
        }
        Relay::Local(local) => (local.register(identity.address()), None),
    };

    let ctx = AgentContext {
        name: kind.name().to_string(),
        identity,
        storage,
        relay: relay.clone(),
        endpoint,
    };
    components.push(Box::new(AgentRunner::new(agent, ctx, inbox)));
    Ok(components)
}
