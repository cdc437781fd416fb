//! Creator agent: drafts an agreement for each commission request with the
//! LLM, and asks the payment agent to pay once the client approves.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::AgentContext;
use crate::config::CreatorConfig;
use crate::error::AppError;
use crate::llm::{CompletionRequest, LlmProvider};
use crate::models::{AgreementDraft, Approval, CommissionRequest, PaymentRequest};
use crate::prompt::PromptBuilder;
use crate::relay::{Envelope, RelayError};

pub const COMMISSIONS_KEY: &str = "commissions";

/// Draft text sent when the LLM call fails.
pub const DRAFT_ERROR_TEXT: &str = "Error generating draft.";

const DRAFT_PROMPT_FILE: &str = "commission_draft.txt";

const DEFAULT_DRAFT_PROMPT: &str = "\
You are an AI assistant helping a creator. Based on the following commission request, \
draft a very simple 2-sentence agreement summary. Include client name, task description, \
budget (${{budget}}), and deadline ({{deadline}}).

Client: {{client_name}}
Task: {{task_description}}
Budget: ${{budget}}
Deadline: {{deadline}}";

/// What the creator remembers per commission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionRecord {
    pub budget: f64,
    pub draft: String,
}

pub type Commissions = BTreeMap<String, CommissionRecord>;

#[derive(Debug)]
pub struct CreatorAgent {
    client_address: String,
    payment_address: String,
    denomination: String,
    max_tokens: u32,
    llm: LlmProvider,
    prompts_dir: PathBuf,
    llm_key_missing: bool,
}

impl CreatorAgent {
    pub fn new(
        config: &CreatorConfig,
        client_address: String,
        llm: LlmProvider,
        prompts_dir: PathBuf,
        llm_key_missing: bool,
    ) -> Self {
        Self {
            client_address,
            payment_address: config.payment_address.clone(),
            denomination: config.denomination.clone(),
            max_tokens: config.max_tokens,
            llm,
            prompts_dir,
            llm_key_missing,
        }
    }

    pub fn on_startup(&self, ctx: &AgentContext) -> Result<(), AppError> {
        if !ctx.storage.contains(COMMISSIONS_KEY) {
            ctx.storage.set_as(COMMISSIONS_KEY, &Commissions::new())?;
        }
        if self.llm_key_missing {
            warn!("LLM_API_KEY not set; agreement drafts will fall back to the error text");
        }
        if !crate::identity::is_valid_address(&self.client_address) {
            warn!(client = %self.client_address, "client address is not a valid agent address");
        }
        info!(client = %self.client_address, payment_agent = %self.payment_address, "creator ready");
        Ok(())
    }

    pub async fn on_envelope(&self, ctx: &AgentContext, envelope: &Envelope) -> Result<bool, RelayError> {
        if envelope.is::<CommissionRequest>() {
            let msg = envelope.decode::<CommissionRequest>()?;
            self.handle_commission_request(ctx, &envelope.sender, msg).await;
            Ok(true)
        } else if envelope.is::<Approval>() {
            let msg = envelope.decode::<Approval>()?;
            self.handle_approval(ctx, msg).await;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn draft_prompt(&self, msg: &CommissionRequest) -> String {
        PromptBuilder::new(&self.prompts_dir)
            .layer_or(DRAFT_PROMPT_FILE, DEFAULT_DRAFT_PROMPT)
            .var("client_name", msg.client_name.as_str())
            .var("task_description", msg.task_description.as_str())
            .var("budget", format_amount(msg.budget))
            .var("deadline", msg.deadline.as_str())
            .build()
    }

    /// Trimmed model reply, or [`DRAFT_ERROR_TEXT`] on any failure.
    pub async fn draft_agreement(&self, msg: &CommissionRequest) -> String {
        let request = CompletionRequest::user(self.draft_prompt(msg)).with_max_tokens(self.max_tokens);
        match self.llm.complete(&request).await {
            Ok(response) if !response.text.trim().is_empty() => {
                info!(
                    provider = self.llm.name(),
                    input_tokens = ?response.usage.map(|u| u.input_tokens),
                    output_tokens = ?response.usage.map(|u| u.output_tokens),
                    "agreement draft generated"
                );
                response.text.trim().to_string()
            }
            Ok(_) => {
                error!("LLM returned an empty draft");
                DRAFT_ERROR_TEXT.to_string()
            }
            Err(e) => {
                error!(error = %e, "agreement draft LLM call failed");
                DRAFT_ERROR_TEXT.to_string()
            }
        }
    }

    async fn handle_commission_request(&self, ctx: &AgentContext, sender: &str, msg: CommissionRequest) {
        info!(%sender, client = %msg.client_name, task = %msg.task_description, "commission request received");
        let commission_id = Uuid::new_v4().to_string();
        let draft_text = self.draft_agreement(&msg).await;

        let mut commissions: Commissions = ctx.storage.get_as(COMMISSIONS_KEY).unwrap_or_default();
        commissions.insert(
            commission_id.clone(),
            CommissionRecord { budget: msg.budget, draft: draft_text.clone() },
        );
        if let Err(e) = ctx.storage.set_as(COMMISSIONS_KEY, &commissions) {
            error!(%commission_id, error = %e, "failed to persist commission");
        }

        info!(%commission_id, client = %self.client_address, "sending agreement draft");
        let draft = AgreementDraft { commission_id: commission_id.clone(), draft_text };
        if let Err(e) = ctx.send(&self.client_address, &draft).await {
            error!(%commission_id, error = %e, "failed to send agreement draft");
        }
    }

    async fn handle_approval(&self, ctx: &AgentContext, msg: Approval) {
        info!(commission_id = %msg.commission_id, approved = msg.approved, "approval received");
        if !msg.approved {
            info!(commission_id = %msg.commission_id, "commission was not approved");
            return;
        }

        let commissions: Commissions = ctx.storage.get_as(COMMISSIONS_KEY).unwrap_or_default();
        let budget = commissions
            .get(&msg.commission_id)
            .map(|c| c.budget)
            .filter(|b| *b > 0.0);
        let Some(budget) = budget else {
            warn!(commission_id = %msg.commission_id, "no budget found for approved commission; cannot request payment");
            return;
        };

        let payment = PaymentRequest {
            recipient_address: self.client_address.clone(),
            amount: budget,
            denomination: self.denomination.clone(),
            notes: format!("Payment for approved commission {}", msg.commission_id),
        };
        info!(commission_id = %msg.commission_id, amount = budget, denomination = %self.denomination, "requesting payment");
        match ctx.send(&self.payment_address, &payment).await {
            Ok(()) => info!(commission_id = %msg.commission_id, "payment request sent"),
            Err(e) => error!(commission_id = %msg.commission_id, error = %e, "failed to send payment request"),
        }
    }
}

/// `500` for whole amounts, `499.5` otherwise.
fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 && amount.abs() < 1e15 {
        format!("{amount:.0}")
    } else {
        amount.to_string()
    }
}
