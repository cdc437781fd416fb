//! Client agent: answers agreement drafts and logs payment notifications.

use tracing::{error, info};

use super::AgentContext;
use crate::error::AppError;
use crate::models::{AgreementDraft, Approval, PaymentNotification};
use crate::relay::{Envelope, RelayError};

#[derive(Debug)]
pub struct ClientAgent {
    creator_address: String,
    auto_approve: bool,
}

impl ClientAgent {
    pub fn new(creator_address: String, auto_approve: bool) -> Self {
        Self { creator_address, auto_approve }
    }

    pub fn on_startup(&self, _ctx: &AgentContext) -> Result<(), AppError> {
        info!(creator = %self.creator_address, auto_approve = self.auto_approve, "client ready");
        Ok(())
    }

    pub async fn on_envelope(&self, ctx: &AgentContext, envelope: &Envelope) -> Result<bool, RelayError> {
        if envelope.is::<AgreementDraft>() {
            let msg = envelope.decode::<AgreementDraft>()?;
            self.handle_draft(ctx, &envelope.sender, msg).await;
            Ok(true)
        } else if envelope.is::<PaymentNotification>() {
            let msg = envelope.decode::<PaymentNotification>()?;
            handle_payment_notification(&envelope.sender, &msg);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn handle_draft(&self, ctx: &AgentContext, sender: &str, msg: AgreementDraft) {
        info!(commission_id = %msg.commission_id, %sender, "agreement draft received");
        info!(commission_id = %msg.commission_id, draft = %msg.draft_text, "draft text");

        if self.auto_approve {
            info!(commission_id = %msg.commission_id, "automatically approving commission");
        } else {
            info!(commission_id = %msg.commission_id, "auto-approve disabled; declining commission");
        }
        let approval = Approval { commission_id: msg.commission_id.clone(), approved: self.auto_approve };
        if let Err(e) = ctx.send(&self.creator_address, &approval).await {
            error!(commission_id = %msg.commission_id, error = %e, "failed to send approval");
        }
    }
}

fn handle_payment_notification(sender: &str, msg: &PaymentNotification) {
    info!(
        %sender,
        amount = msg.amount,
        denomination = %msg.denomination,
        status = %msg.status,
        payer = %msg.sender_address,
        notes = msg.notes.as_deref().unwrap_or("-"),
        "payment notification received"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;
    use crate::relay::{LocalRelay, Relay};
    use crate::storage::KvStore;
    use std::sync::Arc;

    fn ctx(local: &LocalRelay) -> AgentContext {
        AgentContext {
            name: "client".into(),
            identity: Arc::new(Identity::from_seed("client test").unwrap()),
            storage: Arc::new(KvStore::in_memory()),
            relay: Relay::Local(local.clone()),
            endpoint: None,
        }
    }

    async fn approval_for(auto_approve: bool) -> Approval {
        let local = LocalRelay::new();
        let creator = Identity::from_seed("creator test").unwrap();
        let mut inbox = local.register(creator.address());
        let client = ClientAgent::new(creator.address().to_string(), auto_approve);
        let ctx = ctx(&local);

        let draft = Envelope::new(
            &creator,
            ctx.address(),
            &AgreementDraft { commission_id: "c-9".into(), draft_text: "We agree.".into() },
            None,
        )
        .unwrap();
        assert!(client.on_envelope(&ctx, &draft).await.unwrap());
        inbox.recv().await.unwrap().decode::<Approval>().unwrap()
    }

    #[tokio::test]
    async fn draft_is_approved_by_default() {
        let approval = approval_for(true).await;
        assert_eq!(approval, Approval { commission_id: "c-9".into(), approved: true });
    }

    #[tokio::test]
    async fn draft_is_declined_without_auto_approve() {
        assert!(!approval_for(false).await.approved);
    }

    #[tokio::test]
    async fn payment_notification_is_handled() {
        let local = LocalRelay::new();
        let ctx = ctx(&local);
        let payer = Identity::from_seed("payment agent").unwrap();
        let env = Envelope::new(
            &payer,
            ctx.address(),
            &PaymentNotification {
                amount: 500.0,
                denomination: "USD".into(),
                status: "settled".into(),
                sender_address: "agent1qcreator".into(),
                notes: None,
            },
            None,
        )
        .unwrap();
        assert!(ClientAgent::new("agent1qx".into(), true).on_envelope(&ctx, &env).await.unwrap());
    }

    #[tokio::test]
    async fn other_schemas_are_not_handled() {
        let local = LocalRelay::new();
        let ctx = ctx(&local);
        let env = Envelope::new(&ctx.identity, ctx.address(), &crate::models::WordRequest { word: "x".into() }, None).unwrap();
        assert!(!ClientAgent::new("agent1qx".into(), true).on_envelope(&ctx, &env).await.unwrap());
    }
}
