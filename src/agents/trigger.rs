//! One-shot trigger: send a single [`CommissionRequest`] to the creator.

use tracing::{error, info};

use super::resolve_peer_address;
use crate::config::Config;
use crate::error::AppError;
use crate::identity::Identity;
use crate::models::CommissionRequest;
use crate::relay::{Envelope, Relay};

/// The commission described by `[trigger]`.
pub fn commission_from_config(config: &Config) -> CommissionRequest {
    CommissionRequest {
        client_name: config.trigger.client_name.clone(),
        task_description: config.trigger.task_description.clone(),
        budget: config.trigger.budget,
        deadline: config.trigger.deadline.clone(),
    }
}

/// Send the configured commission request and return once it is delivered.
pub async fn run(config: &Config, relay: &Relay) -> Result<(), AppError> {
    let identity = Identity::from_seed(&config.trigger.seed)?;
    let creator = resolve_peer_address(&config.trigger.creator_address, &config.agents.creator.agent.seed)?;
    let request = commission_from_config(config);

    info!(sender = %identity.address(), %creator, "sending commission request");
    let envelope = Envelope::new(&identity, &creator, &request, None).map_err(|e| AppError::Relay(e.to_string()))?;
    match relay.deliver(envelope).await {
        Ok(()) => {
            info!("commission request sent");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "failed to send commission request");
            Err(AppError::Relay(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::LocalRelay;

    #[tokio::test]
    async fn sends_configured_commission_to_creator() {
        let tmp = tempfile::TempDir::new().unwrap();
        let cfg = Config::test_default(tmp.path());
        let local = LocalRelay::new();
        let creator = Identity::from_seed(&cfg.agents.creator.agent.seed).unwrap();
        let mut inbox = local.register(creator.address());

        run(&cfg, &Relay::Local(local)).await.unwrap();
        let env = inbox.recv().await.unwrap();
        env.verify().unwrap();
        assert_eq!(env.decode::<CommissionRequest>().unwrap(), commission_from_config(&cfg));
    }

    #[tokio::test]
    async fn unknown_creator_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let cfg = Config::test_default(tmp.path());
        assert!(run(&cfg, &Relay::Local(LocalRelay::new())).await.is_err());
    }
}
