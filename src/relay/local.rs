//! In-process relay: address -> inbox sender.
//!
//! Delivery never waits: a full inbox is a delivery error, like an
//! unreachable peer on the HTTP transport.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

use super::{Envelope, RelayError};

const INBOX_CAPACITY: usize = 64;

#[derive(Debug, Clone, Default)]
pub struct LocalRelay {
    inboxes: Arc<RwLock<HashMap<String, mpsc::Sender<Envelope>>>>,
}

impl LocalRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `address` and return its inbox. Re-registering replaces the
    /// previous inbox.
    pub fn register(&self, address: &str) -> mpsc::Receiver<Envelope> {
        let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
        self.inboxes
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .insert(address.to_string(), tx);
        rx
    }

    pub async fn deliver(&self, envelope: Envelope) -> Result<(), RelayError> {
        let tx = self
            .inboxes
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(&envelope.target)
            .cloned()
            .ok_or_else(|| RelayError::UnknownTarget(envelope.target.clone()))?;

        let target = envelope.target.clone();
        debug!(%target, schema = %envelope.schema, "local delivery");
        tx.try_send(envelope).map_err(|e| {
            let detail = match e {
                TrySendError::Full(_) => "inbox full",
                TrySendError::Closed(_) => "inbox closed",
            };
            RelayError::Delivery { target, detail: detail.into() }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;
    use crate::models::WordRequest;

    #[tokio::test]
    async fn delivers_to_registered_inbox() {
        let relay = LocalRelay::new();
        let sender = Identity::from_seed("local sender").unwrap();
        let target = Identity::from_seed("local target").unwrap();
        let mut inbox = relay.register(target.address());

        let env = Envelope::new(&sender, target.address(), &WordRequest { word: "hi".into() }, None).unwrap();
        relay.deliver(env.clone()).await.unwrap();
        assert_eq!(inbox.recv().await.unwrap(), env);
    }

    #[tokio::test]
    async fn unknown_target_errors() {
        let relay = LocalRelay::new();
        let sender = Identity::from_seed("local sender").unwrap();
        let env = Envelope::new(&sender, "agent1qnobody", &WordRequest { word: "hi".into() }, None).unwrap();
        assert!(matches!(relay.deliver(env).await, Err(RelayError::UnknownTarget(_))));
    }

    #[tokio::test]
    async fn closed_inbox_is_delivery_error() {
        let relay = LocalRelay::new();
        let sender = Identity::from_seed("local sender").unwrap();
        let target = Identity::from_seed("local target").unwrap();
        drop(relay.register(target.address()));
        let env = Envelope::new(&sender, target.address(), &WordRequest { word: "hi".into() }, None).unwrap();
        assert!(matches!(relay.deliver(env).await, Err(RelayError::Delivery { .. })));
    }

    #[tokio::test]
    async fn full_inbox_fails_without_waiting() {
        let relay = LocalRelay::new();
        let sender = Identity::from_seed("local sender").unwrap();
        let target = Identity::from_seed("local target").unwrap();
        let mut inbox = relay.register(target.address());
        let env = Envelope::new(&sender, target.address(), &WordRequest { word: "hi".into() }, None).unwrap();

        for _ in 0..INBOX_CAPACITY {
            relay.deliver(env.clone()).await.unwrap();
        }
        match relay.deliver(env.clone()).await {
            Err(RelayError::Delivery { detail, .. }) => assert_eq!(detail, "inbox full"),
            other => panic!("expected a full inbox, got {other:?}"),
        }

        inbox.recv().await.unwrap();
        relay.deliver(env).await.unwrap();
    }
}
