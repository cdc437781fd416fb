//! Point-to-point message relay between agents.
//!
//! One [`Envelope`] per delivery, no queueing, no retries, no ordering
//! guarantees across senders. Two transports:
//!
//! - [`HttpRelay`]: POSTs the envelope to the target's `/submit` endpoint,
//!   resolved from the configured address book or learned from verified
//!   inbound envelopes. [`InboundEndpoint`] is the receiving side.
//! - [`LocalRelay`]: hands envelopes straight to in-process inboxes
//!   (`run-all` and tests).

mod envelope;
mod http;
mod local;

pub use envelope::{ENVELOPE_VERSION, Envelope};
pub use http::{HttpRelay, InboundEndpoint, build_inbound_router};
pub use local::LocalRelay;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("cannot encode message: {0}")]
    Encode(String),
    #[error("cannot decode message: {0}")]
    Decode(String),
    #[error("schema mismatch: expected {expected}, got {got}")]
    SchemaMismatch { expected: String, got: String },
    #[error("malformed envelope: {0}")]
    BadEnvelope(String),
    #[error("signature check failed: {0}")]
    BadSignature(String),
    #[error("no endpoint known for {0}")]
    UnknownTarget(String),
    #[error("delivery to {target} failed: {detail}")]
    Delivery { target: String, detail: String },
    #[error("delivery to {0} timed out")]
    Timeout(String),
    #[error("{target} rejected envelope (HTTP {status}): {detail}")]
    Rejected { target: String, status: u16, detail: String },
}

/// All available relay transports.
#[derive(Debug, Clone)]
pub enum Relay {
    Http(HttpRelay),
    Local(LocalRelay),
}

impl Relay {
    /// Deliver one envelope to its target.
    pub async fn deliver(&self, envelope: Envelope) -> Result<(), RelayError> {
        match self {
            Relay::Http(r) => r.deliver(envelope).await,
            Relay::Local(r) => r.deliver(envelope).await,
        }
    }

    /// Remember where `address` accepts envelopes. Only called with endpoints
    /// taken from envelopes that passed signature verification.
    pub fn learn(&self, address: &str, endpoint: &str) {
        if let Relay::Http(r) = self {
            r.learn(address, endpoint);
        }
    }
}
