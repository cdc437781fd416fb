//! Signed envelope carrying one message between agents.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::RelayError;
use crate::identity::{self, Identity};
use crate::models::Model;

pub const ENVELOPE_VERSION: u8 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub version: u8,
    pub sender: String,
    pub target: String,
    pub session: Uuid,
    pub schema: String,
    /// JSON-encoded message body.
    pub payload: String,
    /// Unix seconds at signing time.
    pub timestamp: i64,
    /// Where the sender accepts replies, if it accepts any.
    #[serde(default)]
    pub sender_endpoint: Option<String>,
    /// Hex ed25519 signature over [`Envelope::digest`].
    pub signature: String,
}

impl Envelope {
    /// Encode `msg` for `target` and sign it as `sender`.
    pub fn new<M: Model>(
        sender: &Identity,
        target: &str,
        msg: &M,
        sender_endpoint: Option<String>,
    ) -> Result<Self, RelayError> {
        let payload = serde_json::to_string(msg)
            .map_err(|e| RelayError::Encode(format!("{}: {e}", M::SCHEMA)))?;
        let mut envelope = Self {
            version: ENVELOPE_VERSION,
            sender: sender.address().to_string(),
            target: target.to_string(),
            session: Uuid::new_v4(),
            schema: M::SCHEMA.to_string(),
            payload,
            timestamp: chrono::Utc::now().timestamp(),
            sender_endpoint,
            signature: String::new(),
        };
        envelope.signature = sender.sign(&envelope.digest());
        Ok(envelope)
    }

    /// SHA-256 over every field except the signature, each length-prefixed.
    pub fn digest(&self) -> [u8; 32] {
        let session = self.session.to_string();
        let timestamp = self.timestamp.to_string();
        let mut hasher = Sha256::new();
        hasher.update([self.version]);
        for field in [
            self.sender.as_str(),
            self.target.as_str(),
            session.as_str(),
            self.schema.as_str(),
            self.payload.as_str(),
            timestamp.as_str(),
            self.sender_endpoint.as_deref().unwrap_or(""),
        ] {
            hasher.update((field.len() as u64).to_be_bytes());
            hasher.update(field.as_bytes());
        }
        hasher.finalize().into()
    }

    /// Check the signature against the key embedded in the sender address.
    pub fn verify(&self) -> Result<(), RelayError> {
        if self.version != ENVELOPE_VERSION {
            return Err(RelayError::BadEnvelope(format!("unsupported envelope version {}", self.version)));
        }
        identity::verify(&self.sender, &self.digest(), &self.signature)
            .map_err(|e| RelayError::BadSignature(e.to_string()))
    }

    pub fn is<M: Model>(&self) -> bool {
        self.schema == M::SCHEMA
    }

    /// Decode the payload as `M`, checking the schema first.
    pub fn decode<M: Model>(&self) -> Result<M, RelayError> {
        if !self.is::<M>() {
            return Err(RelayError::SchemaMismatch {
                expected: M::SCHEMA.to_string(),
                got: self.schema.clone(),
            });
        }
        serde_json::from_str(&self.payload).map_err(|e| RelayError::Decode(format!("{}: {e}", M::SCHEMA)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Approval, WordRequest};

    fn sender() -> Identity {
        Identity::from_seed("envelope sender").unwrap()
    }

    fn target() -> String {
        Identity::from_seed("envelope target").unwrap().address().to_string()
    }

    #[test]
    fn signed_envelope_verifies_and_decodes() {
        let msg = WordRequest { word: "apple".into() };
        let env = Envelope::new(&sender(), &target(), &msg, None).unwrap();
        env.verify().unwrap();
        assert!(env.is::<WordRequest>());
        assert_eq!(env.decode::<WordRequest>().unwrap(), msg);
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let msg = Approval { commission_id: "c1".into(), approved: false };
        let mut env = Envelope::new(&sender(), &target(), &msg, None).unwrap();
        env.payload = env.payload.replace("false", "true");
        assert!(matches!(env.verify(), Err(RelayError::BadSignature(_))));
    }

    #[test]
    fn spoofed_sender_is_rejected() {
        let msg = WordRequest { word: "apple".into() };
        let mut env = Envelope::new(&sender(), &target(), &msg, None).unwrap();
        env.sender = Identity::from_seed("someone else").unwrap().address().to_string();
        assert!(env.verify().is_err());
    }

    #[test]
    fn endpoint_is_covered_by_signature() {
        let msg = WordRequest { word: "apple".into() };
        let mut env =
            Envelope::new(&sender(), &target(), &msg, Some("http://127.0.0.1:8002/submit".into())).unwrap();
        env.sender_endpoint = Some("http://evil.example/submit".into());
        assert!(env.verify().is_err());
    }

    #[test]
    fn decode_with_wrong_type_is_schema_mismatch() {
        let env = Envelope::new(&sender(), &target(), &WordRequest { word: "x".into() }, None).unwrap();
        assert!(matches!(env.decode::<Approval>(), Err(RelayError::SchemaMismatch { .. })));
    }

    #[test]
    fn wire_round_trip_preserves_signature() {
        let env = Envelope::new(&sender(), &target(), &WordRequest { word: "x".into() }, None).unwrap();
        let wire = serde_json::to_string(&env).unwrap();
        let back: Envelope = serde_json::from_str(&wire).unwrap();
        back.verify().unwrap();
    }
}
