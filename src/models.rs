//! Message types exchanged between agents.
//!
//! Each type carries a stable [`Model::SCHEMA`] name that travels in the
//! envelope, so a receiver can tell what it got before decoding the payload.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::publishing::vocab::VocabOutput;

/// A message that can travel in an [`Envelope`](crate::relay::Envelope).
pub trait Model: Serialize + DeserializeOwned + Send + 'static {
    const SCHEMA: &'static str;
}

macro_rules! model {
    ($ty:ty, $schema:literal) => {
        impl Model for $ty {
            const SCHEMA: &'static str = $schema;
        }
    };
}

/// A client's request for creative work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionRequest {
    pub client_name: String,
    pub task_description: String,
    pub budget: f64,
    pub deadline: String,
}

/// The creator's drafted agreement for a commission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgreementDraft {
    pub commission_id: String,
    pub draft_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Approval {
    pub commission_id: String,
    pub approved: bool,
}

/// Sent to the payment agent once a commission is approved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub recipient_address: String,
    pub amount: f64,
    pub denomination: String,
    pub notes: String,
}

/// Sent by the payment agent to the paid party.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentNotification {
    pub amount: f64,
    pub denomination: String,
    pub status: String,
    pub sender_address: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordRequest {
    pub word: String,
}

/// Reply to a [`WordRequest`]: the image location and generated record, or an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabResponse {
    pub word: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub data: Option<VocabOutput>,
    #[serde(default)]
    pub error: Option<String>,
}

impl VocabResponse {
    pub fn failed(word: impl Into<String>, error: impl Into<String>) -> Self {
        Self { word: word.into(), image_url: None, data: None, error: Some(error.into()) }
    }
}

model!(CommissionRequest, "atelier.CommissionRequest");
model!(AgreementDraft, "atelier.AgreementDraft");
model!(Approval, "atelier.Approval");
model!(PaymentRequest, "atelier.PaymentRequest");
model!(PaymentNotification, "atelier.PaymentNotification");
model!(WordRequest, "atelier.WordRequest");
model!(VocabResponse, "atelier.VocabResponse");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schemas_are_distinct() {
        let schemas = [
            CommissionRequest::SCHEMA,
            AgreementDraft::SCHEMA,
            Approval::SCHEMA,
            PaymentRequest::SCHEMA,
            PaymentNotification::SCHEMA,
            WordRequest::SCHEMA,
            VocabResponse::SCHEMA,
        ];
        let unique: std::collections::HashSet<_> = schemas.iter().collect();
        assert_eq!(unique.len(), schemas.len());
    }

    #[test]
    fn payment_notification_notes_optional() {
        let n: PaymentNotification = serde_json::from_str(
            r#"{"amount": 500.0, "denomination": "USD", "status": "settled", "sender_address": "agent1qx"}"#,
        )
        .unwrap();
        assert!(n.notes.is_none());
    }

    #[test]
    fn commission_request_requires_budget() {
        let r = serde_json::from_str::<CommissionRequest>(
            r#"{"client_name": "a", "task_description": "b", "deadline": "c"}"#,
        );
        assert!(r.is_err());
    }

    #[test]
    fn failed_vocab_response_has_no_data() {
        let r = VocabResponse::failed("apple", "generation failed");
        assert!(r.data.is_none());
        assert!(r.image_url.is_none());
        assert_eq!(r.error.as_deref(), Some("generation failed"));
    }
}
