//! Dummy LLM provider: echoes the user turn back prefixed with `[echo]`.
//! Used for exercising agent round-trips without a real API key.

use crate::llm::{CompletionRequest, LlmResponse, ProviderError};

#[derive(Debug, Clone)]
pub struct DummyProvider;

impl DummyProvider {
    pub async fn complete(&self, request: &CompletionRequest) -> Result<LlmResponse, ProviderError> {
        Ok(LlmResponse { text: format!("[echo] {}", request.user), usage: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn complete_prefixes_echo() {
        let p = DummyProvider;
        let r = p.complete(&CompletionRequest::user("hello")).await.unwrap();
        assert_eq!(r.text, "[echo] hello");
        assert!(r.usage.is_none());
    }
}
