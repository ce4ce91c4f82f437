//! Dummy LLM provider: echoes input back prefixed with `[echo]`.
//! Lets the scolding reaction run end to end without an API key.

use crate::llm::ProviderError;

#[derive(Debug, Clone)]
pub struct DummyProvider;

impl DummyProvider {
    pub async fn complete(&self, content: &str, _system: Option<&str>) -> Result<String, ProviderError> {
        Ok(format!("[echo] {content}"))
    }
}
