use anyhow::Result;

use super::openai::ChatRequest;

/// Trait for chat-completion backends (OpenAI, test doubles, etc.)
#[async_trait::async_trait]
pub trait ModelService: Send + Sync {
    /// Send one chat request and hand back the raw JSON body, success or not.
    async fn complete(
        &self,
        api_url: &str,
        api_key: &str,
        request: &ChatRequest,
    ) -> Result<serde_json::Value>;
}
