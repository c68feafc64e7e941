use async_trait::async_trait;
use crate::error::Result;
use crate::llm::prompts::RatingRequest;
use crate::models::EvaluationResponse;

#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// One non-streaming call scoring every message of the request.
    async fn evaluate_commits(&self, request: &RatingRequest) -> Result<EvaluationResponse>;
    /// Model identifiers visible to the configured credential, used as a connectivity check.
    async fn list_models(&self) -> Result<Vec<String>>;
    fn name(&self) -> &str;
}
