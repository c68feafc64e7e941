use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::AzureConfig;
use crate::error::{Error, Result};
use crate::llm::parser::parse_evaluation_response;
use crate::llm::prompts::{RatingRequest, SYSTEM_PROMPT};
use crate::llm::provider::LLMProvider;
use crate::models::EvaluationResponse;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_TOKENS: u32 = 4000;

pub struct AzureOpenAIProvider {
    client: Client,
    endpoint: String,
    api_key: String,
    deployment: String,
    api_version: String,
}

#[derive(Serialize)]
struct ChatRequest {
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

impl AzureOpenAIProvider {
    pub fn new(config: &AzureConfig) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        tracing::info!("Initializing Azure OpenAI client with endpoint: {}", config.endpoint);

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            deployment: config.deployment.clone(),
            api_version: config.api_version.clone(),
        })
    }

    fn chat_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, self.deployment, self.api_version
        )
    }

    fn models_url(&self) -> String {
        format!("{}/openai/models?api-version={}", self.endpoint, self.api_version)
    }

    fn build_request(request: &RatingRequest) -> ChatRequest {
        ChatRequest {
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.to_prompt(),
                },
            ],
            temperature: 0.0,
            max_tokens: MAX_TOKENS,
            response_format: ResponseFormat {
                format_type: "json_object".to_string(),
            },
        }
    }
}

fn extract_content(response: ChatResponse) -> Result<String> {
    if let Some(error) = response.error {
        return Err(Error::LLMApi(error.message));
    }

    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(Error::LLMApi("Empty response from Azure OpenAI".to_string()));
    }

    Ok(text)
}

#[async_trait]
impl LLMProvider for AzureOpenAIProvider {
    async fn evaluate_commits(&self, request: &RatingRequest) -> Result<EvaluationResponse> {
        tracing::debug!("Sending {} commit messages to {}", request.messages.len(), self.deployment);

        let response = self
            .client
            .post(self.chat_url())
            .header("api-key", &self.api_key)
            .json(&Self::build_request(request))
            .send()
            .await
            .map_err(|e| Error::LLMApi(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::LLMApi(format!(
                "Azure OpenAI API error ({}): {}",
                status, body
            )));
        }

        let result: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::LLMApi(format!("Failed to parse Azure OpenAI response: {}", e)))?;

        parse_evaluation_response(&extract_content(result)?)
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(self.models_url())
            .header("api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| Error::LLMApi(format!("Failed to reach {}: {}", self.endpoint, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::LLMApi(format!(
                "Azure OpenAI API error ({}): {}",
                status, body
            )));
        }

        let models: ModelList = response
            .json()
            .await
            .map_err(|e| Error::LLMApi(format!("Failed to parse model list: {}", e)))?;

        Ok(models.data.into_iter().map(|m| m.id).collect())
    }

    fn name(&self) -> &str {
        "Azure OpenAI"
    }
}
