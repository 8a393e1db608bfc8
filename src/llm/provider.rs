//! LLM Provider implementations

use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{ProviderConfig, ProviderKind};
use crate::error::{Result, SurveyError};

/// One completion call: an optional system prompt plus a user message
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub system: Option<&'a str>,
    pub message: &'a str,
    pub params: SamplingParams,
}

/// Per-call generation parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Generic responder trait: one request in, one reply text out
#[async_trait::async_trait]
pub trait Responder: Send + Sync {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String>;
    fn name(&self) -> &str;
}

fn http_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder().timeout(timeout).build()?)
}

/// Turn a non-2xx response into a provider error carrying the body
async fn check_status(response: Response, provider: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(SurveyError::Provider(format!(
        "{} returned HTTP {}: {}",
        provider,
        status,
        body.trim()
    )))
}

/// OpenAI-compatible provider
pub struct OpenAiProvider {
    name: String,
    client: Client,
    config: ProviderConfig,
    api_key: String,
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct OpenAiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessageResponse,
}

#[derive(Deserialize)]
struct OpenAiMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiProvider {
    pub fn new(config: ProviderConfig, api_key: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            name: config.name.clone(),
            client: http_client(timeout)?,
            config,
            api_key,
        })
    }
}

#[async_trait::async_trait]
impl Responder for OpenAiProvider {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system {
            messages.push(OpenAiMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(OpenAiMessage {
            role: "user",
            content: request.message,
        });

        let body = OpenAiRequest {
            model: &self.config.model,
            messages,
            max_tokens: request.params.max_tokens,
            temperature: request.params.temperature,
        };

        let url = format!(
            "{}/chat/completions",
            self.config.endpoint.trim_end_matches('/')
        );
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let response: OpenAiResponse = check_status(response, &self.name)
            .await?
            .json()
            .await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| SurveyError::Provider(format!("No response from {}", self.name)))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Anthropic Claude provider
pub struct AnthropicProvider {
    name: String,
    client: Client,
    config: ProviderConfig,
    api_key: String,
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicContent>,
}

#[derive(Deserialize)]
struct AnthropicContent {
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicProvider {
    pub fn new(config: ProviderConfig, api_key: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            name: config.name.clone(),
            client: http_client(timeout)?,
            config,
            api_key,
        })
    }
}

#[async_trait::async_trait]
impl Responder for AnthropicProvider {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String> {
        let body = AnthropicRequest {
            model: &self.config.model,
            max_tokens: request.params.max_tokens,
            temperature: request.params.temperature,
            system: request.system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: request.message,
            }],
        };

        let url = format!("{}/messages", self.config.endpoint.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let response: AnthropicResponse = check_status(response, &self.name)
            .await?
            .json()
            .await?;

        response
            .content
            .into_iter()
            .find_map(|c| c.text)
            .ok_or_else(|| SurveyError::Provider(format!("No response from {}", self.name)))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Stand-in for a provider that could not be built; every call fails
pub struct UnavailableProvider {
    name: String,
    reason: String,
}

impl UnavailableProvider {
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

#[async_trait::async_trait]
impl Responder for UnavailableProvider {
    async fn complete(&self, _request: &CompletionRequest<'_>) -> Result<String> {
        Err(SurveyError::Provider(format!(
            "{} unavailable: {}",
            self.name, self.reason
        )))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Factory function to create provider from config
pub fn create_provider(config: &ProviderConfig, timeout: Duration) -> Result<Box<dyn Responder>> {
    let key = config
        .resolve_api_key()
        .ok_or_else(|| SurveyError::MissingApiKey(config.name.clone()))?;

    match config.kind {
        ProviderKind::OpenAi => Ok(Box::new(OpenAiProvider::new(config.clone(), key, timeout)?)),
        ProviderKind::Anthropic => Ok(Box::new(AnthropicProvider::new(
            config.clone(),
            key,
            timeout,
        )?)),
    }
}
