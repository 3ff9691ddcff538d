//! Chat-completions client for the text classification service
//!
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use serde::{Deserialize, Serialize};

use super::{ClassifierError, Completion, CompletionService};
use crate::config::Settings;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// OpenAI-compatible chat-completions client
pub struct OpenAiClient {
    agent: ureq::Agent,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, base_url: impl Into<String>) -> Self {
        // Non-2xx responses are read so their body can be reported
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build a client from settings; fails when no API key is configured
    pub fn from_settings(settings: &Settings) -> Result<Self, ClassifierError> {
        let api_key = settings
            .openai_api_key
            .as_deref()
            .ok_or(ClassifierError::MissingApiKey)?;

        Ok(Self::new(
            api_key,
            settings.openai_model.as_str(),
            settings.openai_base_url.as_str(),
        ))
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl CompletionService for OpenAiClient {
    fn complete(&self, system: &str, prompt: &str) -> Result<Completion, ClassifierError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let mut response = self
            .agent
            .post(&url)
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(&request)
            .map_err(|e| ClassifierError::Transport(e.to_string()))?;

        let status = response.status();
        let raw = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ClassifierError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(ClassifierError::Status {
                code: status.as_u16(),
                body: raw,
            });
        }

        let text = parse_completion(&raw)?;
        Ok(Completion { text, raw })
    }
}

/// Extract the first choice's text from a chat-completions response body
fn parse_completion(raw: &str) -> Result<String, ClassifierError> {
    let response: ChatResponse =
        serde_json::from_str(raw).map_err(|e| ClassifierError::Malformed(e.to_string()))?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or(ClassifierError::EmptyCompletion)
}
