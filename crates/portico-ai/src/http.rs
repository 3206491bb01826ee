use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use portico_core::{AttachmentRef, ChatMessage};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::answer::AnswerService;

/// Connection settings for an OpenAI-compatible answer backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerServiceConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
}

impl Default for AnswerServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_owned(),
            api_key: None,
            model: "gpt-4o-mini".to_owned(),
        }
    }
}

impl AnswerServiceConfig {
    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_deref()
            .map(|key| !key.trim().is_empty())
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone)]
pub struct HttpAnswerClient {
    http: Client,
    config: AnswerServiceConfig,
}

impl HttpAnswerClient {
    pub fn new(config: AnswerServiceConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl AnswerService for HttpAnswerClient {
    async fn ask(
        &self,
        text: &str,
        attachments: &[AttachmentRef],
        conversation_id: Uuid,
    ) -> Result<ChatMessage> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("answer service missing api key"))?;

        let endpoint = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        // Attachments are references into the document portal; the backend
        // only sees their names.
        let mut content = text.to_owned();
        if !attachments.is_empty() {
            let names = attachments
                .iter()
                .map(|doc| doc.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            content.push_str("\n\n[attached documents: ");
            content.push_str(&names);
            content.push(']');
        }

        let payload = WireChatRequest {
            model: self.config.model.clone(),
            messages: vec![WireMessage {
                role: "user".to_owned(),
                content,
            }],
            stream: false,
            user: conversation_id.to_string(),
        };

        let response = self
            .http
            .post(endpoint)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .context("failed to reach answer service")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("answer service request failed: {status} {text}"));
        }

        let output: WireChatResponse = response
            .json()
            .await
            .context("invalid answer service response json")?;

        let content = output
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_default();

        if content.is_empty() {
            warn!(%conversation_id, model = %self.config.model, "empty answer content");
        }

        Ok(ChatMessage::assistant(content))
    }
}

#[derive(Debug, Serialize)]
struct WireChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    stream: bool,
    user: String,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct WireChatResponse {
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireAssistantMessage,
}

#[derive(Debug, Deserialize)]
struct WireAssistantMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_is_rejected_before_any_request() {
        let client = HttpAnswerClient::new(AnswerServiceConfig::default());
        let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
        let result = runtime.block_on(client.ask("hello", &[], Uuid::new_v4()));
        assert!(result.is_err());
    }

    #[test]
    fn blank_api_key_does_not_count_as_configured() {
        let config = AnswerServiceConfig {
            api_key: Some("  ".to_owned()),
            ..AnswerServiceConfig::default()
        };
        assert!(!config.has_api_key());
    }
}
