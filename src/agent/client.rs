use crate::agent::types::{ChatMessage, ChatRequest, ChatResponse, ToolDefinition};
use crate::error::{CfoError, Result};
use log::debug;
use reqwest::Client;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o";

/// Minimal chat-completions client over a long-lived reqwest `Client`.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: OPENAI_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point at an OpenAI-compatible endpoint (e.g. a local proxy).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// One completion round: send the conversation plus the tool catalog,
    /// return the assistant message (final text or requested tool calls).
    pub async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolDefinition>,
    ) -> Result<ChatMessage> {
        let url = format!("{}/chat/completions", self.base_url);
        let payload = ChatRequest {
            model: self.model.clone(),
            messages,
            tools,
            tool_choice: "auto".to_string(),
        };

        debug!("chat completion request to {} ({})", url, self.model);
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let err_text = res.text().await?;
            return Err(CfoError::CompletionFailed(format!(
                "API error (status {}): {}",
                status, err_text
            )));
        }

        let body: ChatResponse = res.json().await?;
        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| CfoError::CompletionFailed("empty choices list".to_string()))
    }
}
