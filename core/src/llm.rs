use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::LlmSettings;
use crate::memory::{ChatMessage, Role};

/// Anything that can turn a history plus a new prompt into a reply.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn reply(&self, api_key: &str, history: &[ChatMessage], prompt: &str) -> Result<String>;
}

/// Talks to an OpenAI-compatible chat completions endpoint. A client is built per
/// call because every request brings its own credential.
pub struct Brain {
    settings: LlmSettings,
}

impl Brain {
    pub fn new(settings: LlmSettings) -> Self {
        info!(
            "Brain configured. Model: {} @ {} (temperature {})",
            settings.model, settings.api_base, settings.temperature
        );
        Self { settings }
    }

    fn client(&self, api_key: &str) -> Client<OpenAIConfig> {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(&self.settings.api_base);
        Client::with_config(config)
    }
}

fn to_request_message(message: &ChatMessage) -> Result<ChatCompletionRequestMessage> {
    let converted: ChatCompletionRequestMessage = match message.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(message.content.as_str())
            .build()?
            .into(),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(message.content.as_str())
            .build()?
            .into(),
        Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(message.content.as_str())
            .build()?
            .into(),
    };
    Ok(converted)
}

/// History first, then the new user turn.
pub fn request_messages(history: &[ChatMessage], prompt: &str) -> Result<Vec<ChatCompletionRequestMessage>> {
    let turn = ChatMessage::new(Role::User, prompt);
    history
        .iter()
        .chain(std::iter::once(&turn))
        .map(to_request_message)
        .collect()
}

#[async_trait]
impl ChatModel for Brain {
    async fn reply(&self, api_key: &str, history: &[ChatMessage], prompt: &str) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.settings.model)
            .temperature(self.settings.temperature)
            .messages(request_messages(history, prompt)?)
            .build()?;

        debug!("Sending {} history messages to {}", history.len(), self.settings.model);

        let response = self
            .client(api_key)
            .chat()
            .create(request)
            .await
            .context("chat completion request failed")?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| anyhow!("model returned an empty reply"))
    }
}
