use std::sync::Arc;
use tracing::{error, info};

use crate::context::{build_prompt, parse_tabs, TabDescriptor, SYSTEM_PROMPT};
use crate::error::ChatError;
use crate::llm::ChatModel;
use crate::memory::ConversationStore;
use crate::structured::{extract_structured, wants_structured, ResponseEnvelope};

const LOG_PREVIEW_CHARS: usize = 100;

/// A validated chat call.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub message: String,
    pub tabs: Vec<TabDescriptor>,
    pub api_key: String,
    pub conversation_id: String,
}

impl ChatRequest {
    /// Validates raw parameters: credential first, then message. A bad `tabs`
    /// payload is not an error.
    pub fn from_params(
        message: Option<String>,
        tabs: Option<&str>,
        api_key: Option<String>,
        tab_id: Option<String>,
    ) -> Result<Self, ChatError> {
        let api_key = api_key
            .filter(|k| !k.is_empty())
            .ok_or(ChatError::MissingCredential)?;
        let message = message
            .filter(|m| !m.is_empty())
            .ok_or(ChatError::MissingMessage)?;

        Ok(Self {
            message,
            tabs: parse_tabs(tabs),
            api_key,
            conversation_id: tab_id.unwrap_or_default(),
        })
    }
}

/// Picks the reply shape from what the user asked, not from what the model said.
pub fn shape_reply(message: &str, reply: &str) -> ResponseEnvelope {
    if wants_structured(message) {
        if let Some(structured) = extract_structured(reply) {
            return ResponseEnvelope::Structured(structured);
        }
    }
    ResponseEnvelope::natural(reply)
}

/// Runs chat turns against a model, keeping per-conversation history in the store.
#[derive(Clone)]
pub struct Assistant {
    model: Arc<dyn ChatModel>,
    store: Arc<ConversationStore>,
}

impl Assistant {
    pub fn new(model: Arc<dyn ChatModel>, store: Arc<ConversationStore>) -> Self {
        Self { model, store }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub async fn respond(&self, request: ChatRequest) -> Result<ResponseEnvelope, ChatError> {
        info!("Message: {}", request.message);
        info!("Selected tabs: {} tabs", request.tabs.len());
        info!("Tab ID: {}", request.conversation_id);

        let memory = self.store.get_or_create(&request.conversation_id).await;
        // Held for the whole turn: turns on one conversation run one at a time.
        let mut memory = memory.lock().await;
        memory.seed_system(SYSTEM_PROMPT);

        let prompt = build_prompt(&request.message, &request.tabs);

        let reply = self
            .model
            .reply(&request.api_key, memory.messages(), &prompt)
            .await
            .map_err(|e| {
                error!("Model call failed for tab '{}': {:#}", request.conversation_id, e);
                ChatError::ExternalCallFailure(e)
            })?;

        memory.record_turn(prompt, reply.as_str());
        drop(memory);

        let preview: String = reply.chars().take(LOG_PREVIEW_CHARS).collect();
        info!("AI Response: {}...", preview);

        Ok(shape_reply(&request.message, &reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemorySettings;
    use crate::context::TabDescriptor;
    use crate::memory::{ChatMessage, Role};
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replies with a fixed text and remembers what it was shown.
    struct ScriptedModel {
        reply: Option<String>,
        seen: Mutex<Vec<(String, Vec<ChatMessage>, String)>>,
    }

    impl ScriptedModel {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Some(text.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: None,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn reply(&self, api_key: &str, history: &[ChatMessage], prompt: &str) -> Result<String> {
            self.seen
                .lock()
                .unwrap()
                .push((api_key.to_string(), history.to_vec(), prompt.to_string()));
            self.reply.clone().ok_or_else(|| anyhow!("upstream unavailable"))
        }
    }

    fn assistant(model: Arc<ScriptedModel>) -> Assistant {
        let store = Arc::new(ConversationStore::new(&MemorySettings {
            max_conversations: 16,
            idle_ttl: None,
        }));
        Assistant::new(model, store)
    }

    fn request(message: &str, tabs: Vec<TabDescriptor>, tab_id: &str) -> ChatRequest {
        ChatRequest {
            message: message.to_string(),
            tabs,
            api_key: "key-123".to_string(),
            conversation_id: tab_id.to_string(),
        }
    }

    #[test]
    fn credential_is_checked_before_message() {
        let err = ChatRequest::from_params(None, None, None, None).unwrap_err();
        assert!(matches!(err, ChatError::MissingCredential));

        let err = ChatRequest::from_params(Some("hi".into()), None, Some(String::new()), None).unwrap_err();
        assert!(matches!(err, ChatError::MissingCredential));

        let err = ChatRequest::from_params(Some(String::new()), None, Some("k".into()), None).unwrap_err();
        assert!(matches!(err, ChatError::MissingMessage));
    }

    #[test]
    fn malformed_tabs_are_tolerated() {
        let req = ChatRequest::from_params(Some("hi".into()), Some("not-json"), Some("k".into()), None).unwrap();
        assert!(req.tabs.is_empty());
        assert_eq!(req.conversation_id, "");
    }

    #[test]
    fn shape_depends_on_question_not_reply() {
        let listy = "Key Points\n- one\n- two";
        assert!(shape_reply("summarize please", listy).is_structured());
        assert_eq!(shape_reply("hello", listy), ResponseEnvelope::natural(listy));
        assert_eq!(
            shape_reply("summarize please", "  Just prose here.  "),
            ResponseEnvelope::Natural { content: "Just prose here.".to_string() }
        );
    }

    #[tokio::test]
    async fn first_turn_seeds_system_prompt_and_records_history() {
        let model = ScriptedModel::replying("Hi! How can I help?");
        let assistant = assistant(model.clone());

        let envelope = assistant.respond(request("hello", vec![], "tab-1")).await.unwrap();
        assert_eq!(envelope, ResponseEnvelope::natural("Hi! How can I help?"));

        assistant.respond(request("again", vec![], "tab-1")).await.unwrap();

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        let (key, first_history, first_prompt) = &seen[0];
        assert_eq!(key, "key-123");
        assert_eq!(first_history, &vec![ChatMessage::new(Role::System, SYSTEM_PROMPT)]);
        assert_eq!(first_prompt, "hello");

        let (_, second_history, _) = &seen[1];
        let roles: Vec<Role> = second_history.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
        assert_eq!(assistant.store().count().await, 1);
    }

    #[tokio::test]
    async fn tabs_are_folded_into_prompt() {
        let model = ScriptedModel::replying("ok");
        let assistant = assistant(model.clone());
        let tabs = vec![TabDescriptor::new("Docs", "https://docs.rs/tokio")];

        assistant.respond(request("what is this", tabs, "t")).await.unwrap();

        let seen = model.seen.lock().unwrap();
        assert!(seen[0].2.starts_with("Context: Currently viewing:\nTab 1: 'Docs' from docs.rs"));
        assert!(seen[0].2.contains("User question: what is this"));
    }

    #[tokio::test]
    async fn structured_reply_when_asked_for_points() {
        let model = ScriptedModel::replying("Here is a summary.\nKey Points\n1. Fast\n2. Safe\nSuggestions\n- Try it");
        let assistant = assistant(model);

        match assistant.respond(request("List the main points", vec![], "t")).await.unwrap() {
            ResponseEnvelope::Structured(s) => {
                assert_eq!(s.main_points, vec!["Fast", "Safe"]);
                assert_eq!(s.details.suggestions, vec!["Try it"]);
                assert_eq!(s.summary, "Here is a summary.");
            }
            other => panic!("expected structured reply, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn model_failure_keeps_partial_memory() {
        let assistant = assistant(ScriptedModel::failing());

        let err = assistant.respond(request("hello", vec![], "tab-9")).await.unwrap_err();
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.to_string(), "An error occurred: upstream unavailable");

        let memory = assistant.store().get_or_create("tab-9").await;
        let memory = memory.lock().await;
        assert_eq!(memory.len(), 1);
        assert_eq!(memory.messages()[0].role, Role::System);
    }

    #[tokio::test]
    async fn conversations_are_isolated() {
        let model = ScriptedModel::replying("ok");
        let assistant = assistant(model.clone());

        assistant.respond(request("a", vec![], "left")).await.unwrap();
        assistant.respond(request("b", vec![], "right")).await.unwrap();

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen[1].1.len(), 1, "second conversation starts with only the system prompt");
        assert_eq!(assistant.store().count().await, 2);
    }
}
