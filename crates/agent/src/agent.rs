use std::sync::Arc;

use crate::client::CompletionClient;
use crate::tools::ToolExecutor;
use crate::types::{ChatMessage, Role};
use crate::AgentError;

const DEFAULT_SYSTEM_PROMPT: &str = "You are a crypto-trading assistant. You can inspect the \
user's exchange account and place or cancel orders through the available tools. Confirm \
destructive actions, report tool errors honestly, and never invent balances or prices.";

/// Maximum tool rounds before the loop gives up.
const MAX_TOOL_ROUNDS: usize = 8;

/// Drives one conversation turn: call the model, execute any requested
/// tools, feed the results back, and repeat until the model answers in
/// plain text.
pub struct ChatAgent {
    client: Arc<dyn CompletionClient>,
    toolkit: Arc<dyn ToolExecutor>,
    system_prompt: String,
    max_tool_rounds: usize,
}

impl ChatAgent {
    pub fn new(client: Arc<dyn CompletionClient>, toolkit: Arc<dyn ToolExecutor>) -> Self {
        Self {
            client,
            toolkit,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tool_rounds: MAX_TOOL_ROUNDS,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Produce the assistant's reply for an ordered conversation history.
    pub async fn run(&self, history: Vec<ChatMessage>) -> Result<String, AgentError> {
        let tools = self.toolkit.definitions();
        let mut messages = Vec::with_capacity(history.len() + 1);
        if !history.iter().any(|m| m.role == Role::System) {
            messages.push(ChatMessage::system(self.system_prompt.clone()));
        }
        messages.extend(history);

        for _ in 0..self.max_tool_rounds {
            let reply = self.client.complete(&messages, &tools).await?;

            if !reply.has_tool_calls() {
                return Ok(reply.content.unwrap_or_default());
            }

            let calls = reply.tool_calls.clone().unwrap_or_default();
            messages.push(reply);
            for call in calls {
                let arguments = match call.arguments_value() {
                    Ok(arguments) => arguments,
                    Err(e) => serde_json::json!({"error": format!("unparseable arguments: {e}")}),
                };
                let result = self.toolkit.execute(&call.function.name, arguments).await;
                tracing::debug!(tool = %call.function.name, "tool call finished");
                messages.push(ChatMessage::tool(call.id, result.to_string()));
            }
        }

        Err(AgentError::ToolLoopLimit(self.max_tool_rounds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FunctionCall, Tool, ToolCall};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    /// Replays a scripted sequence of model replies.
    struct ScriptedClient {
        replies: Mutex<Vec<ChatMessage>>,
    }

    impl ScriptedClient {
        fn new(mut replies: Vec<ChatMessage>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
            }
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(
            &self,
            _messages: &[ChatMessage],
            _tools: &[Tool],
        ) -> Result<ChatMessage, AgentError> {
            self.replies
                .lock()
                .unwrap()
                .pop()
                .ok_or(AgentError::EmptyResponse)
        }
    }

    struct RecordingToolkit {
        executed: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingToolkit {
        fn new(fail: bool) -> Self {
            Self {
                executed: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    #[async_trait]
    impl ToolExecutor for RecordingToolkit {
        fn definitions(&self) -> Vec<Tool> {
            vec![Tool::function("get_latest_price", "price", json!({"type": "object"}))]
        }

        async fn execute(&self, name: &str, _arguments: Value) -> Value {
            self.executed.lock().unwrap().push(name.to_string());
            if self.fail {
                json!({"error": "exchange unavailable"})
            } else {
                json!({"symbol": "BTCUSDT", "price": "29500.00"})
            }
        }
    }

    fn tool_call_reply(name: &str) -> ChatMessage {
        ChatMessage {
            role: Role::Assistant,
            content: None,
            tool_calls: Some(vec![ToolCall {
                id: "call_1".to_string(),
                tool_type: "function".to_string(),
                function: FunctionCall {
                    name: name.to_string(),
                    arguments: "{\"symbol\": \"BTCUSDT\"}".to_string(),
                },
            }]),
            tool_call_id: None,
        }
    }

    #[tokio::test]
    async fn test_plain_reply_terminates_immediately() {
        let client = Arc::new(ScriptedClient::new(vec![ChatMessage::assistant("hi")]));
        let toolkit = Arc::new(RecordingToolkit::new(false));
        let agent = ChatAgent::new(client, toolkit.clone());

        let reply = agent.run(vec![ChatMessage::user("hello")]).await.unwrap();
        assert_eq!(reply, "hi");
        assert!(toolkit.executed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tool_round_feeds_result_back() {
        let client = Arc::new(ScriptedClient::new(vec![
            tool_call_reply("get_latest_price"),
            ChatMessage::assistant("BTC trades at 29500."),
        ]));
        let toolkit = Arc::new(RecordingToolkit::new(false));
        let agent = ChatAgent::new(client, toolkit.clone());

        let reply = agent.run(vec![ChatMessage::user("price of BTC?")]).await.unwrap();
        assert_eq!(reply, "BTC trades at 29500.");
        assert_eq!(*toolkit.executed.lock().unwrap(), vec!["get_latest_price"]);
    }

    #[tokio::test]
    async fn test_tool_error_does_not_crash_the_conversation() {
        let client = Arc::new(ScriptedClient::new(vec![
            tool_call_reply("get_latest_price"),
            ChatMessage::assistant("The exchange is unavailable right now."),
        ]));
        let toolkit = Arc::new(RecordingToolkit::new(true));
        let agent = ChatAgent::new(client, toolkit);

        let reply = agent.run(vec![ChatMessage::user("price?")]).await.unwrap();
        assert_eq!(reply, "The exchange is unavailable right now.");
    }

    #[tokio::test]
    async fn test_endless_tool_calls_hit_the_round_limit() {
        let replies: Vec<ChatMessage> = (0..16).map(|_| tool_call_reply("get_latest_price")).collect();
        let client = Arc::new(ScriptedClient::new(replies));
        let toolkit = Arc::new(RecordingToolkit::new(false));
        let agent = ChatAgent::new(client, toolkit);

        let err = agent.run(vec![ChatMessage::user("loop")]).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolLoopLimit(_)));
    }
}
