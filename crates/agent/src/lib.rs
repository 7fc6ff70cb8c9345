//! Chat agent: an OpenAI-compatible completion client, the trading toolkit,
//! and the loop that lets the model call tools until it produces a reply.

pub mod agent;
pub mod client;
pub mod tools;
pub mod types;

pub use agent::ChatAgent;
pub use client::{CompletionClient, OpenAIClient};
pub use tools::{ToolExecutor, TradingToolkit};
pub use types::{ChatMessage, Role, Tool, ToolCall};

/// Errors from the completion boundary.
///
/// Tool-level failures never surface here: they are fed back to the model
/// as inline error payloads so a failed call cannot crash the conversation.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(#[from] reqwest::Error),
    #[error("Completion API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("Completion response contained no choices")]
    EmptyResponse,
    #[error("Tool loop exceeded {0} rounds without a final reply")]
    ToolLoopLimit(usize),
}
