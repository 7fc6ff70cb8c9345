use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A registered user. Deactivated instead of deleted.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: &str, hashed_password: &str, full_name: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            hashed_password: hashed_password.to_string(),
            full_name,
            is_active: true,
            is_superuser: false,
            is_verified: false,
            created_at: now,
            updated_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// Thread & Message
// ---------------------------------------------------------------------------

/// A conversation thread owned by one user.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Thread {
    pub id: Uuid,
    pub title: Option<String>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Thread {
    pub fn new(user_id: Uuid, title: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title,
            user_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The author role of a chat message. Stored as text, constrained by a
/// CHECK on the messages table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    Tool,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
            ChatRole::Tool => "tool",
        }
    }
}

/// A single message inside a thread, ordered by creation time.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub role: ChatRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(thread_id: Uuid, role: ChatRole, content: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            thread_id,
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Exchange Account
// ---------------------------------------------------------------------------

/// Stored API credentials for one exchange account.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ExchangeAccount {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    #[serde(skip_serializing)]
    pub api_secret: String,
    pub testnet: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl ExchangeAccount {
    pub fn new(user_id: Uuid, name: &str, api_key: &str, api_secret: &str, testnet: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            name: name.to_string(),
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
            testnet,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Trading Bot
// ---------------------------------------------------------------------------

/// An automated trading bot configuration bound to an exchange account.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TradingBot {
    pub id: Uuid,
    pub user_id: Uuid,
    pub exchange_account_id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub tickers: Vec<String>,
    /// Overrides the built-in base prompt when set.
    pub base_prompt: Option<String>,
    /// Extra operator notes injected into the prompt when set.
    pub additional_notes: Option<String>,
    pub risk_tolerance: i32,
    pub target_profit: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One log entry of a bot's activity ("BUY", "SELL", "ANALYSIS").
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BotActivity {
    pub id: i64,
    pub bot_id: Uuid,
    pub activity_type: String,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructor_sets_thread() {
        let thread = Thread::new(Uuid::new_v4(), Some("Test Thread".to_string()));
        let msg = Message::new(thread.id, ChatRole::User, "hello");
        assert_eq!(msg.thread_id, thread.id);
        assert_eq!(msg.role, ChatRole::User);
        assert_eq!(msg.content, "hello");
    }

    #[test]
    fn test_chat_role_serde_snake_case() {
        assert_eq!(serde_json::to_string(&ChatRole::Assistant).unwrap(), "\"assistant\"");
        assert_eq!(ChatRole::Tool.as_str(), "tool");
    }

    #[test]
    fn test_user_serializes_without_password() {
        let user = User::new("test@example.com", "$2b$12$abc", None);
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("hashed_password").is_none());
        assert_eq!(json["email"], "test@example.com");
    }
}
