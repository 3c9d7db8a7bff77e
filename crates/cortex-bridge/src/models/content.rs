use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
    System,
    #[serde(other)]
    Unknown,
}

/// One message in the client-visible conversation.
///
/// `content` is either a plain string or an array of content blocks, and the
/// AI SDK additionally sends tool results through direct properties on the
/// turn itself, so everything beyond the role stays as raw JSON. Malformed
/// turns must degrade to placeholders rather than fail the request, which
/// rules out strict deserialization here.
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    #[serde(default)]
    pub content: Value,
    #[serde(default, alias = "toolCalls")]
    pub tool_calls: Option<Value>,
    #[serde(default, rename = "toolName")]
    pub tool_name: Option<String>,
    #[serde(default, rename = "toolCallId", alias = "tool_call_id")]
    pub tool_call_id: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
}

impl ConversationTurn {
    pub fn new(role: Role, content: Value) -> Self {
        ConversationTurn {
            role,
            content,
            tool_calls: None,
            tool_name: None,
            tool_call_id: None,
            result: None,
        }
    }

    /// Create a user turn with plain text content
    pub fn user<S: Into<String>>(text: S) -> Self {
        Self::new(Role::User, Value::String(text.into()))
    }

    /// Create an assistant turn with plain text content
    pub fn assistant<S: Into<String>>(text: S) -> Self {
        Self::new(Role::Assistant, Value::String(text.into()))
    }

    /// Get the content if it is a plain string
    pub fn content_text(&self) -> Option<&str> {
        self.content.as_str()
    }

    /// Get the content if it is a block array
    pub fn content_blocks(&self) -> Option<&Vec<Value>> {
        self.content.as_array()
    }
}
