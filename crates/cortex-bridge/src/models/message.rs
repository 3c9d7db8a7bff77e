use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CortexRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CortexToolUse {
    pub tool_use_id: String,
    pub name: String,
    pub input: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CortexToolResults {
    pub tool_use_id: String,
    pub name: String,
    pub content: Vec<CortexResultContent>,
}

/// Tool result payloads are wrapped in typed text fragments on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CortexResultContent {
    Text { text: String },
}

/// One entry of a message's `content_list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CortexContent {
    Text { text: String },
    ToolUse { tool_use: CortexToolUse },
    ToolResults { tool_results: CortexToolResults },
}

/// A message in the Cortex inference API shape.
///
/// Invariant: `content` is never empty. The API rejects messages with an
/// empty text summary even when the payload lives in `content_list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CortexMessage {
    pub role: CortexRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content_list: Vec<CortexContent>,
}

impl CortexMessage {
    pub fn user() -> Self {
        CortexMessage {
            role: CortexRole::User,
            content: String::new(),
            content_list: Vec::new(),
        }
    }

    pub fn assistant() -> Self {
        CortexMessage {
            role: CortexRole::Assistant,
            content: String::new(),
            content_list: Vec::new(),
        }
    }

    /// Set the flat text summary
    pub fn with_content<S: Into<String>>(mut self, content: S) -> Self {
        self.content = content.into();
        self
    }

    /// Append a text block to the content list
    pub fn with_text_block<S: Into<String>>(mut self, text: S) -> Self {
        self.content_list.push(CortexContent::Text { text: text.into() });
        self
    }

    /// Append a tool use block to the content list
    pub fn with_tool_use<S: Into<String>, N: Into<String>>(
        mut self,
        tool_use_id: S,
        name: N,
        input: Value,
    ) -> Self {
        self.content_list.push(CortexContent::ToolUse {
            tool_use: CortexToolUse {
                tool_use_id: tool_use_id.into(),
                name: name.into(),
                input,
            },
        });
        self
    }

    /// Build the user message that reports one tool result back to the model.
    /// The fixed label keeps `content` non-empty.
    pub fn tool_result<S: Into<String>, N: Into<String>, T: Into<String>>(
        tool_use_id: S,
        name: N,
        result_text: T,
    ) -> Self {
        let name = name.into();
        CortexMessage {
            role: CortexRole::User,
            content: format!("Tool result for {name}"),
            content_list: vec![CortexContent::ToolResults {
                tool_results: CortexToolResults {
                    tool_use_id: tool_use_id.into(),
                    name,
                    content: vec![CortexResultContent::Text {
                        text: result_text.into(),
                    }],
                },
            }],
        }
    }
}
