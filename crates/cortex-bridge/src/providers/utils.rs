use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use crate::models::content::{ConversationTurn, Role};
use crate::models::message::CortexMessage;
use crate::models::tool::{CortexToolSpec, Tool};

/// Fallback text when a turn carries no usable text. The API rejects
/// messages with empty `content`.
const EMPTY_CONTENT_PLACEHOLDER: &str = "Processing request...";
/// Fallback text for an assistant turn that only carries tool calls.
const TOOL_CALL_PLACEHOLDER: &str = "I'll help you with that.";

/// Field lookup order for resolving a tool's name from a duck-typed
/// declaration. The AI SDK sends `toolName`; plain declarations send `name`.
const NAME_FIELDS: &[&str] = &["toolName", "name"];
/// Field lookup order for resolving a tool's parameter schema. The AI SDK
/// sends `parameters`; Anthropic-style declarations send `input_schema`.
const SCHEMA_FIELDS: &[&str] = &["parameters", "input_schema"];

/// Convert client conversation turns into the Cortex message list.
///
/// The API has no system role, so a non-empty system prompt is injected as
/// a leading assistant message. Every produced message carries a non-empty
/// `content` string; malformed turns degrade to placeholders instead of
/// failing the request.
pub fn turns_to_cortex_spec(turns: &[ConversationTurn], system: &str) -> Vec<CortexMessage> {
    let mut messages = Vec::with_capacity(turns.len() + 1);

    if !system.is_empty() {
        messages.push(CortexMessage::assistant().with_content(system));
    }

    for turn in turns {
        messages.push(normalize_turn(turn));
    }

    messages
}

fn normalize_turn(turn: &ConversationTurn) -> CortexMessage {
    match turn.role {
        Role::Tool => tool_result_message(turn),
        Role::Assistant if turn.tool_calls.is_some() => assistant_tool_call_message(turn),
        _ => plain_message(turn),
    }
}

/// A tool-role turn reports the outcome of one earlier tool call. The AI SDK
/// sends it as a content array of `tool-result` blocks; older callers send a
/// JSON-array string or direct properties on the turn.
fn tool_result_message(turn: &ConversationTurn) -> CortexMessage {
    let mut tool_name = "unknown_tool".to_string();
    let mut tool_call_id = "unknown_id".to_string();
    let mut result_text = String::new();

    if let Some(items) = turn.content_blocks() {
        // First tool result wins
        for item in items {
            if item.get("type").and_then(Value::as_str) == Some("tool-result") {
                if let Some(id) = item.get("toolCallId").and_then(Value::as_str) {
                    tool_call_id = id.to_string();
                }
                if let Some(name) = item.get("toolName").and_then(Value::as_str) {
                    tool_name = name.to_string();
                }
                if let Some(result) = item.get("result") {
                    result_text = value_to_text(result);
                }
                break;
            }
        }
    } else if matches!(turn.content_text(), Some(text) if text.starts_with('[')) {
        // Legacy shape: the block array arrives as a JSON string
        let text = turn.content_text().unwrap_or_default();
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Array(parsed)) if !parsed.is_empty() => {
                let first = &parsed[0];
                if let Some(id) = first.get("toolCallId").and_then(Value::as_str) {
                    tool_call_id = id.to_string();
                }
                if let Some(name) = first.get("toolName").and_then(Value::as_str) {
                    tool_name = name.to_string();
                }
                result_text = first
                    .get("result")
                    .map(value_to_text)
                    .unwrap_or_else(|| first.to_string());
            }
            Ok(_) | Err(_) => {
                warn!("failed to parse legacy tool result content, keeping it verbatim");
                result_text = text.to_string();
            }
        }
    } else {
        if let Some(name) = &turn.tool_name {
            tool_name = name.clone();
        }
        if let Some(id) = &turn.tool_call_id {
            tool_call_id = id.clone();
        }
        result_text = turn
            .result
            .as_ref()
            .map(value_to_text)
            .or_else(|| match &turn.content {
                Value::Null => None,
                Value::String(s) if s.is_empty() => None,
                other => Some(value_to_text(other)),
            })
            .unwrap_or_else(|| "{}".to_string());
    }

    CortexMessage::tool_result(tool_call_id, tool_name, result_text)
}

/// An assistant turn carrying a `tool_calls` field (OpenAI-style shape).
fn assistant_tool_call_message(turn: &ConversationTurn) -> CortexMessage {
    let text = turn
        .content_text()
        .filter(|s| !s.is_empty())
        .unwrap_or(TOOL_CALL_PLACEHOLDER);

    let mut message = CortexMessage::assistant()
        .with_content(text)
        .with_text_block(text);

    let calls = turn
        .tool_calls
        .as_ref()
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    for call in &calls {
        let id = call
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let name = call
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let input = call
            .get("arguments")
            .or_else(|| call.get("input"))
            .cloned()
            .unwrap_or_else(|| json!({}));
        message = message.with_tool_use(id, name, input);
    }

    message
}

/// A user, assistant or system turn with plain text or a mixed block array.
fn plain_message(turn: &ConversationTurn) -> CortexMessage {
    let mut message = match turn.role {
        Role::Assistant | Role::System => CortexMessage::assistant(),
        _ => CortexMessage::user(),
    };

    let mut text = String::new();
    match &turn.content {
        Value::String(s) => {
            text = s.clone();
            message = message.with_text_block(s.clone());
        }
        Value::Array(blocks) => {
            for block in blocks {
                match block.get("type").and_then(Value::as_str) {
                    Some("text") => {
                        let t = block.get("text").and_then(Value::as_str).unwrap_or("");
                        text.push_str(t);
                        message = message.with_text_block(t);
                    }
                    Some("tool-call") => {
                        let id = block
                            .get("toolCallId")
                            .and_then(Value::as_str)
                            .unwrap_or_default();
                        let name = block
                            .get("toolName")
                            .and_then(Value::as_str)
                            .unwrap_or_default();
                        let args = block.get("args").cloned().unwrap_or_else(|| json!({}));
                        message = message.with_tool_use(id, name, args);
                    }
                    _ => {}
                }
            }
        }
        _ => {
            text = EMPTY_CONTENT_PLACEHOLDER.to_string();
            message = message.with_text_block(EMPTY_CONTENT_PLACEHOLDER);
        }
    }

    if text.is_empty() {
        text = EMPTY_CONTENT_PLACEHOLDER.to_string();
    }

    message.with_content(text)
}

/// Convert duck-typed client tool declarations into Cortex tool specs.
///
/// No declaration is ever dropped: a nameless tool gets a synthesized unique
/// name and a schemaless tool gets an empty object schema. Caller-supplied
/// names are passed through as-is, duplicates included.
pub fn tools_to_cortex_spec(tools: &[Value]) -> Vec<CortexToolSpec> {
    tools
        .iter()
        .map(|decl| {
            let name = lookup(decl, NAME_FIELDS)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| {
                    let generated = synthesize_tool_name();
                    warn!(name = %generated, "tool declaration has no name, synthesizing one");
                    generated
                });

            let mut input_schema = lookup(decl, SCHEMA_FIELDS)
                .cloned()
                .unwrap_or_else(|| json!({}));
            // One calling convention wraps the schema in a jsonSchema layer
            if let Some(inner) = input_schema.get("jsonSchema") {
                input_schema = inner.clone();
            }

            let description = decl
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();

            Tool::new(name, description, input_schema).into()
        })
        .collect()
}

/// Resolve the first populated field from a prioritized list.
fn lookup<'a>(decl: &'a Value, fields: &[&str]) -> Option<&'a Value> {
    fields
        .iter()
        .find_map(|field| decl.get(*field))
        .filter(|v| !v.is_null())
}

fn synthesize_tool_name() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("tool_{}", &id[..9])
}

/// Stringify a tool result value; strings pass through unquoted.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
