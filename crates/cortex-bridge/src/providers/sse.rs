//! Assembles one logical completion out of the Cortex event stream.
//!
//! The backend replies with `data: {json}` lines. A single tool call's
//! argument JSON may be fragmented across many events, and the same tool
//! call can surface in three shapes: directly on the delta
//! (`delta.type == "tool_use"`), nested under a `content_list` entry's
//! `tool_use` object, or as bare `tool_use_id`/`name` fields on a
//! `content_list` entry (the call's initial declaration). All three are
//! honored; whichever arrives feeds the same accumulator.

use serde_json::{json, Value};
use tracing::warn;

use super::base::{CompletedToolCall, Completion};
use crate::errors::{BridgeError, BridgeResult};

const DATA_PREFIX: &str = "data: ";

/// The single in-flight tool call being pieced together during assembly.
///
/// Replies are assumed to carry at most one tool call. If the backend ever
/// interleaves several, the fragments land in this one accumulator with
/// last-write-wins id/name and a warning; see `set_id`.
#[derive(Debug, Default)]
struct PendingToolCall {
    id: Option<String>,
    name: Option<String>,
    input_buffer: String,
}

impl PendingToolCall {
    fn set_id(&mut self, id: &str) {
        if let Some(existing) = &self.id {
            if existing != id {
                warn!(
                    previous = %existing,
                    next = %id,
                    "reply carries more than one tool call id; keeping the most recent"
                );
            }
        }
        self.id = Some(id.to_string());
    }

    fn set_name(&mut self, name: &str) {
        self.name = Some(name.to_string());
    }

    /// Capture id/name and append the input fragment from any of the
    /// tool-use shapes. Non-string input is stringified before appending so
    /// the buffer stays one contiguous JSON text.
    fn absorb(&mut self, fragment: &Value) {
        if let Some(id) = fragment.get("tool_use_id").and_then(Value::as_str) {
            self.set_id(id);
        }
        if let Some(name) = fragment.get("name").and_then(Value::as_str) {
            self.set_name(name);
        }
        match fragment.get("input") {
            Some(Value::String(s)) => self.input_buffer.push_str(s),
            Some(Value::Null) | None => {}
            Some(other) => self.input_buffer.push_str(&other.to_string()),
        }
    }

    fn finalize(self) -> Option<CompletedToolCall> {
        let id = self.id?;
        let name = self.name?;
        let input = match serde_json::from_str(&self.input_buffer) {
            Ok(value) => value,
            Err(_) => {
                warn!(tool = %name, "tool call input is not valid JSON, passing it through raw");
                Value::String(self.input_buffer)
            }
        };
        Some(CompletedToolCall { id, name, input })
    }
}

/// Parse the full response body into one aggregated completion.
///
/// Undecodable event lines are dropped, not fatal. A body with no event
/// lines is treated as the degenerate non-streaming shape when it is a JSON
/// object, and as an empty completion otherwise.
pub fn parse_completion_body(body: &str) -> BridgeResult<Completion> {
    let events = split_events(body);
    if events.is_empty() {
        if body.trim_start().starts_with('{') {
            return parse_single_object(body);
        }
        return Ok(Completion::default());
    }

    let mut text = String::new();
    let mut pending = PendingToolCall::default();

    for event in &events {
        // Some transports nest the event under a `data` field
        let data = event.get("data").unwrap_or(event);
        let Some(choices) = data.get("choices").and_then(Value::as_array) else {
            continue;
        };

        for choice in choices {
            let Some(delta) = choice.get("delta") else {
                continue;
            };

            let delta_is_tool_use = delta.get("type").and_then(Value::as_str) == Some("tool_use");
            if delta_is_tool_use {
                pending.absorb(delta);
            }

            let Some(content_list) = delta.get("content_list").and_then(Value::as_array) else {
                continue;
            };
            for entry in content_list {
                match entry.get("type").and_then(Value::as_str) {
                    Some("text") => {
                        text.push_str(entry.get("text").and_then(Value::as_str).unwrap_or(""));
                    }
                    Some("tool_use") => {
                        let tool_use = entry.get("tool_use").cloned().unwrap_or_else(|| json!({}));
                        pending.absorb(&tool_use);
                    }
                    _ => {
                        if entry.get("input").is_some() && delta_is_tool_use {
                            // Already absorbed from the delta itself
                            continue;
                        }
                        // Initial declaration shape: bare id/name, no input
                        if let Some(id) = entry.get("tool_use_id").and_then(Value::as_str) {
                            pending.set_id(id);
                        }
                        if let Some(name) = entry.get("name").and_then(Value::as_str) {
                            pending.set_name(name);
                        }
                    }
                }
            }
        }
    }

    let tool_calls = pending.finalize().into_iter().collect();
    Ok(Completion { text, tool_calls })
}

fn split_events(body: &str) -> Vec<Value> {
    body.lines()
        .filter_map(|line| line.strip_prefix(DATA_PREFIX))
        .map(str::trim)
        .filter(|payload| !payload.is_empty() && *payload != "[DONE]")
        .filter_map(|payload| match serde_json::from_str::<Value>(payload) {
            Ok(event) => Some(event),
            Err(err) => {
                warn!(%err, "dropping undecodable event line");
                None
            }
        })
        .collect()
}

/// Degenerate non-streaming body: text and tool calls live in top-level
/// fields of a single JSON object.
fn parse_single_object(body: &str) -> BridgeResult<Completion> {
    let value: Value =
        serde_json::from_str(body).map_err(|err| BridgeError::Payload(err.to_string()))?;

    let text = value
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    let tool_calls = value
        .get("tool_calls")
        .and_then(Value::as_array)
        .map(|calls| {
            calls
                .iter()
                .filter_map(|call| {
                    Some(CompletedToolCall {
                        id: call.get("id")?.as_str()?.to_string(),
                        name: call.get("name")?.as_str()?.to_string(),
                        input: call.get("input").cloned().unwrap_or(Value::Null),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(Completion { text, tool_calls })
}
