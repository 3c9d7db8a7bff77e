use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::{
    extract::State,
    http::{self, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use cortex_bridge::models::content::ConversationTurn;
use cortex_bridge::providers::base::{Completion, CompletionProvider};
use cortex_bridge::providers::cortex::CortexProvider;
use cortex_bridge::providers::utils::{tools_to_cortex_spec, turns_to_cortex_spec};
use futures::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, warn};

use crate::state::AppState;

// Types matching the incoming JSON structure
#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    messages: Vec<ConversationTurn>,
    #[serde(default)]
    system: Option<String>,
    #[serde(default)]
    tools: Option<Vec<Value>>,
}

/// Response whose body is the framed data stream protocol the client's
/// `useChat` hook consumes.
struct DataStreamResponse {
    stream: ReceiverStream<String>,
}

impl DataStreamResponse {
    fn new(rx: mpsc::Receiver<String>) -> Self {
        Self {
            stream: ReceiverStream::new(rx),
        }
    }
}

impl Stream for DataStreamResponse {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match Pin::new(&mut self.stream).poll_next(cx) {
            Poll::Ready(Some(frame)) => Poll::Ready(Some(Ok(Bytes::from(frame)))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl IntoResponse for DataStreamResponse {
    fn into_response(self) -> axum::response::Response {
        let body = axum::body::Body::from_stream(self);
        http::Response::builder()
            .header("Content-Type", "text/plain; charset=utf-8")
            .header("Cache-Control", "no-cache")
            .header("x-vercel-ai-data-stream", "v1")
            .body(body)
            .unwrap()
    }
}

// Frame formatting for the data stream protocol
struct ProtocolFormatter;

impl ProtocolFormatter {
    fn format_text(text: &str) -> String {
        // Text frames start with "0:", content is a JSON string
        let encoded_text = serde_json::to_string(text).unwrap_or_else(|_| String::from("\"\""));
        format!("0:{}\n", encoded_text)
    }

    fn format_tool_call(id: &str, name: &str, args: &Value) -> String {
        // Tool call frames start with "9:"
        let tool_call = json!({
            "toolCallId": id,
            "toolName": name,
            "args": args,
        });
        format!("9:{}\n", tool_call)
    }

    fn format_finish(reason: &str) -> String {
        // Finish frames start with "d:"
        let finish = json!({"finishReason": reason});
        format!("d:{}\n", finish)
    }
}

/// Serialize an aggregated completion into protocol frames. The order is
/// fixed: one text frame when any text exists, then tool call frames, then
/// exactly one finish frame.
fn encode_frames(completion: &Completion) -> Vec<String> {
    let mut frames = Vec::new();

    if !completion.text.is_empty() {
        frames.push(ProtocolFormatter::format_text(&completion.text));
    }

    for call in &completion.tool_calls {
        if call.id.is_empty() || call.name.is_empty() {
            warn!(id = %call.id, name = %call.name, "skipping tool call frame without id or name");
            continue;
        }
        // The client expects args to be an object even when the backend
        // produced no input at all
        let args = match &call.input {
            Value::Null => json!({}),
            Value::String(s) if s.is_empty() => json!({}),
            other => other.clone(),
        };
        frames.push(ProtocolFormatter::format_tool_call(&call.id, &call.name, &args));
    }

    frames.push(ProtocolFormatter::format_finish("stop"));
    frames
}

async fn handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<DataStreamResponse, (StatusCode, Json<Value>)> {
    let system = request
        .system
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);

    let messages = turns_to_cortex_spec(&request.messages, system);
    let tools = tools_to_cortex_spec(request.tools.as_deref().unwrap_or(&[]));

    let provider = CortexProvider::new(state.provider_config.clone(), state.tokens.clone())
        .map_err(internal_error)?;

    // The backend call runs to completion before any frame is written, so a
    // failure here still surfaces as a plain JSON error response.
    let completion = match provider.complete(&messages, &tools).await {
        Ok(completion) => completion,
        Err(e) => {
            error!(error = %e, "chat request failed");
            return Err(internal_error(e));
        }
    };

    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        for frame in encode_frames(&completion) {
            if tx.send(frame).await.is_err() {
                warn!("client disconnected before the stream completed");
                break;
            }
        }
    });

    Ok(DataStreamResponse::new(rx))
}

fn internal_error(e: anyhow::Error) -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": e.to_string()})),
    )
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(handler))
        .with_state(state)
}

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful data analysis assistant. \
You can query structured data, summarize the results, and surface trends worth a \
closer look. Use the available tools when a question calls for real data, and \
explain what the numbers mean in plain language.";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::CortexSettings;
    use axum::body::Body;
    use axum::http::Request;
    use cortex_bridge::providers::base::CompletedToolCall;
    use cortex_bridge::providers::configs::CORTEX_API_PATH;
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion(text: &str, tool_calls: Vec<CompletedToolCall>) -> Completion {
        Completion {
            text: text.to_string(),
            tool_calls,
        }
    }

    #[test]
    fn test_text_only_reply_encodes_two_frames() {
        let frames = encode_frames(&completion("Hello there", vec![]));
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], "0:\"Hello there\"\n");
        assert_eq!(frames[1], "d:{\"finishReason\":\"stop\"}\n");
    }

    #[test]
    fn test_frame_order_text_then_tools_then_finish() {
        let frames = encode_frames(&completion(
            "Let me check.",
            vec![CompletedToolCall {
                id: "toolu_1".to_string(),
                name: "query_data".to_string(),
                input: json!({"query": "totals"}),
            }],
        ));
        assert_eq!(frames.len(), 3);
        assert!(frames[0].starts_with("0:"));
        assert!(frames[1].starts_with("9:"));
        assert!(frames[2].starts_with("d:"));

        let call: Value = serde_json::from_str(&frames[1][2..]).unwrap();
        assert_eq!(call["toolCallId"], "toolu_1");
        assert_eq!(call["toolName"], "query_data");
        assert_eq!(call["args"], json!({"query": "totals"}));
    }

    #[test]
    fn test_empty_text_omits_text_frame_but_keeps_finish() {
        let frames = encode_frames(&completion("", vec![]));
        assert_eq!(frames, vec!["d:{\"finishReason\":\"stop\"}\n"]);
    }

    #[test]
    fn test_incomplete_tool_call_is_skipped() {
        let frames = encode_frames(&completion(
            "text",
            vec![CompletedToolCall {
                id: String::new(),
                name: "query_data".to_string(),
                input: json!({}),
            }],
        ));
        assert!(frames.iter().all(|f| !f.starts_with("9:")));
        assert!(frames.last().unwrap().starts_with("d:"));
    }

    #[test]
    fn test_missing_input_becomes_empty_object_args() {
        for input in [Value::Null, Value::String(String::new())] {
            let frames = encode_frames(&completion(
                "",
                vec![CompletedToolCall {
                    id: "t".to_string(),
                    name: "n".to_string(),
                    input,
                }],
            ));
            let call: Value = serde_json::from_str(&frames[0][2..]).unwrap();
            assert_eq!(call["args"], json!({}));
        }
    }

    #[test]
    fn test_text_frame_escapes_newlines() {
        let frames = encode_frames(&completion("line one\nline two", vec![]));
        assert_eq!(frames[0], "0:\"line one\\nline two\"\n");
    }

    fn test_state(server: &MockServer) -> AppState {
        AppState::new(CortexSettings {
            account: "test-account".to_string(),
            host: Some(server.uri()),
            spcs: true,
            model: "claude-3-5-sonnet".to_string(),
            max_tokens: 4096,
            top_p: 1.0,
            token: "test_token".to_string(),
        })
    }

    fn chat_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_chat_route_streams_ordered_frames() {
        let mock_server = MockServer::start().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content_list\":[{\"type\":\"text\",\"text\":\"Checking. \"}]}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"type\":\"tool_use\",\"tool_use_id\":\"toolu_1\",\"name\":\"query_data\"}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"type\":\"tool_use\",\"input\":\"{\\\"q\\\":1}\"}}]}\n",
        );
        Mock::given(method("POST"))
            .and(path(CORTEX_API_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&mock_server)
            .await;

        let app = routes(test_state(&mock_server));
        let response = app
            .oneshot(chat_request(
                json!({"messages": [{"role": "user", "content": "hi"}]}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "text/plain; charset=utf-8"
        );
        assert_eq!(response.headers()["x-vercel-ai-data-stream"], "v1");

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "0:\"Checking. \"");
        assert!(lines[1].starts_with("9:"));
        assert_eq!(lines[2], "d:{\"finishReason\":\"stop\"}");
    }

    #[tokio::test]
    async fn test_backend_failure_is_json_error_not_frames() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CORTEX_API_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_string("rate limited"))
            .mount(&mock_server)
            .await;

        let app = routes(test_state(&mock_server));
        let response = app
            .oneshot(chat_request(
                json!({"messages": [{"role": "user", "content": "hi"}]}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let payload: Value = serde_json::from_slice(&bytes).unwrap();
        let message = payload["error"].as_str().unwrap();
        assert!(message.contains("500 - rate limited"));
        assert!(!message.starts_with("0:"));
    }
}
