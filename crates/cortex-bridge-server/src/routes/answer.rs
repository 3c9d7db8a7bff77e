//! The interactive tool channel. Some tool calls are answered by a person
//! through a panel the client renders: after receiving the tool call frame,
//! the client's tool execution layer long-polls `/api/tools/wait` for the
//! result, and the panel delivers it through `/api/tools/answer`. The two
//! requests meet in the id-keyed registry held in `AppState`.

use std::time::Duration;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::state::AppState;

/// How long a wait request holds on before the panel is considered
/// abandoned.
const ANSWER_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Deserialize)]
struct ToolWait {
    #[serde(rename = "toolCallId")]
    tool_call_id: String,
}

#[derive(Debug, Deserialize)]
struct ToolAnswer {
    #[serde(rename = "toolCallId")]
    tool_call_id: String,
    result: Value,
}

/// Register a waiter for an interactive tool call and block until its
/// answer arrives.
async fn wait_handler(
    State(state): State<AppState>,
    Json(wait): Json<ToolWait>,
) -> Result<Json<Value>, StatusCode> {
    let rx = state.answers.register(&wait.tool_call_id);

    match tokio::time::timeout(ANSWER_TIMEOUT, rx).await {
        Ok(Ok(result)) => Ok(Json(json!({
            "toolCallId": wait.tool_call_id,
            "result": result,
        }))),
        // The sender was dropped, meaning a newer wait request took over
        // this id
        Ok(Err(_)) => Err(StatusCode::CONFLICT),
        Err(_) => {
            warn!(tool_call_id = %wait.tool_call_id, "interactive tool call was never answered");
            state.answers.cancel(&wait.tool_call_id);
            Err(StatusCode::REQUEST_TIMEOUT)
        }
    }
}

/// Accept a person's answer for an in-flight interactive tool call.
async fn answer_handler(
    State(state): State<AppState>,
    Json(answer): Json<ToolAnswer>,
) -> Result<Json<Value>, StatusCode> {
    if state.answers.resolve(&answer.tool_call_id, answer.result) {
        Ok(Json(json!({"ok": true})))
    } else {
        warn!(tool_call_id = %answer.tool_call_id, "tool answer arrived with no matching waiter");
        Err(StatusCode::NOT_FOUND)
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/tools/wait", post(wait_handler))
        .route("/api/tools/answer", post(answer_handler))
        .with_state(state)
}
