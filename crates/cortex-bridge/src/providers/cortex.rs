use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, error, info};

use super::base::{AuthTokenProvider, Completion, CompletionProvider};
use super::configs::CortexProviderConfig;
use super::sse;
use crate::errors::BridgeError;
use crate::models::message::CortexMessage;
use crate::models::tool::CortexToolSpec;

const API_TIMEOUT: Duration = Duration::from_secs(60);
const USER_AGENT: &str = concat!("cortex-bridge/", env!("CARGO_PKG_VERSION"));

pub struct CortexProvider {
    client: Client,
    config: CortexProviderConfig,
    tokens: Arc<dyn AuthTokenProvider>,
}

impl CortexProvider {
    pub fn new(config: CortexProviderConfig, tokens: Arc<dyn AuthTokenProvider>) -> Result<Self> {
        let client = Client::builder().timeout(API_TIMEOUT).build()?;
        Ok(Self {
            client,
            config,
            tokens,
        })
    }

    fn build_payload(&self, messages: &[CortexMessage], tools: &[CortexToolSpec]) -> Result<Value> {
        let mut payload = json!({
            "model": self.config.model,
            "messages": messages,
            "max_tokens": self.config.max_tokens,
            "top_p": self.config.top_p,
        });
        // The backend treats an empty tools list differently from an absent
        // field, so the key only appears when there is at least one tool.
        if !tools.is_empty() {
            payload["tools"] = serde_json::to_value(tools)?;
        }
        Ok(payload)
    }

    /// POST the payload and return the raw body. The whole body is read
    /// before returning even when the transport streams events.
    async fn post(&self, payload: &Value) -> Result<String> {
        let url = self.config.endpoint_url();
        let token = self
            .tokens
            .generate_auth_token()
            .map_err(|e| BridgeError::Auth(e.to_string()))?;

        debug!(%url, "sending completion request");
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {token}"))
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .header(
                "X-Snowflake-Authorization-Token-Type",
                self.config.token_type_header(),
            )
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body_prefix = %body.chars().take(200).collect::<String>(), "cortex request failed");
            return Err(BridgeError::Backend {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl CompletionProvider for CortexProvider {
    async fn complete(
        &self,
        messages: &[CortexMessage],
        tools: &[CortexToolSpec],
    ) -> Result<Completion> {
        let payload = self.build_payload(messages, tools)?;
        let body = self.post(&payload).await?;
        let completion = sse::parse_completion_body(&body)?;
        info!(
            text_len = completion.text.len(),
            tool_calls = completion.tool_calls.len(),
            "assembled completion"
        );
        Ok(completion)
    }
}
