use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::message::CortexMessage;
use crate::models::tool::CortexToolSpec;

/// A tool invocation fully assembled from a backend reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedToolCall {
    pub id: String,
    pub name: String,
    /// Decoded argument object, or the raw accumulated string when the
    /// arguments never became valid JSON.
    pub input: Value,
}

/// The single logical reply computed from one backend call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub tool_calls: Vec<CompletedToolCall>,
}

/// Mints bearer tokens for the inference backend.
///
/// Token generation (key-pair JWT signing or SPCS OAuth exchange) lives
/// outside the bridge; this is the seam it is consumed through.
pub trait AuthTokenProvider: Send + Sync {
    fn generate_auth_token(&self) -> Result<String>;
}

/// Carries an externally minted token unchanged.
pub struct StaticTokenProvider(pub String);

impl AuthTokenProvider for StaticTokenProvider {
    fn generate_auth_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Base trait for inference backends.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Send one conversation and return the aggregated reply
    async fn complete(
        &self,
        messages: &[CortexMessage],
        tools: &[CortexToolSpec],
    ) -> Result<Completion>;
}
