use serde::{Deserialize, Serialize};
use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug, Clone, Deserialize, Serialize)]
pub enum BridgeError {
    #[error("Cortex API error: {status} - {body}")]
    Backend { status: u16, body: String },

    #[error("Failed to obtain auth token: {0}")]
    Auth(String),

    #[error("Error parsing response: {0}")]
    Payload(String),
}

pub type BridgeResult<T> = Result<T, BridgeError>;
