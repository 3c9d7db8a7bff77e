use serde::{Deserialize, Serialize};

pub const CORTEX_API_PATH: &str = "/api/v2/cortex/inference:complete";
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet";
pub const DEFAULT_MAX_TOKENS: i32 = 4096;
pub const DEFAULT_TOP_P: f64 = 1.0;

/// Where the bridge is running, which decides both the endpoint host and the
/// token type the backend expects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    /// Outside Snowflake, authenticating with a key-pair JWT against the
    /// public account host.
    Local,
    /// Inside Snowpark Container Services, using the injected OAuth identity
    /// and the internal host when one is configured.
    Spcs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CortexProviderConfig {
    /// Snowflake account identifier, used to derive the public host
    pub account: String,
    /// Internal origin (scheme included) reachable from SPCS, if any
    pub host: Option<String>,
    pub deployment: DeploymentMode,
    pub model: String,
    pub max_tokens: i32,
    pub top_p: f64,
}

impl CortexProviderConfig {
    pub fn new<S: Into<String>>(account: S) -> Self {
        CortexProviderConfig {
            account: account.into(),
            host: None,
            deployment: DeploymentMode::Local,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            top_p: DEFAULT_TOP_P,
        }
    }

    /// The full inference endpoint URL. The internal host wins only inside
    /// SPCS; everywhere else the public account host is derived.
    pub fn endpoint_url(&self) -> String {
        match (&self.deployment, &self.host) {
            (DeploymentMode::Spcs, Some(host)) => {
                format!("{}{}", host.trim_end_matches('/'), CORTEX_API_PATH)
            }
            _ => format!(
                "https://{}.snowflakecomputing.com{}",
                self.account.to_uppercase(),
                CORTEX_API_PATH
            ),
        }
    }

    /// Value for the `X-Snowflake-Authorization-Token-Type` header.
    pub fn token_type_header(&self) -> &'static str {
        match self.deployment {
            DeploymentMode::Spcs => "OAUTH",
            DeploymentMode::Local => "KEYPAIR_JWT",
        }
    }
}
