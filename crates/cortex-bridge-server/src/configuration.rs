use std::net::{IpAddr, SocketAddr};

use config::{Config, Environment};
use cortex_bridge::providers::base::StaticTokenProvider;
use cortex_bridge::providers::configs::{
    CortexProviderConfig, DeploymentMode, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TOP_P,
};
use serde::Deserialize;

use crate::error::{to_env_var, ConfigError};

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|e| ConfigError::Other(config::ConfigError::Message(format!("{e}"))))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Deserialize)]
pub struct CortexSettings {
    pub account: String,
    /// Explicit backend origin, used in SPCS deployments. A bare hostname is
    /// promoted to https.
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub spcs: bool,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: i32,
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    /// Pre-minted auth token. Minting and refresh happen outside this
    /// process.
    pub token: String,
}

impl CortexSettings {
    pub fn into_parts(self) -> (CortexProviderConfig, StaticTokenProvider) {
        let host = self.host.map(|h| {
            if h.starts_with("http://") || h.starts_with("https://") {
                h
            } else {
                format!("https://{h}")
            }
        });
        let config = CortexProviderConfig {
            account: self.account,
            host,
            deployment: if self.spcs {
                DeploymentMode::Spcs
            } else {
                DeploymentMode::Local
            },
            model: self.model,
            max_tokens: self.max_tokens,
            top_p: self.top_p,
        };
        (config, StaticTokenProvider(self.token))
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub cortex: CortexSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            .set_default("cortex.model", default_model())?
            // BRIDGE_SERVER__PORT, BRIDGE_CORTEX__ACCOUNT, and so on
            .add_source(
                Environment::with_prefix("BRIDGE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize().map_err(|e| match e {
            config::ConfigError::NotFound(field) => ConfigError::MissingEnvVar {
                env_var: to_env_var(&field),
            },
            other => ConfigError::Other(other),
        })
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_max_tokens() -> i32 {
    DEFAULT_MAX_TOKENS
}

fn default_top_p() -> f64 {
    DEFAULT_TOP_P
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clear_bridge_env() {
        for (key, _) in env::vars() {
            if key.starts_with("BRIDGE_") {
                env::remove_var(key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_settings_from_minimal_env() {
        clear_bridge_env();
        env::set_var("BRIDGE_CORTEX__ACCOUNT", "my-account");
        env::set_var("BRIDGE_CORTEX__TOKEN", "secret");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.cortex.account, "my-account");
        assert_eq!(settings.cortex.model, DEFAULT_MODEL);
        assert_eq!(settings.cortex.max_tokens, DEFAULT_MAX_TOKENS);
        assert!(!settings.cortex.spcs);

        clear_bridge_env();
    }

    #[test]
    #[serial]
    fn test_settings_overrides() {
        clear_bridge_env();
        env::set_var("BRIDGE_CORTEX__ACCOUNT", "my-account");
        env::set_var("BRIDGE_CORTEX__TOKEN", "secret");
        env::set_var("BRIDGE_CORTEX__SPCS", "true");
        env::set_var("BRIDGE_CORTEX__HOST", "cortex.internal:9000");
        env::set_var("BRIDGE_CORTEX__MODEL", "claude-3-7-sonnet");
        env::set_var("BRIDGE_SERVER__PORT", "8080");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.port, 8080);
        assert!(settings.cortex.spcs);
        assert_eq!(settings.cortex.model, "claude-3-7-sonnet");

        let (config, tokens) = settings.cortex.into_parts();
        assert_eq!(config.host.as_deref(), Some("https://cortex.internal:9000"));
        assert_eq!(config.deployment, DeploymentMode::Spcs);
        assert_eq!(tokens.0, "secret");

        clear_bridge_env();
    }

    #[test]
    #[serial]
    fn test_missing_account_is_an_error() {
        clear_bridge_env();
        env::set_var("BRIDGE_CORTEX__TOKEN", "secret");

        assert!(Settings::new().is_err());

        clear_bridge_env();
    }

    #[test]
    fn test_socket_addr() {
        let server = ServerSettings {
            host: "0.0.0.0".to_string(),
            port: 4000,
        };
        assert_eq!(server.socket_addr().unwrap().to_string(), "0.0.0.0:4000");
    }

    #[test]
    fn test_scheme_full_host_kept_verbatim() {
        let settings = CortexSettings {
            account: "acct".to_string(),
            host: Some("http://localhost:9999".to_string()),
            spcs: true,
            model: default_model(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            token: "t".to_string(),
        };
        let (config, _) = settings.into_parts();
        assert_eq!(config.host.as_deref(), Some("http://localhost:9999"));
    }
}
