use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },

    #[error(transparent)]
    Other(#[from] config::ConfigError),
}

/// Map a dotted settings path to the environment variable that supplies it.
pub fn to_env_var(field: &str) -> String {
    format!("BRIDGE_{}", field.replace('.', "__").to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_env_var() {
        assert_eq!(to_env_var("cortex.account"), "BRIDGE_CORTEX__ACCOUNT");
        assert_eq!(to_env_var("token"), "BRIDGE_TOKEN");
    }
}
