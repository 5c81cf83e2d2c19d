//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    load_config_str(&content)
}

/// Parse and validate configuration from a TOML string.
pub fn load_config_str(content: &str) -> Result<GatewayConfig, ConfigError> {
    let config: GatewayConfig = toml::from_str(content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_config() {
        let config = load_config_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:8080"
            rate_limit = "public"

            [[routes]]
            name = "api"
            path_prefix = "/api"
            target = "http://127.0.0.1:3000/"

            [[forwards]]
            bind_address = "127.0.0.1:2222"
            to = "10.0.0.2:22"
            rate_limit = "public"

            [rate_limits.public]
            requests = 50
            period_ms = 1000
            size = 4096

            [rate_limits.public.ipv6_48]
            requests = 400
            period_ms = 1000

            [admin]
            enabled = true
            api_key = "sekrit"
            bind_address = "127.0.0.1:8081"
            "#,
        )
        .expect("config parses");

        assert_eq!(config.listener.rate_limit.as_deref(), Some("public"));
        assert_eq!(config.routes.len(), 1);
        assert_eq!(config.forwards[0].to, "10.0.0.2:22");

        let rl = &config.rate_limits["public"];
        assert_eq!(rl.requests, 50);
        assert_eq!(rl.size, 4096);
        assert_eq!(rl.ipv6_48.as_ref().unwrap().requests, 400);
        assert!(rl.ipv6_56.is_none());
    }

    #[test]
    fn validation_failures_surface_in_the_error() {
        let err = load_config_str(
            r#"
            [listener]
            bind_address = "not-an-address"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("listener.bind_address"));
    }
}
