//! Semantic validation, separate from the syntactic checks serde does.

use std::net::SocketAddr;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single failed check, with the config path that caused it.
#[derive(Debug)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn err(field: impl Into<String>, message: impl Into<String>) -> ValidationError {
    ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

fn check_bind_address(errors: &mut Vec<ValidationError>, field: &str, addr: &str) {
    if addr.parse::<SocketAddr>().is_err() {
        errors.push(err(field, format!("invalid bind address {addr:?}")));
    }
}

/// Validate a parsed configuration. Returns every problem found, not just
/// the first one.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_bind_address(
        &mut errors,
        "listener.bind_address",
        &config.listener.bind_address,
    );

    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.is_empty() {
            errors.push(err("listener.tls.cert_path", "must not be empty"));
        }
        if tls.key_path.is_empty() {
            errors.push(err("listener.tls.key_path", "must not be empty"));
        }
    }

    if let Some(name) = &config.listener.rate_limit {
        if !config.rate_limits.contains_key(name) {
            errors.push(err(
                "listener.rate_limit",
                format!("unknown rate limit {name:?}"),
            ));
        }
    }

    for (i, route) in config.routes.iter().enumerate() {
        let field = format!("routes[{i}]");
        if route.name.is_empty() {
            errors.push(err(format!("{field}.name"), "must not be empty"));
        }
        match Url::parse(&route.target) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    errors.push(err(
                        format!("{field}.target"),
                        format!("unsupported scheme {:?}", url.scheme()),
                    ));
                } else if url.host_str().is_none() {
                    errors.push(err(format!("{field}.target"), "missing host"));
                }
            }
            Err(e) => {
                errors.push(err(format!("{field}.target"), format!("invalid URL: {e}")));
            }
        }
    }

    for (i, fwd) in config.forwards.iter().enumerate() {
        let field = format!("forwards[{i}]");
        check_bind_address(&mut errors, &format!("{field}.bind_address"), &fwd.bind_address);
        if fwd.to.is_empty() {
            errors.push(err(format!("{field}.to"), "must not be empty"));
        }
        if let Some(name) = &fwd.rate_limit {
            if !config.rate_limits.contains_key(name) {
                errors.push(err(
                    format!("{field}.rate_limit"),
                    format!("unknown rate limit {name:?}"),
                ));
            }
        }
    }

    if config.admin.enabled {
        check_bind_address(
            &mut errors,
            "admin.bind_address",
            &config.admin.bind_address,
        );
        if config.admin.api_key.is_empty() {
            errors.push(err("admin.api_key", "must not be empty"));
        }
    }

    if config.observability.metrics_enabled {
        check_bind_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{ForwardConfig, RouteConfig};

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn rejects_bad_target_and_unknown_limiter() {
        let mut config = GatewayConfig::default();
        config.routes.push(RouteConfig {
            name: "api".into(),
            host: None,
            path_prefix: Some("/api".into()),
            target: "not a url".into(),
        });
        config.listener.rate_limit = Some("missing".into());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.field == "routes[0].target"));
        assert!(errors.iter().any(|e| e.field == "listener.rate_limit"));
    }

    #[test]
    fn rejects_bad_forward() {
        let mut config = GatewayConfig::default();
        config.forwards.push(ForwardConfig {
            bind_address: "nope".into(),
            to: String::new(),
            ..Default::default()
        });
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "forwards[0].bind_address"));
        assert!(errors.iter().any(|e| e.field == "forwards[0].to"));
    }
}
