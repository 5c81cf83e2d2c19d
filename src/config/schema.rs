//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP(S) listener configuration (bind address, TLS, limiter).
    pub listener: ListenerConfig,

    /// Route definitions mapping requests to upstream targets.
    pub routes: Vec<RouteConfig>,

    /// Raw TCP forwards.
    pub forwards: Vec<ForwardConfig>,

    /// Named rate limits, referenced by listeners and forwards.
    pub rate_limits: BTreeMap<String, RateLimitConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,

    /// Name of the rate limit applied to incoming requests, if any.
    pub rate_limit: Option<String>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
            max_connections: 10_000,
            rate_limit: None,
        }
    }
}

/// TLS configuration for a listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Route configuration mapping requests to an upstream target.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Host header to match (exact match, case-insensitive).
    pub host: Option<String>,

    /// Path prefix to match. Longer prefixes win over shorter ones.
    pub path_prefix: Option<String>,

    /// Target base URL to forward to (e.g., "http://127.0.0.1:3000/").
    pub target: String,
}

/// Raw TCP forward configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwardConfig {
    /// Bind address to accept connections on.
    pub bind_address: String,

    /// Destination address (host:port) to forward to.
    pub to: String,

    /// Maximum concurrent forwarded connections.
    pub max_connections: usize,

    /// Name of the rate limit applied to accepted connections, if any.
    pub rate_limit: Option<String>,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            bind_address: String::new(),
            to: String::new(),
            max_connections: 1_000,
            rate_limit: None,
        }
    }
}

/// One named rate limit: requests per period per source address, with a
/// bound on how many addresses are tracked.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests admitted per period. Zero denies everything.
    pub requests: u64,

    /// Window length in milliseconds.
    pub period_ms: u64,

    /// Maximum tracked addresses per counter; 0 means the built-in default.
    pub size: usize,

    /// Optional overrides for the IPv6 prefix counters.
    pub ipv6_48: Option<RateOverride>,
    pub ipv6_56: Option<RateOverride>,
    pub ipv6_64: Option<RateOverride>,
}

/// Replacement rate for one IPv6 prefix counter.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateOverride {
    pub requests: u64,
    pub period_ms: u64,
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin endpoint.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin endpoint bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
