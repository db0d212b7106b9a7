//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the multiplexer.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the agent multiplexer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MuxConfig {
    /// Path prefix all agents are mounted under (e.g., "/api/agents").
    pub base_path: String,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,

    /// Agents reachable through the multiplexer.
    pub agents: Vec<AgentConfig>,
}

impl Default for MuxConfig {
    fn default() -> Self {
        Self {
            base_path: "/api/agents".to_string(),
            listener: ListenerConfig::default(),
            timeouts: TimeoutConfig::default(),
            limits: LimitsConfig::default(),
            observability: ObservabilityConfig::default(),
            admin: AdminConfig::default(),
            agents: Vec::new(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// A remote agent mounted under `base_path/segment`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AgentConfig {
    /// Routing segment (e.g., "uppercaser").
    pub segment: String,

    /// Agent base URL (e.g., "http://127.0.0.1:9001").
    #[serde(default)]
    pub upstream: Option<String>,

    /// JSON-RPC method renames. The built-in default applies when absent.
    #[serde(default)]
    pub method_map: Option<HashMap<String, String>>,
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
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

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum JSON-RPC body size read for method mapping, in bytes.
    pub max_body_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// Admin API bind address. Keep it on loopback.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: MuxConfig = toml::from_str("").unwrap();
        assert_eq!(config.base_path, "/api/agents");
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.limits.max_body_size, 2 * 1024 * 1024);
        assert!(config.agents.is_empty());
    }

    #[test]
    fn test_agents_table() {
        let config: MuxConfig = toml::from_str(
            r#"
            base_path = "/agents"

            [observability]
            log_format = "json"

            [[agents]]
            segment = "reverser"
            upstream = "http://127.0.0.1:9000"

            [[agents]]
            segment = "uppercaser"
            upstream = "http://127.0.0.1:9001"
            method_map = { "message/send" = "tasks/send" }
            "#,
        )
        .unwrap();

        assert_eq!(config.base_path, "/agents");
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.agents.len(), 2);
        assert!(config.agents[0].method_map.is_none());
        let map = config.agents[1].method_map.as_ref().unwrap();
        assert_eq!(map.get("message/send").map(String::as_str), Some("tasks/send"));
    }
}
