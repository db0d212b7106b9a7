//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and agent upstream URLs
//! - Detect duplicate agent segments
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: MuxConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system
//! - Segments containing `/` are accepted; the first path component is what routes

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::MuxConfig;
use crate::routing::normalize_segment;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("agents[{index}]: segment must not be empty")]
    EmptySegment { index: usize },

    #[error("agents[{index}] '{segment}': duplicate segment")]
    DuplicateSegment { index: usize, segment: String },

    #[error("agents[{index}] '{segment}': missing upstream")]
    MissingUpstream { index: usize, segment: String },

    #[error("agents[{index}] '{segment}': invalid upstream '{upstream}': {reason}")]
    InvalidUpstream {
        index: usize,
        segment: String,
        upstream: String,
        reason: String,
    },

    #[error("agents[{index}] '{segment}': method_map entries must not be empty")]
    EmptyMethodName { index: usize, segment: String },

    #[error("limits.max_body_size must be greater than zero")]
    ZeroBodyLimit,

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,
}

/// Check an upstream base URL.
pub fn validate_upstream(upstream: &str) -> Result<Url, String> {
    let url = Url::parse(upstream).map_err(|e| e.to_string())?;
    if url.scheme() != "http" {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    Ok(url)
}

/// Validate a parsed configuration.
pub fn validate_config(config: &MuxConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.admin.enabled && config.admin.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "admin.bind_address",
            value: config.admin.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }
    if config.limits.max_body_size == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    let mut seen = HashSet::new();
    for (index, agent) in config.agents.iter().enumerate() {
        let segment = normalize_segment(&agent.segment);
        if segment.is_empty() {
            errors.push(ValidationError::EmptySegment { index });
            continue;
        }
        if !seen.insert(segment) {
            errors.push(ValidationError::DuplicateSegment {
                index,
                segment: segment.to_string(),
            });
        }

        match agent.upstream.as_deref() {
            None => errors.push(ValidationError::MissingUpstream {
                index,
                segment: segment.to_string(),
            }),
            Some(upstream) => {
                if let Err(reason) = validate_upstream(upstream) {
                    errors.push(ValidationError::InvalidUpstream {
                        index,
                        segment: segment.to_string(),
                        upstream: upstream.to_string(),
                        reason,
                    });
                }
            }
        }

        if let Some(map) = &agent.method_map {
            if map.iter().any(|(from, to)| from.is_empty() || to.is_empty()) {
                errors.push(ValidationError::EmptyMethodName {
                    index,
                    segment: segment.to_string(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
