//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (periods and timeouts > 0)
//! - Check that addresses and uris parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DaemonConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use crate::config::schema::DaemonConfig;

/// A single semantic problem in a config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &DaemonConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Some(endpoint) = config.node.endpoint() {
        if let Err(e) = endpoint.parse_uri() {
            errors.push(ValidationError::new("node.uri", format!("invalid uri: {}", e)));
        }
    }

    let polling = &config.polling;
    for (field, value) in [
        ("polling.local_refresh_ms", polling.local_refresh_ms),
        ("polling.remote_refresh_ms", polling.remote_refresh_ms),
        ("polling.probe_timeout_ms", polling.probe_timeout_ms),
        ("polling.error_log_window_secs", polling.error_log_window_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than 0"));
        }
    }
    if polling.failures_before_switch == 0 {
        errors.push(ValidationError::new(
            "polling.failures_before_switch",
            "must be greater than 0",
        ));
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("invalid socket address '{}'", observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
