//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("server.name is required")]
    MissingServerName,
    #[error("kernel.queue_capacity must be at least 1")]
    ZeroQueueCapacity,
    #[error("kernel.client_queue must be at least 1")]
    ZeroClientQueue,
    #[error("server.metrics_port {0} collides with listen.address")]
    MetricsPortCollision(u16),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.name.trim().is_empty() {
        errors.push(ValidationError::MissingServerName);
    }
    if config.kernel.queue_capacity == 0 {
        errors.push(ValidationError::ZeroQueueCapacity);
    }
    if config.kernel.client_queue == 0 {
        errors.push(ValidationError::ZeroClientQueue);
    }

    let metrics_port = config.server.metrics_port;
    if metrics_port != 0 && metrics_port == config.listen.address.port() {
        errors.push(ValidationError::MetricsPortCollision(metrics_port));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
