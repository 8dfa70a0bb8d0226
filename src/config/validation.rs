//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, addresses parse)
//! - Check that TLS material and a docs seed actually exist
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::ServerConfig;

/// One failed semantic check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);

    if let Some(tls) = &config.listener.tls {
        check_address(&mut errors, "listener.tls.bind_address", &tls.bind_address);
        if !tls.cert_path.exists() {
            errors.push(ValidationError::new(
                "listener.tls.cert_path",
                format!("file not found: {}", tls.cert_path.display()),
            ));
        }
        if !tls.key_path.exists() {
            errors.push(ValidationError::new(
                "listener.tls.key_path",
                format!("file not found: {}", tls.key_path.display()),
            ));
        }
        if !tls.only_tls && tls.bind_address == config.listener.bind_address {
            errors.push(ValidationError::new(
                "listener.tls.bind_address",
                "must differ from the plaintext bind address",
            ));
        }
    }

    if config.limits.body_limit_bytes == 0 {
        errors.push(ValidationError::new("limits.body_limit_bytes", "must be greater than 0"));
    }

    if config.session.secret.len() < 16 {
        errors.push(ValidationError::new("session.secret", "must be at least 16 bytes"));
    }
    if config.session.cookie_name.is_empty() {
        errors.push(ValidationError::new("session.cookie_name", "must not be empty"));
    }
    if config.session.ttl_secs == 0 {
        errors.push(ValidationError::new("session.ttl_secs", "must be greater than 0"));
    }
    if config.session.refresh_window_secs >= config.session.ttl_secs {
        errors.push(ValidationError::new(
            "session.refresh_window_secs",
            "must be shorter than session.ttl_secs",
        ));
    }

    if let Some(seed) = &config.docs.seed_path {
        if !seed.exists() {
            errors.push(ValidationError::new(
                "docs.seed_path",
                format!("file not found: {}", seed.display()),
            ));
        }
    }

    if config.observability.metrics_enabled {
        check_address(
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

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(field, format!("invalid socket address '{}'", value)));
    }
}
