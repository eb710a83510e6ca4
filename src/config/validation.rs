//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check the declared route table compiles
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: FrontConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::FrontConfig;
use crate::routing::pattern::RoutePattern;
use crate::routing::route::RouteMethod;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Dotted path of the offending setting, e.g. `server.bind_address`.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &FrontConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let server = &config.server;
    if server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("'{}' is not a socket address", server.bind_address),
        ));
    }
    let context = &server.context_path;
    if !context.is_empty() && (!context.starts_with('/') || context.ends_with('/')) {
        errors.push(ValidationError::new(
            "server.context_path",
            "must be empty or start with '/' without a trailing '/'",
        ));
    }
    if server.request_timeout_secs == 0 {
        errors.push(ValidationError::new("server.request_timeout_secs", "must be > 0"));
    }
    if server.max_body_size == 0 {
        errors.push(ValidationError::new("server.max_body_size", "must be > 0"));
    }

    let session = &config.session;
    if session.cookie_name.is_empty()
        || !session
            .cookie_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        errors.push(ValidationError::new(
            "session.cookie_name",
            "must be non-empty and use only [A-Za-z0-9_-]",
        ));
    }
    if session.purge_interval_secs == 0 {
        errors.push(ValidationError::new("session.purge_interval_secs", "must be > 0"));
    }

    let security = &config.security;
    for (field, value) in [
        ("security.auth_attribute", &security.auth_attribute),
        ("security.role_attribute", &security.role_attribute),
    ] {
        if value.is_empty() {
            errors.push(ValidationError::new(field, "must not be empty"));
        }
    }
    for (field, value) in [
        ("security.login_url", &security.login_url),
        ("security.access_denied_url", &security.access_denied_url),
    ] {
        if !value.starts_with('/') {
            errors.push(ValidationError::new(field, "must start with '/'"));
        }
    }

    if !matches!(config.routing.binding_error_status, 400 | 500) {
        errors.push(ValidationError::new(
            "routing.binding_error_status",
            format!("{} is not 400 or 500", config.routing.binding_error_status),
        ));
    }

    let observability = &config.observability;
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", observability.metrics_address),
        ));
    }

    for (index, route) in config.routes.iter().enumerate() {
        let field = format!("routes[{index}]");
        if let Err(err) = RoutePattern::compile(&route.pattern) {
            errors.push(ValidationError::new(format!("{field}.pattern"), err.to_string()));
        }
        if let Err(err) = route.method.parse::<RouteMethod>() {
            errors.push(ValidationError::new(format!("{field}.method"), err.to_string()));
        }
        if route.handler.trim().is_empty() {
            errors.push(ValidationError::new(format!("{field}.handler"), "must not be empty"));
        }
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
    use crate::config::schema::RouteConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&FrontConfig::default()), Ok(()));
    }

    #[test]
    fn test_all_problems_reported() {
        let mut config = FrontConfig::default();
        config.server.bind_address = "nowhere".into();
        config.server.context_path = "app/".into();
        config.session.cookie_name = "bad cookie".into();
        config.security.login_url = "login".into();
        config.routes.push(RouteConfig {
            pattern: "/users/{id".into(),
            method: "FETCH".into(),
            handler: String::new(),
        });

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "server.bind_address",
                "server.context_path",
                "session.cookie_name",
                "security.login_url",
                "routes[0].pattern",
                "routes[0].method",
                "routes[0].handler",
            ]
        );
    }
}
