//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! front controller. All types derive Serde traits for deserialization from
//! config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the front controller.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct FrontConfig {
    /// Listener and request handling settings.
    pub server: ServerConfig,

    /// Static resource serving.
    pub static_files: StaticFilesConfig,

    pub session: SessionConfig,

    /// Access guard defaults.
    pub security: SecurityConfig,

    /// Route matching and binding behaviour.
    pub routing: RoutingConfig,

    pub observability: ObservabilityConfig,

    /// Route table declared in configuration.
    pub routes: Vec<RouteConfig>,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Prefix stripped from every request path (e.g., "/app"). Empty for root.
    pub context_path: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            context_path: String::new(),
            request_timeout_secs: 30,
            max_body_size: 10 * 1024 * 1024, // 10MB, uploads included
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct StaticFilesConfig {
    /// Directory served for paths that are not routes. Disabled when unset.
    pub root: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Name of the session id cookie.
    pub cookie_name: String,

    /// Idle time before a session expires, in seconds. 0 disables expiry.
    pub idle_timeout_secs: u64,

    /// How often expired sessions are purged, in seconds.
    pub purge_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "SESSIONID".to_string(),
            idle_timeout_secs: 30 * 60,
            purge_interval_secs: 60,
        }
    }
}

/// Access guard configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SecurityConfig {
    /// Session attribute whose presence marks an authenticated user.
    pub auth_attribute: String,

    /// Session attribute holding the user's role.
    pub role_attribute: String,

    /// Redirect target for unauthenticated access.
    pub login_url: String,

    /// Redirect target for role mismatches.
    pub access_denied_url: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            auth_attribute: "user".to_string(),
            role_attribute: "role".to_string(),
            login_url: "/login".to_string(),
            access_denied_url: "/access-denied".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RoutingConfig {
    /// Require an exact method match for GET routes too.
    pub strict_methods: bool,

    /// Status for missing required parameters (400 or 500).
    pub binding_error_status: u16,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            strict_methods: false,
            binding_error_status: 500,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// One `[[routes]]` entry.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RouteConfig {
    /// Path template, e.g. "/users/{id}".
    pub pattern: String,

    /// HTTP method or "ANY".
    #[serde(default = "default_method")]
    pub method: String,

    /// Name of a handler in the catalog.
    pub handler: String,
}

fn default_method() -> String {
    "GET".to_string()
}
