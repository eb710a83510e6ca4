//! Compiled routes.
//!
//! # Design Decisions
//! - Immutable after compilation; owned by the registry
//! - Method comparison is case-insensitive
//! - Under the legacy policy a GET or ANY route accepts every method

use std::fmt;
use std::str::FromStr;

use axum::http::Method;

use crate::handler::Endpoint;
use crate::routing::pattern::{PathParams, RouteError, RoutePattern};

/// Method a route is registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteMethod {
    Get,
    Post,
    Put,
    Delete,
    Any,
}

impl RouteMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteMethod::Get => "GET",
            RouteMethod::Post => "POST",
            RouteMethod::Put => "PUT",
            RouteMethod::Delete => "DELETE",
            RouteMethod::Any => "ANY",
        }
    }

    fn is(&self, method: &Method) -> bool {
        self.as_str().eq_ignore_ascii_case(method.as_str())
    }
}

impl FromStr for RouteMethod {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "" | "ANY" | "*" => Ok(RouteMethod::Any),
            "GET" => Ok(RouteMethod::Get),
            "POST" => Ok(RouteMethod::Post),
            "PUT" => Ok(RouteMethod::Put),
            "DELETE" => Ok(RouteMethod::Delete),
            _ => Err(RouteError::UnknownMethod(s.to_string())),
        }
    }
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How route methods are compared with request methods.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MethodPolicy {
    /// GET and ANY routes accept any method.
    #[default]
    Legacy,
    /// Only ANY routes accept any method.
    Strict,
}

impl MethodPolicy {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            MethodPolicy::Strict
        } else {
            MethodPolicy::Legacy
        }
    }
}

/// A path template and method bound to an endpoint.
#[derive(Debug, Clone)]
pub struct Route {
    pattern: RoutePattern,
    method: RouteMethod,
    endpoint: Endpoint,
}

impl Route {
    pub fn new(pattern: RoutePattern, method: RouteMethod, endpoint: Endpoint) -> Self {
        Self {
            pattern,
            method,
            endpoint,
        }
    }

    /// Compile a template and method string.
    pub fn compile(pattern: &str, method: &str, endpoint: Endpoint) -> Result<Self, RouteError> {
        Ok(Self::new(RoutePattern::compile(pattern)?, method.parse()?, endpoint))
    }

    pub fn get(pattern: &str, endpoint: Endpoint) -> Result<Self, RouteError> {
        Ok(Self::new(RoutePattern::compile(pattern)?, RouteMethod::Get, endpoint))
    }

    pub fn post(pattern: &str, endpoint: Endpoint) -> Result<Self, RouteError> {
        Ok(Self::new(RoutePattern::compile(pattern)?, RouteMethod::Post, endpoint))
    }

    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    pub fn method(&self) -> RouteMethod {
        self.method
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn matches_path(&self, path: &str) -> bool {
        self.pattern.is_match(path)
    }

    pub fn accepts_method(&self, method: &Method, policy: MethodPolicy) -> bool {
        match (self.method, policy) {
            (RouteMethod::Any, _) | (RouteMethod::Get, MethodPolicy::Legacy) => true,
            (route_method, _) => route_method.is(method),
        }
    }

    /// Path and method match under the legacy policy.
    pub fn matches(&self, path: &str, method: &Method) -> bool {
        self.matches_with(path, method, MethodPolicy::Legacy)
    }

    pub fn matches_with(&self, path: &str, method: &Method, policy: MethodPolicy) -> bool {
        self.matches_path(path) && self.accepts_method(method, policy)
    }

    /// Captured placeholders; empty if the path does not match.
    pub fn extract_params(&self, path: &str) -> PathParams {
        self.pattern.extract(path)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} -> {}", self.method, self.pattern, self.endpoint.name())
    }
}
