//! Pre-invocation access checks.
//!
//! # Responsibilities
//! - Resolve the effective rule: method-level overrides type-level, per check
//! - Require an authenticated session, then an allowed role
//! - Redirect on denial instead of invoking the handler
//!
//! # Design Decisions
//! - Denial is a normal outcome (`Ok(false)`), never an error
//! - The guard only reads the session; it never creates one

use axum::http::header::InvalidHeaderValue;
use serde_json::Value;
use thiserror::Error;

use crate::config::schema::SecurityConfig;
use crate::handler::{ControllerMeta, HandlerMeta};
use crate::http::request::DispatchRequest;
use crate::http::response::{CommitError, Reply, ResponseSlot};
use crate::session::{RequestSession, Session};

#[derive(Debug, Error)]
pub enum GuardError {
    #[error("invalid redirect target: {0}")]
    Redirect(#[from] InvalidHeaderValue),

    #[error(transparent)]
    Commit(#[from] CommitError),
}

/// Requirement for a logged-in session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthRequirement {
    /// Overrides the configured authentication attribute.
    pub session_attribute: Option<String>,
    /// Overrides the configured login URL.
    pub redirect: Option<String>,
}

impl AuthRequirement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        self.session_attribute = Some(name.into());
        self
    }

    pub fn redirect(mut self, url: impl Into<String>) -> Self {
        self.redirect = Some(url.into());
        self
    }
}

/// Requirement for one of a set of roles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleRequirement {
    pub allowed: Vec<String>,
    /// Overrides the configured role attribute.
    pub role_attribute: Option<String>,
    pub redirect: Option<String>,
}

impl RoleRequirement {
    pub fn any_of<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: roles.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        self.role_attribute = Some(name.into());
        self
    }

    pub fn redirect(mut self, url: impl Into<String>) -> Self {
        self.redirect = Some(url.into());
        self
    }

    fn allows(&self, role: &str) -> bool {
        self.allowed.iter().any(|r| r.eq_ignore_ascii_case(role))
    }
}

/// Access requirements attached to a controller or handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessRule {
    pub authenticated: Option<AuthRequirement>,
    pub roles: Option<RoleRequirement>,
}

impl AccessRule {
    /// No requirements.
    pub fn open() -> Self {
        Self::default()
    }

    pub fn authenticated() -> Self {
        Self::open().require_authentication(AuthRequirement::new())
    }

    pub fn roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::open().require_roles(RoleRequirement::any_of(roles))
    }

    pub fn require_authentication(mut self, requirement: AuthRequirement) -> Self {
        self.authenticated = Some(requirement);
        self
    }

    pub fn require_roles(mut self, requirement: RoleRequirement) -> Self {
        self.roles = Some(requirement);
        self
    }

    pub fn is_open(&self) -> bool {
        self.authenticated.is_none() && self.roles.is_none()
    }

    /// Combine handler and controller rules; each check prefers the handler's.
    pub fn effective(handler: &AccessRule, controller: &AccessRule) -> AccessRule {
        AccessRule {
            authenticated: handler
                .authenticated
                .clone()
                .or_else(|| controller.authenticated.clone()),
            roles: handler.roles.clone().or_else(|| controller.roles.clone()),
        }
    }
}

/// Pluggable check run before every handler invocation.
pub trait AccessGuard: Send + Sync + 'static {
    /// `Ok(true)` to proceed. On `Ok(false)` the guard has committed a response.
    fn check_access(
        &self,
        handler: &HandlerMeta,
        controller: &ControllerMeta,
        request: &DispatchRequest,
        session: &RequestSession,
        response: &ResponseSlot,
    ) -> Result<bool, GuardError>;
}

/// Guard backed by session attributes.
#[derive(Debug, Clone, Default)]
pub struct SessionAccessGuard {
    config: SecurityConfig,
    context_path: String,
}

impl SessionAccessGuard {
    pub fn new(config: SecurityConfig, context_path: impl Into<String>) -> Self {
        Self {
            config,
            context_path: context_path.into(),
        }
    }

    fn deny(&self, response: &ResponseSlot, target: &str) -> Result<bool, GuardError> {
        let location = format!("{}{}", self.context_path, target);
        response.commit(Reply::redirect(&location)?)?;
        Ok(false)
    }
}

impl AccessGuard for SessionAccessGuard {
    fn check_access(
        &self,
        handler: &HandlerMeta,
        controller: &ControllerMeta,
        request: &DispatchRequest,
        session: &RequestSession,
        response: &ResponseSlot,
    ) -> Result<bool, GuardError> {
        let rule = AccessRule::effective(&handler.access, &controller.access);
        if rule.is_open() {
            return Ok(true);
        }

        if let Some(auth) = &rule.authenticated {
            let attribute = auth
                .session_attribute
                .as_deref()
                .unwrap_or(&self.config.auth_attribute);
            if !is_present(session.attribute(attribute).as_ref()) {
                let target = auth.redirect.as_deref().unwrap_or(&self.config.login_url);
                tracing::info!(path = %request.path, handler = %handler.name, redirect = %target, "Access denied: not authenticated");
                return self.deny(response, target);
            }
        }

        if let Some(roles) = &rule.roles {
            if !is_present(session.attribute(&self.config.auth_attribute).as_ref()) {
                let target = roles.redirect.as_deref().unwrap_or(&self.config.login_url);
                tracing::info!(path = %request.path, handler = %handler.name, redirect = %target, "Access denied: role check without authentication");
                return self.deny(response, target);
            }

            let attribute = roles
                .role_attribute
                .as_deref()
                .unwrap_or(&self.config.role_attribute);
            let role = session.attribute(attribute).and_then(|v| role_text(&v));
            if !role.as_deref().is_some_and(|r| roles.allows(r)) {
                let target = roles
                    .redirect
                    .as_deref()
                    .unwrap_or(&self.config.access_denied_url);
                tracing::info!(
                    path = %request.path,
                    handler = %handler.name,
                    role = role.as_deref().unwrap_or("<none>"),
                    allowed = ?roles.allowed,
                    redirect = %target,
                    "Access denied: role not allowed"
                );
                return self.deny(response, target);
            }
        }

        Ok(true)
    }
}

fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

fn role_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Mark `session` as logged in with the given user and role.
pub fn authenticate_user(session: &Session, config: &SecurityConfig, user: &str, role: &str) {
    session.set(&config.auth_attribute, user);
    session.set(&config.role_attribute, role);
    tracing::info!(session_id = %session.id(), user = %user, role = %role, "User authenticated");
}

/// End the current session, if any.
pub fn logout(session: &RequestSession) {
    if let Some(session) = session.existing() {
        session.invalidate();
        tracing::info!(session_id = %session.id(), "User logged out");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MemorySessionStore, SessionStore};
    use axum::http::StatusCode;
    use std::sync::Arc;

    fn guard() -> SessionAccessGuard {
        SessionAccessGuard::new(SecurityConfig::default(), "/app")
    }

    fn handler(access: AccessRule) -> HandlerMeta {
        HandlerMeta {
            name: "admin.panel".into(),
            access,
            ..HandlerMeta::default()
        }
    }

    fn session_with(attrs: &[(&str, &str)]) -> RequestSession {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new(None));
        let id = store.create();
        for (k, v) in attrs {
            store.set(&id, k, Value::from(*v));
        }
        RequestSession::new(store, Some(id))
    }

    fn check(access: AccessRule, controller: AccessRule, session: &RequestSession) -> (bool, ResponseSlot) {
        let response = ResponseSlot::new();
        let allowed = guard()
            .check_access(
                &handler(access),
                &ControllerMeta::new("admin").with_access(controller),
                &DispatchRequest::get("/admin"),
                session,
                &response,
            )
            .unwrap();
        (allowed, response)
    }

    #[test]
    fn test_open_rule_allows() {
        let (allowed, response) = check(AccessRule::open(), AccessRule::open(), &session_with(&[]));
        assert!(allowed);
        assert!(!response.is_committed());
    }

    #[test]
    fn test_unauthenticated_redirects_to_login() {
        let (allowed, response) = check(AccessRule::authenticated(), AccessRule::open(), &session_with(&[]));
        assert!(!allowed);
        let reply = response.take().unwrap();
        assert_eq!(reply.status, StatusCode::FOUND);
        assert_eq!(reply.location(), Some("/app/login"));
    }

    #[test]
    fn test_wrong_role_redirects_to_denied() {
        let session = session_with(&[("user", "bob"), ("role", "guest")]);
        let (allowed, response) = check(AccessRule::roles(["admin"]), AccessRule::open(), &session);
        assert!(!allowed);
        assert_eq!(response.take().unwrap().location(), Some("/app/access-denied"));
    }

    #[test]
    fn test_role_match_is_case_insensitive() {
        let session = session_with(&[("user", "ann"), ("role", "ADMIN")]);
        let (allowed, _) = check(AccessRule::roles(["admin", "root"]), AccessRule::open(), &session);
        assert!(allowed);
    }

    #[test]
    fn test_method_rule_overrides_controller_rule() {
        let session = session_with(&[("user", "ann"), ("role", "editor")]);
        let (allowed, _) = check(
            AccessRule::roles(["editor"]),
            AccessRule::roles(["admin"]),
            &session,
        );
        assert!(allowed);

        let controller_only = AccessRule::open()
            .require_roles(RoleRequirement::any_of(["admin"]).redirect("/nope"));
        let (allowed, response) = check(AccessRule::authenticated(), controller_only, &session);
        assert!(!allowed);
        assert_eq!(response.take().unwrap().location(), Some("/app/nope"));
    }

    #[test]
    fn test_authenticate_and_logout() {
        let session = session_with(&[]);
        let handle = session.get_or_create();
        authenticate_user(&handle, &SecurityConfig::default(), "ann", "admin");
        let (allowed, _) = check(AccessRule::roles(["admin"]), AccessRule::open(), &session);
        assert!(allowed);

        logout(&session);
        assert!(session.existing().is_none());
    }
}
