//! Request dispatch.
//!
//! # Responsibilities
//! - Serve static resources before dynamic routing
//! - Tell 404 from 405 and render the fallback pages
//! - Run the access guard, resolve arguments, invoke the handler
//! - Write the handler result through the write-once response slot
//! - Map binding and handler failures to 500 (or 400) responses
//!
//! # Design Decisions
//! - One `ResponseSlot` per request; every branch commits through it
//! - Panics inside handlers are caught and reported like handler errors
//! - A session created during dispatch is announced with `Set-Cookie`,
//!   unless it was invalidated before the handler returned
//! - Declaring the response slot makes the handler responsible for the reply

use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::header::{self, HeaderValue};
use axum::http::{Method, StatusCode};
use futures_util::FutureExt;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::binding::resolver::{ParameterResolver, ResolveError};
use crate::config::schema::FrontConfig;
use crate::dispatch::json::{JsonEnvelope, JsonError};
use crate::dispatch::pages;
use crate::dispatch::view::{NoViewRenderer, ViewError, ViewRenderer};
use crate::handler::{DispatchResult, Endpoint, HandlerError, ModelView};
use crate::http::request::DispatchRequest;
use crate::http::response::{CommitError, Reply, ResponseSlot};
use crate::http::static_files::StaticFiles;
use crate::observability::metrics;
use crate::routing::discovery::HandlerCatalog;
use crate::routing::pattern::{PathParams, RouteError};
use crate::routing::registry::RouteRegistry;
use crate::routing::route::{MethodPolicy, Route};
use crate::security::guard::{AccessGuard, GuardError, SessionAccessGuard};
use crate::session::{MemorySessionStore, RequestSession, SessionStore};

/// Failures while setting up or running a dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Route(#[from] RouteError),

    #[error("binding error status must be 400 or 500, got {0}")]
    InvalidBindingStatus(u16),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Guard(#[from] GuardError),

    #[error("{}", .0.message)]
    Handler(#[from] HandlerError),

    #[error(transparent)]
    View(#[from] ViewError),

    #[error("failed to encode JSON response: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Commit(#[from] CommitError),

    #[error("handler panicked: {0}")]
    Panic(String),
}

impl DispatchError {
    /// Category reported as `error_kind` in JSON error documents.
    pub fn kind(&self) -> &str {
        match self {
            DispatchError::Route(_) => "RouteError",
            DispatchError::InvalidBindingStatus(_) => "ConfigError",
            DispatchError::Resolve(ResolveError::MissingParameter { .. }) => "MissingParameter",
            DispatchError::Resolve(ResolveError::MissingSessionAttribute { .. }) => {
                "MissingSessionAttribute"
            }
            DispatchError::Guard(_) => "GuardError",
            DispatchError::Handler(err) => &err.kind,
            DispatchError::View(_) => "ViewError",
            DispatchError::Json(_) => "SerializationError",
            DispatchError::Commit(_) => "CommitError",
            DispatchError::Panic(_) => "Panic",
        }
    }
}

/// How a request ended, for logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Static,
    NotFound,
    MethodNotAllowed,
    Denied,
    Text,
    View,
    Json,
    Handled,
    Empty,
    Error,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Static => "static",
            Outcome::NotFound => "not_found",
            Outcome::MethodNotAllowed => "method_not_allowed",
            Outcome::Denied => "denied",
            Outcome::Text => "text",
            Outcome::View => "view",
            Outcome::Json => "json",
            Outcome::Handled => "handled",
            Outcome::Empty => "empty",
            Outcome::Error => "error",
        }
    }

    fn of(result: &DispatchResult) -> Self {
        match result {
            DispatchResult::Text(_) => Outcome::Text,
            DispatchResult::View(_) => Outcome::View,
            DispatchResult::Json(_) => Outcome::Json,
            DispatchResult::Handled => Outcome::Handled,
            DispatchResult::Empty => Outcome::Empty,
        }
    }
}

/// The front controller: one instance serves every request.
pub struct Dispatcher {
    registry: Arc<RouteRegistry>,
    sessions: Arc<dyn SessionStore>,
    guard: Arc<dyn AccessGuard>,
    views: Arc<dyn ViewRenderer>,
    static_files: Option<StaticFiles>,
    context_path: String,
    cookie_name: String,
    binding_error_status: StatusCode,
}

impl Dispatcher {
    pub fn builder(registry: RouteRegistry) -> DispatcherBuilder {
        DispatcherBuilder::new(registry)
    }

    /// Build a dispatcher from configuration and pre-compiled routes.
    pub fn initialize(
        config: &FrontConfig,
        routes: impl IntoIterator<Item = Route>,
    ) -> Result<Self, DispatchError> {
        let mut registry = RouteRegistry::new(MethodPolicy::from_strict(config.routing.strict_methods));
        registry.register_all(routes);
        registry.log_routes();

        let binding_error_status = match config.routing.binding_error_status {
            400 => StatusCode::BAD_REQUEST,
            500 => StatusCode::INTERNAL_SERVER_ERROR,
            other => return Err(DispatchError::InvalidBindingStatus(other)),
        };
        let idle = match config.session.idle_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        let mut builder = Self::builder(registry)
            .sessions(Arc::new(MemorySessionStore::new(idle)))
            .guard(Arc::new(SessionAccessGuard::new(
                config.security.clone(),
                config.server.context_path.clone(),
            )))
            .context_path(config.server.context_path.clone())
            .cookie_name(config.session.cookie_name.clone())
            .binding_error_status(binding_error_status);
        if let Some(root) = &config.static_files.root {
            builder = builder.static_root(root);
        }

        Ok(builder.build())
    }

    /// Compile the configured `[[routes]]` against `catalog`, then initialize.
    pub fn from_catalog(config: &FrontConfig, catalog: &HandlerCatalog) -> Result<Self, DispatchError> {
        let routes = catalog.routes_from_config(&config.routes)?;
        Self::initialize(config, routes)
    }

    /// Replace the view renderer.
    pub fn with_views(mut self, views: Arc<dyn ViewRenderer>) -> Self {
        self.views = views;
        self
    }

    pub fn registry(&self) -> &RouteRegistry {
        &self.registry
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Dispatch one request and return the committed response.
    pub async fn handle(&self, request: DispatchRequest) -> Reply {
        let start = Instant::now();
        let method = request.method.clone();
        let path = request.path.clone();
        let request_id = request.request_id.clone().unwrap_or_default();
        let session = RequestSession::new(self.sessions.clone(), request.session_id.clone());

        let (mut reply, outcome) = self.dispatch(request, &session).await;

        if let Some(id) = session.created_id() {
            let cookie = format!(
                "{}={}; Path={}; HttpOnly; SameSite=Lax",
                self.cookie_name,
                id,
                if self.context_path.is_empty() { "/" } else { &self.context_path }
            );
            match HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    reply.headers.append(header::SET_COOKIE, value);
                }
                Err(err) => tracing::warn!(error = %err, "Invalid session cookie"),
            }
        }

        tracing::info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = reply.status.as_u16(),
            outcome = outcome.as_str(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Request dispatched"
        );
        metrics::record_dispatch(method.as_str(), reply.status.as_u16(), outcome.as_str(), start);

        reply
    }

    async fn dispatch(&self, request: DispatchRequest, session: &RequestSession) -> (Reply, Outcome) {
        if let Some(files) = &self.static_files {
            if matches!(request.method, Method::GET | Method::HEAD) {
                if let Some(reply) = files.serve(&request.path).await {
                    return (reply, Outcome::Static);
                }
            }
        }

        let Some(route) = self.registry.find_route_for(&request.path, &request.method) else {
            return if self.registry.find_route(&request.path).is_some() {
                (self.method_not_allowed(&request), Outcome::MethodNotAllowed)
            } else {
                tracing::debug!(path = %request.path, "No route matched");
                (self.not_found(&request), Outcome::NotFound)
            };
        };

        let endpoint = route.endpoint();
        let path_params = route.extract_params(&request.path);
        tracing::debug!(
            route = %route.pattern(),
            handler = %endpoint.name(),
            params = ?path_params,
            "Route matched"
        );

        let request = Arc::new(request);
        let response = ResponseSlot::new();
        let outcome = match self
            .invoke(endpoint, &request, &path_params, session, &response)
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                self.fail(endpoint, &request, &response, &err);
                Outcome::Error
            }
        };

        (response.take().unwrap_or_default(), outcome)
    }

    async fn invoke(
        &self,
        endpoint: &Endpoint,
        request: &Arc<DispatchRequest>,
        path_params: &PathParams,
        session: &RequestSession,
        response: &ResponseSlot,
    ) -> Result<Outcome, DispatchError> {
        if !self
            .guard
            .check_access(&endpoint.meta, &endpoint.controller, request, session, response)?
        {
            return Ok(Outcome::Denied);
        }

        let args = ParameterResolver::new(request, response, session, path_params)
            .resolve(endpoint.signature())?;

        let handler = endpoint.handler.clone();
        let future = std::panic::catch_unwind(AssertUnwindSafe(move || handler.invoke(args)))
            .map_err(|panic| DispatchError::Panic(panic_message(panic)))?;
        let output = AssertUnwindSafe(future)
            .catch_unwind()
            .await
            .map_err(|panic| DispatchError::Panic(panic_message(panic)))??;

        let handled = endpoint.signature().injects_response();
        if handled && !response.is_committed() {
            response.commit(Reply::empty())?;
        }
        let result = DispatchResult::classify(output, handled);
        let outcome = Outcome::of(&result);
        self.write_result(endpoint, request, path_params, result, response)?;
        Ok(outcome)
    }

    fn write_result(
        &self,
        endpoint: &Endpoint,
        request: &DispatchRequest,
        path_params: &PathParams,
        result: DispatchResult,
        response: &ResponseSlot,
    ) -> Result<(), DispatchError> {
        if endpoint.meta.json {
            let data = match result {
                DispatchResult::Handled => return Ok(()),
                DispatchResult::Text(text) => Value::String(text),
                DispatchResult::View(view) => Value::Object(view.into_parts().1),
                DispatchResult::Json(value) => value,
                DispatchResult::Empty => Value::Null,
            };
            response.commit(Reply::json(StatusCode::OK, &JsonEnvelope::success(data))?)?;
            return Ok(());
        }

        let reply = match result {
            DispatchResult::Handled => return Ok(()),
            DispatchResult::Text(text) => Reply::html(StatusCode::OK, text),
            DispatchResult::View(view) => {
                let (name, model) = self.view_model(request, path_params, view);
                Reply::html(StatusCode::OK, self.views.render(&name, &model)?)
            }
            DispatchResult::Json(value) => Reply::json(StatusCode::OK, &value)?,
            DispatchResult::Empty => Reply::empty(),
        };
        response.commit(reply)?;
        Ok(())
    }

    /// Request attributes, then the handler's model, then path params.
    fn view_model(
        &self,
        request: &DispatchRequest,
        path_params: &PathParams,
        view: ModelView,
    ) -> (String, Map<String, Value>) {
        let (name, model) = view.into_parts();
        let mut merged = request.attributes.clone();
        merged.extend(model);
        for (key, value) in path_params.iter() {
            merged.insert(key.to_string(), Value::String(value.to_string()));
        }
        (name, merged)
    }

    fn fail(&self, endpoint: &Endpoint, request: &DispatchRequest, response: &ResponseSlot, err: &DispatchError) {
        let status = match err {
            DispatchError::Resolve(_) => self.binding_error_status,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::error!(
            request_id = request.request_id.as_deref().unwrap_or_default(),
            path = %request.path,
            handler = %endpoint.name(),
            error_kind = err.kind(),
            error = %err,
            "Dispatch failed"
        );

        let message = err.to_string();
        let reply = if endpoint.meta.json {
            Reply::json(status, &JsonError::new(status, err.kind(), &message))
                .unwrap_or_else(|_| Reply::text(status, message))
        } else if status == StatusCode::BAD_REQUEST {
            Reply::html(status, pages::bad_request(&self.full_path(request), &message))
        } else {
            Reply::html(status, pages::internal_error(&self.full_path(request), &message))
        };

        if let Err(err) = response.commit(reply) {
            tracing::warn!(committed = %err.0, "Response already committed; error page dropped");
        }
    }

    fn not_found(&self, request: &DispatchRequest) -> Reply {
        Reply::html(
            StatusCode::NOT_FOUND,
            pages::not_found(&self.full_path(request), &self.context_path),
        )
    }

    fn method_not_allowed(&self, request: &DispatchRequest) -> Reply {
        let allowed = self.registry.allowed_methods(&request.path);
        let names: Vec<&str> = allowed.iter().map(|m| m.as_str()).collect();
        tracing::debug!(path = %request.path, method = %request.method, allowed = ?names, "Method not allowed");

        let mut reply = Reply::html(
            StatusCode::METHOD_NOT_ALLOWED,
            pages::method_not_allowed(&self.full_path(request), request.method.as_str(), &names),
        );
        if let Ok(value) = HeaderValue::from_str(&names.join(", ")) {
            reply.headers.insert(header::ALLOW, value);
        }
        reply
    }

    fn full_path(&self, request: &DispatchRequest) -> String {
        format!("{}{}", self.context_path, request.path)
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Builder for [`Dispatcher`] with in-memory defaults.
pub struct DispatcherBuilder {
    registry: RouteRegistry,
    sessions: Option<Arc<dyn SessionStore>>,
    guard: Option<Arc<dyn AccessGuard>>,
    views: Option<Arc<dyn ViewRenderer>>,
    static_root: Option<PathBuf>,
    context_path: String,
    cookie_name: String,
    binding_error_status: StatusCode,
}

impl DispatcherBuilder {
    fn new(registry: RouteRegistry) -> Self {
        Self {
            registry,
            sessions: None,
            guard: None,
            views: None,
            static_root: None,
            context_path: String::new(),
            cookie_name: "SESSIONID".to_string(),
            binding_error_status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn sessions(mut self, sessions: Arc<dyn SessionStore>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn guard(mut self, guard: Arc<dyn AccessGuard>) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn views(mut self, views: Arc<dyn ViewRenderer>) -> Self {
        self.views = Some(views);
        self
    }

    pub fn static_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.static_root = Some(root.into());
        self
    }

    pub fn context_path(mut self, context_path: impl Into<String>) -> Self {
        self.context_path = context_path.into();
        self
    }

    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    pub fn binding_error_status(mut self, status: StatusCode) -> Self {
        self.binding_error_status = status;
        self
    }

    pub fn build(self) -> Dispatcher {
        let context_path = self.context_path;
        Dispatcher {
            registry: Arc::new(self.registry),
            sessions: self
                .sessions
                .unwrap_or_else(|| Arc::new(MemorySessionStore::new(None))),
            guard: self.guard.unwrap_or_else(|| {
                Arc::new(SessionAccessGuard::new(Default::default(), context_path.clone()))
            }),
            views: self.views.unwrap_or_else(|| Arc::new(NoViewRenderer)),
            static_files: self.static_root.map(StaticFiles::new),
            context_path,
            cookie_name: self.cookie_name,
            binding_error_status: self.binding_error_status,
        }
    }
}
