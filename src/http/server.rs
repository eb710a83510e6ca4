//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router; every path falls through to the dispatcher
//! - Wire up middleware (tracing, timeout, body limit, request ID)
//! - Translate axum requests into `DispatchRequest`s
//! - Purge idle sessions in the background
//! - Serve until Ctrl+C or a shutdown broadcast

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, FromRequest, Multipart, State},
    http::{header, HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::schema::FrontConfig;
use crate::dispatch::{pages, Dispatcher};
use crate::http::multipart;
use crate::http::request::{DispatchRequest, X_REQUEST_ID};
use crate::http::response::Reply;
use crate::lifecycle::shutdown_signal;

/// Application state injected into the fallback handler.
#[derive(Clone)]
struct AppState {
    dispatcher: Arc<Dispatcher>,
    max_body_size: usize,
}

/// HTTP front end for a [`Dispatcher`].
pub struct HttpServer {
    router: Router,
    config: FrontConfig,
    dispatcher: Arc<Dispatcher>,
}

impl HttpServer {
    pub fn new(config: FrontConfig, dispatcher: Arc<Dispatcher>) -> Self {
        let state = AppState {
            dispatcher: dispatcher.clone(),
            max_body_size: config.server.max_body_size,
        };
        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            dispatcher,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &FrontConfig, state: AppState) -> Router {
        Router::new()
            .fallback(front_handler)
            .with_state(state)
            .layer(DefaultBodyLimit::max(config.server.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.server.request_timeout_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered router, for serving or for `oneshot` tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &FrontConfig {
        &self.config
    }

    /// Run the server on `listener` until Ctrl+C or `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            context_path = %self.config.server.context_path,
            routes = self.dispatcher.registry().len(),
            "HTTP server starting"
        );

        let purge = tokio::spawn(purge_sessions(
            self.dispatcher.clone(),
            Duration::from_secs(self.config.session.purge_interval_secs.max(1)),
        ));

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal(shutdown))
            .await?;

        purge.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn purge_sessions(dispatcher: Arc<Dispatcher>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let purged = dispatcher.sessions().purge_expired();
        if purged > 0 {
            tracing::debug!(purged, "Expired sessions purged");
        }
    }
}

/// Every request lands here.
async fn front_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let context_path = state.dispatcher.context_path();
    let full_path = request.uri().path().to_string();

    let Some(path) = strip_context(&full_path, context_path) else {
        tracing::debug!(path = %full_path, "Outside context path");
        return Reply::html(StatusCode::NOT_FOUND, pages::not_found(&full_path, context_path)).into_response();
    };

    let mut dispatch = DispatchRequest::new(request.method().clone(), path);
    if let Some(query) = request.uri().query() {
        dispatch.params.extend_from_query(query);
    }
    dispatch.session_id = session_cookie(request.headers(), state.dispatcher.cookie_name());
    dispatch.request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    dispatch.headers = request.headers().clone();

    if let Err(response) = read_body(&state, &mut dispatch, request).await {
        return response;
    }

    state.dispatcher.handle(dispatch).await.into_response()
}

/// Merge form fields and uploads into `dispatch`.
async fn read_body(state: &AppState, dispatch: &mut DispatchRequest, request: Request<Body>) -> Result<(), Response> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        let form = Multipart::from_request(request, state)
            .await
            .map_err(IntoResponse::into_response)?;
        let form = multipart::decode(form).await.map_err(|err| {
            tracing::warn!(error = %err, "Malformed multipart body");
            err.into_response()
        })?;
        for (name, values) in form.params.iter() {
            for value in values {
                dispatch.params.append(name, value.clone());
            }
        }
        for (name, files) in form.files {
            dispatch.files.entry(name).or_default().extend(files);
        }
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let bytes = axum::body::to_bytes(request.into_body(), state.max_body_size)
            .await
            .map_err(|err| {
                tracing::warn!(error = %err, "Failed to read form body");
                (StatusCode::PAYLOAD_TOO_LARGE, "request body too large").into_response()
            })?;
        match std::str::from_utf8(&bytes) {
            Ok(body) => dispatch.params.extend_from_query(body),
            Err(_) => return Err((StatusCode::BAD_REQUEST, "form body is not UTF-8").into_response()),
        }
    }

    Ok(())
}

/// Context-relative path, or `None` for paths outside the context.
pub fn strip_context(path: &str, context_path: &str) -> Option<String> {
    if context_path.is_empty() {
        return Some(if path.is_empty() { "/".to_string() } else { path.to_string() });
    }
    match path.strip_prefix(context_path) {
        Some("") => Some("/".to_string()),
        Some(rest) if rest.starts_with('/') => Some(rest.to_string()),
        _ => None,
    }
}

/// Value of the `name` cookie across all `Cookie` headers.
pub fn session_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_strip_context() {
        assert_eq!(strip_context("/users/1", "").as_deref(), Some("/users/1"));
        assert_eq!(strip_context("/app", "/app").as_deref(), Some("/"));
        assert_eq!(strip_context("/app/users/1", "/app").as_deref(), Some("/users/1"));
        assert_eq!(strip_context("/application", "/app"), None);
        assert_eq!(strip_context("/other", "/app"), None);
    }

    #[test]
    fn test_session_cookie() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark; SESSIONID=abc123"));
        headers.append(header::COOKIE, HeaderValue::from_static("other=1"));
        assert_eq!(session_cookie(&headers, "SESSIONID").as_deref(), Some("abc123"));
        assert_eq!(session_cookie(&headers, "JSESSIONID"), None);

        let mut empty = HeaderMap::new();
        empty.insert(header::COOKIE, HeaderValue::from_static("SESSIONID="));
        assert_eq!(session_cookie(&empty, "SESSIONID"), None);
    }
}
