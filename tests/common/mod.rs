//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::http::header;
use tokio::net::TcpListener;

use front_controller::handler::{Arguments, HandlerError};
use front_controller::http::Reply;
use front_controller::routing::{Route, RouteRegistry};
use front_controller::{Dispatcher, Endpoint, FrontConfig, HttpServer, Shutdown};

/// Counts handler invocations.
#[derive(Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Endpoint that always answers `body`.
pub fn fixed(name: &str, body: &'static str) -> Endpoint {
    Endpoint::new(name.to_string(), move |_: Arguments| async move { Ok::<_, HandlerError>(body) })
}

/// Endpoint that answers `body` and records each call.
pub fn counted(name: &str, body: &'static str, counter: &CallCounter) -> Endpoint {
    let counter = counter.clone();
    Endpoint::new(name.to_string(), move |_: Arguments| {
        counter.hit();
        async move { Ok::<_, HandlerError>(body) }
    })
}

pub fn dispatcher(routes: Vec<Route>) -> Dispatcher {
    Dispatcher::builder(routes.into_iter().collect::<RouteRegistry>()).build()
}

/// Session id from a `Set-Cookie` header named `cookie`.
pub fn session_id(reply: &Reply, cookie: &str) -> Option<String> {
    reply
        .headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| {
            v.split(';')
                .next()
                .and_then(|pair| pair.trim().split_once('='))
                .filter(|(name, _)| *name == cookie)
                .map(|(_, id)| id.to_string())
        })
}

/// Serve `dispatcher` on an ephemeral port.
pub async fn start_server(config: FrontConfig, dispatcher: Dispatcher) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, Arc::new(dispatcher));
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        server.run(listener, rx).await.unwrap();
    });
    (addr, shutdown)
}
