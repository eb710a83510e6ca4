//! Front controller for server-side web applications.
//!
//! Every request enters through one [`Dispatcher`], which serves static
//! resources, matches the path against registered route patterns, runs the
//! access guard, binds handler arguments from the request and session,
//! invokes the handler and writes its result.

// Core subsystems
pub mod binding;
pub mod config;
pub mod dispatch;
pub mod handler;
pub mod http;
pub mod routing;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod security;
pub mod session;

pub use config::schema::FrontConfig;
pub use dispatch::Dispatcher;
pub use handler::{Arguments, Endpoint, HandlerError, HandlerOutput, ModelView, ParamDescriptor};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{HandlerCatalog, Route};
