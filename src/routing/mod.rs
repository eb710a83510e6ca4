//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (method, context-relative path)
//!     → registry.rs (first-match scan)
//!     → route.rs (pattern + method check)
//!     → Return: matched Route + PathParams, or NoMatch
//!
//! Route compilation (at startup):
//!     manual registrations + [[routes]] (discovery.rs)
//!     → pattern.rs (template → anchored regex, ordered names)
//!     → Freeze as immutable RouteRegistry
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same input always matches same route
//! - First match wins (registration order)

pub mod discovery;
pub mod pattern;
pub mod registry;
pub mod route;

pub use discovery::HandlerCatalog;
pub use pattern::{PathParams, RouteError, RoutePattern};
pub use registry::RouteRegistry;
pub use route::{MethodPolicy, Route, RouteMethod};
