//! Front controller dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! DispatchRequest
//!     → static resource check (StaticFiles)
//!     → RouteRegistry (404 / 405 / matched route)
//!     → AccessGuard (may commit a redirect)
//!     → ParameterResolver → Handler
//!     → DispatchResult → text | view | JSON envelope | already handled
//!     → Reply (+ Set-Cookie for new sessions)
//! ```

pub mod dispatcher;
pub mod json;
pub mod pages;
pub mod view;

pub use dispatcher::{DispatchError, Dispatcher, DispatcherBuilder, Outcome};
pub use json::{JsonEnvelope, JsonError};
pub use view::{NoViewRenderer, ViewError, ViewRenderer};
