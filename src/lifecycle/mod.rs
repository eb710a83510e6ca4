//! Lifecycle management.
//!
//! # Data Flow
//! ```text
//! Shutdown::trigger() or Ctrl+C
//!     → shutdown_signal() resolves
//!     → axum stops accepting, drains in-flight requests
//!     → session purge task exits
//! ```

pub mod shutdown;

pub use shutdown::{shutdown_signal, Shutdown};
