//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Matched route:
//!     → guard.rs (effective rule = handler rule ∪ controller rule)
//!     → authenticated? → role allowed?
//!     → invoke handler, or commit a 302 redirect and stop
//! ```
//!
//! # Design Decisions
//! - Fail closed: a missing or empty attribute counts as unauthenticated
//! - Guards are pluggable behind the `AccessGuard` trait

pub mod guard;

pub use guard::{
    authenticate_user, logout, AccessGuard, AccessRule, AuthRequirement, GuardError, RoleRequirement,
    SessionAccessGuard,
};
