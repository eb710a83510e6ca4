//! Request data binding.
//!
//! # Data Flow
//! ```text
//! DispatchRequest + PathParams
//!     → resolver.rs (per-parameter source precedence)
//!     → object.rs (dotted/indexed keys → structured values)
//!     → convert.rs (lenient text → scalar)
//!     → Arguments
//! ```

pub mod convert;
pub mod object;
pub mod resolver;

pub use object::{bind_as, bind_object, FieldKind, ObjectSchema};
pub use resolver::{ParameterResolver, ResolveError};
