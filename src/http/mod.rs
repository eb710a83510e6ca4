//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, context path, cookies)
//!     → multipart.rs (form fields + uploaded files)
//!     → request.rs (DispatchRequest handed to the dispatcher)
//!     → static_files.rs (resources served ahead of routing)
//!     → response.rs (write-once slot, Reply → axum Response)
//!     → Send to client
//! ```

pub mod multipart;
pub mod request;
pub mod response;
pub mod server;
pub mod static_files;

pub use multipart::UploadedFile;
pub use request::{DispatchRequest, ParamMultiMap, X_REQUEST_ID};
pub use response::{CommitError, Reply, ResponseSlot};
pub use server::HttpServer;
pub use static_files::StaticFiles;
