//! Handler registration model.
//!
//! # Data Flow
//! ```text
//! startup:  Endpoint::new(name, callable) + ParamDescriptors + AccessRule
//!     → Route (pattern, method, endpoint) → RouteRegistry
//! request:  HandlerSignature → ParameterResolver → Arguments
//!     → Handler::invoke → HandlerOutput → DispatchResult
//! ```
//!
//! # Design Decisions
//! - Parameter metadata is declared next to the callable at registration and
//!   never rediscovered per request
//! - Handlers are async callables returning `Result`, so failures are values

pub mod arguments;
pub mod output;
pub mod signature;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;

pub use arguments::{Argument, Arguments};
pub use output::{DispatchResult, HandlerError, HandlerOutput, ModelView};
pub use signature::{HandlerSignature, ParamDescriptor, ParamKind, ParamSource, ScalarKind};

use crate::security::guard::AccessRule;

/// A registered request handler.
pub trait Handler: Send + Sync + 'static {
    fn invoke(&self, args: Arguments) -> BoxFuture<'static, Result<HandlerOutput, HandlerError>>;
}

impl<F, Fut, O> Handler for F
where
    F: Fn(Arguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, HandlerError>> + Send + 'static,
    O: Into<HandlerOutput>,
{
    fn invoke(&self, args: Arguments) -> BoxFuture<'static, Result<HandlerOutput, HandlerError>> {
        let fut = self(args);
        Box::pin(async move { fut.await.map(Into::into) })
    }
}

/// Type-level metadata shared by the handlers of one controller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControllerMeta {
    pub name: String,
    pub access: AccessRule,
}

impl ControllerMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            access: AccessRule::default(),
        }
    }

    pub fn with_access(mut self, access: AccessRule) -> Self {
        self.access = access;
        self
    }
}

/// Method-level metadata for one handler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandlerMeta {
    pub name: String,
    pub signature: HandlerSignature,
    /// Results are written through the JSON envelope.
    pub json: bool,
    pub access: AccessRule,
}

/// A handler plus everything the dispatcher needs to call it.
#[derive(Clone)]
pub struct Endpoint {
    pub controller: Arc<ControllerMeta>,
    pub meta: HandlerMeta,
    pub handler: Arc<dyn Handler>,
}

impl Endpoint {
    pub fn new(name: impl Into<String>, handler: impl Handler) -> Self {
        Self {
            controller: Arc::new(ControllerMeta::new("default")),
            meta: HandlerMeta {
                name: name.into(),
                ..HandlerMeta::default()
            },
            handler: Arc::new(handler),
        }
    }

    pub fn controller(mut self, controller: Arc<ControllerMeta>) -> Self {
        self.controller = controller;
        self
    }

    pub fn param(mut self, param: ParamDescriptor) -> Self {
        self.meta.signature = self.meta.signature.param(param);
        self
    }

    pub fn json(mut self) -> Self {
        self.meta.json = true;
        self
    }

    pub fn access(mut self, access: AccessRule) -> Self {
        self.meta.access = access;
        self
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn signature(&self) -> &HandlerSignature {
        &self.meta.signature
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("controller", &self.controller.name)
            .field("handler", &self.meta.name)
            .field("params", &self.meta.signature.len())
            .field("json", &self.meta.json)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_closure_handler_converts_output() {
        let endpoint = Endpoint::new("hello", |_args: Arguments| async move {
            Ok::<_, HandlerError>("hi")
        })
        .param(ParamDescriptor::request());

        assert_eq!(endpoint.name(), "hello");
        assert_eq!(endpoint.signature().len(), 1);
        let out = endpoint.handler.invoke(Arguments::new()).await.unwrap();
        assert_eq!(out, HandlerOutput::Text("hi".into()));
    }

    #[tokio::test]
    async fn test_handler_errors_propagate() {
        let endpoint = Endpoint::new("fail", |_args: Arguments| async move {
            Err::<(), _>(HandlerError::new("Boom", "nope"))
        })
        .json();

        assert!(endpoint.meta.json);
        let err = endpoint.handler.invoke(Arguments::new()).await.unwrap_err();
        assert_eq!(err.kind, "Boom");
    }
}
