//! Config-driven route discovery.
//!
//! Handlers are registered by name in a [`HandlerCatalog`]; `[[routes]]`
//! entries then bind patterns and methods to those names at startup.

use std::collections::HashMap;

use crate::config::schema::RouteConfig;
use crate::handler::Endpoint;
use crate::routing::pattern::RouteError;
use crate::routing::route::Route;

#[derive(Debug, Clone, Default)]
pub struct HandlerCatalog {
    endpoints: HashMap<String, Endpoint>,
}

impl HandlerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an endpoint under its own name, replacing any previous entry.
    pub fn register(&mut self, endpoint: Endpoint) -> &mut Self {
        if let Some(previous) = self.endpoints.insert(endpoint.name().to_string(), endpoint) {
            tracing::warn!(handler = %previous.name(), "Handler registered twice; keeping the latest");
        }
        self
    }

    pub fn with(mut self, endpoint: Endpoint) -> Self {
        self.register(endpoint);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Endpoint> {
        self.endpoints.get(name)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Compile configured routes, in file order.
    pub fn routes_from_config(&self, configs: &[RouteConfig]) -> Result<Vec<Route>, RouteError> {
        configs
            .iter()
            .map(|config| {
                let endpoint = self
                    .get(&config.handler)
                    .cloned()
                    .ok_or_else(|| RouteError::UnknownHandler {
                        pattern: config.pattern.clone(),
                        handler: config.handler.clone(),
                    })?;
                Route::compile(&config.pattern, &config.method, endpoint)
            })
            .collect()
    }
}
