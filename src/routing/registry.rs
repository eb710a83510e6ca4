//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes in registration order
//! - Find the first route matching a path, or a path and method
//!
//! # Design Decisions
//! - Populated once at startup, read-only afterwards (shared via `Arc`)
//! - O(n) scan; first registered match wins, no specificity ranking
//! - Path-only lookup exists to tell 405 from 404

use axum::http::Method;

use crate::routing::route::{MethodPolicy, Route, RouteMethod};

#[derive(Debug, Clone, Default)]
pub struct RouteRegistry {
    routes: Vec<Route>,
    policy: MethodPolicy,
}

impl RouteRegistry {
    pub fn new(policy: MethodPolicy) -> Self {
        Self {
            routes: Vec::new(),
            policy,
        }
    }

    pub fn policy(&self) -> MethodPolicy {
        self.policy
    }

    pub fn register(&mut self, route: Route) {
        if self.policy == MethodPolicy::Legacy && route.method() == RouteMethod::Get {
            tracing::warn!(
                pattern = %route.pattern(),
                handler = %route.endpoint().name(),
                "GET route accepts every method under the legacy rule"
            );
        }
        self.routes.push(route);
    }

    pub fn register_all(&mut self, routes: impl IntoIterator<Item = Route>) {
        for route in routes {
            self.register(route);
        }
    }

    /// First route whose pattern matches, regardless of method.
    pub fn find_route(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.matches_path(path))
    }

    /// First route matching both path and method.
    pub fn find_route_for(&self, path: &str, method: &Method) -> Option<&Route> {
        self.routes
            .iter()
            .find(|r| r.matches_with(path, method, self.policy))
    }

    /// Methods accepted by any route matching `path`, for `Allow` headers.
    pub fn allowed_methods(&self, path: &str) -> Vec<RouteMethod> {
        let mut methods: Vec<RouteMethod> = Vec::new();
        for route in self.routes.iter().filter(|r| r.matches_path(path)) {
            if !methods.contains(&route.method()) {
                methods.push(route.method());
            }
        }
        methods
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Dump the route table at startup.
    pub fn log_routes(&self) {
        tracing::info!(count = self.routes.len(), policy = ?self.policy, "Route table");
        for (index, route) in self.routes.iter().enumerate() {
            tracing::info!(
                index,
                method = %route.method(),
                pattern = %route.pattern(),
                handler = %route.endpoint().name(),
                controller = %route.endpoint().controller.name,
                "Route registered"
            );
        }
    }
}

impl FromIterator<Route> for RouteRegistry {
    fn from_iter<I: IntoIterator<Item = Route>>(iter: I) -> Self {
        let mut registry = Self::default();
        registry.register_all(iter);
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Arguments, Endpoint, HandlerError};

    fn endpoint(name: &str) -> Endpoint {
        Endpoint::new(name, |_: Arguments| async { Ok::<_, HandlerError>(()) })
    }

    #[test]
    fn test_first_registered_wins() {
        let registry: RouteRegistry = [
            Route::get("/users/{id}", endpoint("by_id")).unwrap(),
            Route::get("/users/me", endpoint("me")).unwrap(),
        ]
        .into_iter()
        .collect();

        let route = registry.find_route_for("/users/me", &Method::GET).unwrap();
        assert_eq!(route.endpoint().name(), "by_id");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_method_mismatch_versus_missing() {
        let mut registry = RouteRegistry::new(MethodPolicy::Legacy);
        registry.register(Route::post("/submit", endpoint("submit")).unwrap());

        assert!(registry.find_route_for("/submit", &Method::GET).is_none());
        assert!(registry.find_route("/submit").is_some());
        assert_eq!(registry.allowed_methods("/submit"), vec![RouteMethod::Post]);
        assert!(registry.find_route("/nope").is_none());
    }

    #[test]
    fn test_strict_policy_applies_to_get_routes() {
        let mut registry = RouteRegistry::new(MethodPolicy::Strict);
        registry.register(Route::get("/page", endpoint("page")).unwrap());
        assert!(registry.find_route_for("/page", &Method::DELETE).is_none());
        assert!(registry.find_route_for("/page", &Method::GET).is_some());
    }

    #[test]
    fn test_same_path_different_methods() {
        let mut registry = RouteRegistry::new(MethodPolicy::Strict);
        registry.register_all([
            Route::get("/items", endpoint("list")).unwrap(),
            Route::post("/items", endpoint("create")).unwrap(),
        ]);
        let route = registry.find_route_for("/items", &Method::POST).unwrap();
        assert_eq!(route.endpoint().name(), "create");
        assert_eq!(
            registry.allowed_methods("/items"),
            vec![RouteMethod::Get, RouteMethod::Post]
        );
    }
}
