//! Handler argument resolution.
//!
//! Each declared parameter is resolved from the first applicable source:
//!
//! 1. request, response and session injection by kind
//! 2. the aggregate parameter map
//! 3. session attributes (written when the request carries the name, else read)
//! 4. structured objects via the object binder
//! 5. uploaded files by name
//! 6. named path/query values with an optional literal default
//! 7. the next positional value not already read by a named binding or
//!    session attribute write
//!
//! Only a missing required named value or session attribute is an error.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::binding::convert::convert_value;
use crate::binding::object::bind_object;
use crate::handler::arguments::{Argument, Arguments};
use crate::handler::signature::{HandlerSignature, ParamDescriptor, ParamKind, ParamSource};
use crate::http::request::DispatchRequest;
use crate::http::response::ResponseSlot;
use crate::routing::pattern::PathParams;
use crate::session::RequestSession;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("missing required parameter '{name}'")]
    MissingParameter { name: String },

    #[error("missing required session attribute '{name}'")]
    MissingSessionAttribute { name: String },
}

/// Resolves handler arguments for one request.
pub struct ParameterResolver<'a> {
    request: &'a Arc<DispatchRequest>,
    response: &'a ResponseSlot,
    session: &'a RequestSession,
    path_params: &'a PathParams,
}

impl<'a> ParameterResolver<'a> {
    pub fn new(
        request: &'a Arc<DispatchRequest>,
        response: &'a ResponseSlot,
        session: &'a RequestSession,
        path_params: &'a PathParams,
    ) -> Self {
        Self {
            request,
            response,
            session,
            path_params,
        }
    }

    /// Path params, then query/body params, then request attributes; later
    /// sources overwrite earlier ones.
    pub fn aggregate_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        for (name, value) in self.path_params.iter() {
            map.insert(name.to_string(), Value::String(value.to_string()));
        }
        for (name, values) in self.request.params.iter() {
            let value = match values {
                [single] => Value::String(single.clone()),
                many => Value::Array(many.iter().cloned().map(Value::String).collect()),
            };
            map.insert(name.to_string(), value);
        }
        for (name, value) in &self.request.attributes {
            map.insert(name.clone(), value.clone());
        }
        map
    }

    /// Path values in pattern order, then the first value of each query/body
    /// param, skipping every source name in `consumed`.
    fn positional_values(&self, consumed: &HashSet<&str>) -> Vec<&'a str> {
        let request: &'a DispatchRequest = self.request;
        let path: &'a PathParams = self.path_params;
        path.iter()
            .chain(
                request
                    .params
                    .iter()
                    .filter_map(|(name, values)| values.first().map(|v| (name, v.as_str()))),
            )
            .filter(|(name, _)| !consumed.contains(*name))
            .map(|(_, value)| value)
            .collect()
    }

    /// Source names already read by named bindings or written to the session.
    fn consumed_names<'s>(
        signature: &'s HandlerSignature,
        aggregate: &Map<String, Value>,
    ) -> HashSet<&'s str> {
        signature
            .params()
            .iter()
            .filter_map(|param| match (&param.kind, &param.source) {
                (ParamKind::Scalar(_), ParamSource::Named { name, .. }) => Some(name.as_str()),
                (_, ParamSource::SessionAttribute { name, .. }) if aggregate.contains_key(name) => {
                    Some(name.as_str())
                }
                _ => None,
            })
            .collect()
    }

    pub fn resolve(&self, signature: &HandlerSignature) -> Result<Arguments, ResolveError> {
        let aggregate = self.aggregate_map();
        let consumed = Self::consumed_names(signature, &aggregate);
        let mut positional = self.positional_values(&consumed).into_iter();
        let mut args = Arguments::new();

        for param in signature.params() {
            let argument = self.resolve_one(param, &aggregate, &mut positional)?;
            tracing::trace!(param = %param.name, argument = ?argument, "Parameter resolved");
            args.push(param.name.clone(), argument);
        }

        Ok(args)
    }

    fn resolve_one(
        &self,
        param: &ParamDescriptor,
        aggregate: &Map<String, Value>,
        positional: &mut impl Iterator<Item = &'a str>,
    ) -> Result<Argument, ResolveError> {
        let argument = match (&param.kind, &param.source) {
            (ParamKind::Request, _) => Argument::Request(self.request.clone()),
            (ParamKind::Response, _) => Argument::Response(self.response.clone()),
            (ParamKind::Session, _) => Argument::Session(self.session.get_or_create()),
            (ParamKind::Map, _) => Argument::Map(aggregate.clone()),
            (kind, ParamSource::SessionAttribute { name, required }) => {
                return self.session_attribute(kind, name, *required, aggregate);
            }
            (ParamKind::Object(schema), _) => Argument::Value(bind_object(schema, aggregate, "")),
            (ParamKind::File, _) => {
                Argument::File(self.request.uploaded_file(param.source_name()).cloned())
            }
            (
                ParamKind::Scalar(kind),
                ParamSource::Named {
                    name,
                    required,
                    default,
                },
            ) => {
                let raw = self
                    .path_params
                    .get(name)
                    .or_else(|| self.request.params.first(name))
                    .or(default.as_deref());
                match raw {
                    Some(raw) => Argument::Value(kind.convert(raw)),
                    None if *required => {
                        return Err(ResolveError::MissingParameter { name: name.clone() })
                    }
                    None => Argument::Value(Value::Null),
                }
            }
            (ParamKind::Scalar(kind), ParamSource::Inferred) => Argument::Value(match positional.next() {
                Some(raw) => kind.convert(raw),
                None => kind.zero(),
            }),
        };
        Ok(argument)
    }

    fn session_attribute(
        &self,
        kind: &ParamKind,
        name: &str,
        required: bool,
        aggregate: &Map<String, Value>,
    ) -> Result<Argument, ResolveError> {
        if let Some(incoming) = aggregate.get(name) {
            let value = convert_value(kind, incoming);
            self.session.get_or_create().set(name, value.clone());
            tracing::debug!(attribute = %name, "Session attribute written from request");
            return Ok(Argument::Value(value));
        }

        match self.session.attribute(name) {
            Some(stored) => Ok(Argument::Value(convert_value(kind, &stored))),
            None if required => Err(ResolveError::MissingSessionAttribute {
                name: name.to_string(),
            }),
            None => Ok(Argument::Value(Value::Null)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::object::ObjectSchema;
    use crate::handler::signature::ScalarKind;
    use crate::http::multipart::UploadedFile;
    use crate::session::{MemorySessionStore, SessionStore};
    use serde_json::json;

    struct Fixture {
        request: Arc<DispatchRequest>,
        response: ResponseSlot,
        session: RequestSession,
        path: PathParams,
    }

    impl Fixture {
        fn new(request: DispatchRequest, path: &[(&str, &str)]) -> Self {
            let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new(None));
            Self::with_store(request, path, store)
        }

        fn with_store(request: DispatchRequest, path: &[(&str, &str)], store: Arc<dyn SessionStore>) -> Self {
            let incoming = request.session_id.clone();
            Self {
                request: Arc::new(request),
                response: ResponseSlot::new(),
                session: RequestSession::new(store, incoming),
                path: path.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            }
        }

        fn resolve(&self, signature: &HandlerSignature) -> Result<Arguments, ResolveError> {
            ParameterResolver::new(&self.request, &self.response, &self.session, &self.path).resolve(signature)
        }
    }

    #[test]
    fn test_named_path_wins_over_query() {
        let fx = Fixture::new(DispatchRequest::get("/users/42").with_param("id", "7"), &[("id", "42")]);
        let sig = HandlerSignature::new().param(ParamDescriptor::named("id", ScalarKind::Text));
        let args = fx.resolve(&sig).unwrap();
        assert_eq!(args.text("id"), Some("42"));
    }

    #[test]
    fn test_named_default_and_missing() {
        let fx = Fixture::new(DispatchRequest::get("/list"), &[]);
        let sig = HandlerSignature::new()
            .param(ParamDescriptor::named("page", ScalarKind::Int).with_default("1"))
            .param(ParamDescriptor::named("q", ScalarKind::Text).optional());
        let args = fx.resolve(&sig).unwrap();
        assert_eq!(args.int("page"), Some(1));
        assert_eq!(args.get("q"), Some(&Argument::Value(Value::Null)));

        let sig = HandlerSignature::new().param(ParamDescriptor::named("q", ScalarKind::Text));
        assert_eq!(
            fx.resolve(&sig).unwrap_err(),
            ResolveError::MissingParameter { name: "q".into() }
        );
    }

    #[test]
    fn test_positional_never_fails() {
        let fx = Fixture::new(
            DispatchRequest::get("/p/5").with_param("flag", "true").with_param("x", "1"),
            &[("n", "5")],
        );
        let sig = HandlerSignature::new()
            .param(ParamDescriptor::request())
            .param(ParamDescriptor::positional("n", ScalarKind::Int))
            .param(ParamDescriptor::positional("flag", ScalarKind::Bool))
            .param(ParamDescriptor::positional("x", ScalarKind::Double))
            .param(ParamDescriptor::positional("extra", ScalarKind::Text))
            .param(ParamDescriptor::positional("more", ScalarKind::Long));
        let args = fx.resolve(&sig).unwrap();
        assert_eq!(args.int("n"), Some(5));
        assert_eq!(args.bool("flag"), Some(true));
        assert_eq!(args.float("x"), Some(1.0));
        assert_eq!(args.text("extra"), Some(""));
        assert_eq!(args.int("more"), Some(0));
        assert_eq!(args.len(), 6);
    }

    #[test]
    fn test_aggregate_map_precedence() {
        let fx = Fixture::new(
            DispatchRequest::get("/a/1")
                .with_param("id", "query")
                .with_param("tag", "x")
                .with_param("tag", "y")
                .with_param("who", "param")
                .with_attribute("who", "attribute"),
            &[("id", "1")],
        );
        let map = fx.resolve(&HandlerSignature::new().param(ParamDescriptor::map("all"))).unwrap();
        let map = map.map("all").unwrap();
        assert_eq!(map["id"], json!("query"));
        assert_eq!(map["tag"], json!(["x", "y"]));
        assert_eq!(map["who"], json!("attribute"));
    }

    #[test]
    fn test_session_attribute_write_then_read() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new(None));
        let sig = HandlerSignature::new().param(ParamDescriptor::session_attribute(
            "user",
            ParamKind::Scalar(ScalarKind::Text),
        ));

        let write = Fixture::with_store(DispatchRequest::post("/login").with_param("user", "alice"), &[], store.clone());
        assert_eq!(write.resolve(&sig).unwrap().text("user"), Some("alice"));
        let id = write.session.created_id().unwrap();
        assert_eq!(store.get(&id, "user"), Some(json!("alice")));

        let read = Fixture::with_store(DispatchRequest::get("/me").with_session(id), &[], store);
        assert_eq!(read.resolve(&sig).unwrap().text("user"), Some("alice"));
    }

    #[test]
    fn test_required_session_attribute_missing() {
        let fx = Fixture::new(DispatchRequest::get("/me"), &[]);
        let sig = HandlerSignature::new().param(
            ParamDescriptor::session_attribute("user", ParamKind::Scalar(ScalarKind::Text)).required(),
        );
        assert_eq!(
            fx.resolve(&sig).unwrap_err(),
            ResolveError::MissingSessionAttribute { name: "user".into() }
        );
        assert!(fx.session.created_id().is_none());

        let optional = HandlerSignature::new().param(ParamDescriptor::session_attribute(
            "user",
            ParamKind::Scalar(ScalarKind::Text),
        ));
        assert_eq!(fx.resolve(&optional).unwrap().value("user"), None);
    }

    #[test]
    fn test_object_and_file_binding() {
        let file = UploadedFile::new("avatar", "me.png", &b"png"[..]);
        let fx = Fixture::new(
            DispatchRequest::post("/profile")
                .with_param("name", "ann")
                .with_param("age", "30")
                .with_file(file.clone()),
            &[],
        );
        let schema = ObjectSchema::new("Profile")
            .field("name", ScalarKind::Text)
            .field("age", ScalarKind::Int);
        let sig = HandlerSignature::new()
            .param(ParamDescriptor::object("profile", schema))
            .param(ParamDescriptor::file("avatar"))
            .param(ParamDescriptor::file("cv"));
        let args = fx.resolve(&sig).unwrap();
        assert_eq!(args.value("profile"), Some(&json!({"name": "ann", "age": 30})));
        assert_eq!(args.file("avatar"), Some(&file));
        assert_eq!(args.get("cv"), Some(&Argument::File(None)));
    }

    #[test]
    fn test_resolution_is_repeatable() {
        let fx = Fixture::new(DispatchRequest::get("/u/9").with_param("q", "x"), &[("id", "9")]);
        let sig = HandlerSignature::new()
            .param(ParamDescriptor::named("id", ScalarKind::Int))
            .param(ParamDescriptor::positional("first", ScalarKind::Text))
            .param(ParamDescriptor::response());
        assert_eq!(fx.resolve(&sig).unwrap(), fx.resolve(&sig).unwrap());
    }

    #[test]
    fn test_positional_skips_values_read_by_name() {
        let fx = Fixture::new(DispatchRequest::get("/u/9").with_param("x", "5"), &[("id", "9")]);
        let sig = HandlerSignature::new()
            .param(ParamDescriptor::named("id", ScalarKind::Int))
            .param(ParamDescriptor::positional("x", ScalarKind::Text));
        let args = fx.resolve(&sig).unwrap();
        assert_eq!(args.int("id"), Some(9));
        assert_eq!(args.text("x"), Some("5"));

        let fx = Fixture::new(
            DispatchRequest::post("/login").with_param("user", "ann").with_param("note", "hi"),
            &[],
        );
        let sig = HandlerSignature::new()
            .param(ParamDescriptor::session_attribute("user", ParamKind::Scalar(ScalarKind::Text)))
            .param(ParamDescriptor::positional("first", ScalarKind::Text));
        assert_eq!(fx.resolve(&sig).unwrap().text("first"), Some("hi"));
    }

    #[test]
    fn test_request_value_overwrites_stored_attribute() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new(None));
        let id = store.create();
        store.set(&id, "user", json!("alice"));
        let sig = HandlerSignature::new().param(ParamDescriptor::session_attribute(
            "user",
            ParamKind::Scalar(ScalarKind::Text),
        ));

        let fx = Fixture::with_store(
            DispatchRequest::post("/login").with_param("user", "bob").with_session(id.clone()),
            &[],
            store.clone(),
        );
        assert_eq!(fx.resolve(&sig).unwrap().text("user"), Some("bob"));
        assert_eq!(store.get(&id, "user"), Some(json!("bob")));
        assert!(fx.session.created_id().is_none());
    }
}
