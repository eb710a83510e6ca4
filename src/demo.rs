//! Bundled demo application.
//!
//! Shows every handler style the dispatcher supports: views, positional and
//! named bindings, session attributes, guarded pages, uploads and JSON.

use maud::{html, DOCTYPE};
use serde_json::{json, Map, Value};

use front_controller::config::schema::{RouteConfig, SecurityConfig};
use front_controller::dispatch::ViewError;
use front_controller::handler::{HandlerOutput, ParamKind, ScalarKind};
use front_controller::routing::HandlerCatalog;
use front_controller::security::{authenticate_user, AccessRule};
use front_controller::{Arguments, Endpoint, HandlerError, ModelView, ParamDescriptor};

/// Route table used when the configuration declares none.
pub fn default_routes() -> Vec<RouteConfig> {
    [
        ("/", "GET", "home"),
        ("/users/{id}", "GET", "users.show"),
        ("/login", "POST", "auth.login"),
        ("/login", "GET", "auth.login_form"),
        ("/logout", "ANY", "auth.logout"),
        ("/access-denied", "GET", "auth.denied"),
        ("/admin", "GET", "admin.dashboard"),
        ("/upload", "POST", "files.upload"),
        ("/api/echo", "ANY", "api.echo"),
    ]
    .into_iter()
    .map(|(pattern, method, handler)| RouteConfig {
        pattern: pattern.to_string(),
        method: method.to_string(),
        handler: handler.to_string(),
    })
    .collect()
}

pub fn catalog(security: &SecurityConfig) -> HandlerCatalog {
    let login_config = security.clone();

    HandlerCatalog::new()
        .with(Endpoint::new("home", |_: Arguments| async {
            Ok::<_, HandlerError>(ModelView::new("home").with("title", "Front controller demo"))
        }))
        .with(
            Endpoint::new("users.show", |args: Arguments| async move {
                let id = args.text("id").unwrap_or_default().to_string();
                Ok::<_, HandlerError>(ModelView::new("user").with("user_id", id))
            })
            .param(ParamDescriptor::positional("id", ScalarKind::Text)),
        )
        .with(Endpoint::new("auth.login_form", |_: Arguments| async {
            Ok::<_, HandlerError>(login_form())
        }))
        .with(
            Endpoint::new("auth.login", move |args: Arguments| {
                let config = login_config.clone();
                async move {
                    let session = args.session().ok_or_else(|| HandlerError::msg("session unavailable"))?;
                    let user = args.text("user").unwrap_or_default();
                    let role = args.text("role").unwrap_or("user");
                    authenticate_user(session, &config, user, role);
                    Ok::<_, HandlerError>(format!("<p>Logged in as {user} ({role})</p>"))
                }
            })
            .param(ParamDescriptor::named("user", ScalarKind::Text))
            .param(ParamDescriptor::named("role", ScalarKind::Text).with_default("user"))
            .param(ParamDescriptor::session()),
        )
        .with(
            Endpoint::new("auth.logout", |args: Arguments| async move {
                if let Some(session) = args.session() {
                    session.invalidate();
                }
                Ok::<_, HandlerError>("<p>Logged out</p>")
            })
            .param(ParamDescriptor::session()),
        )
        .with(Endpoint::new("auth.denied", |_: Arguments| async {
            Ok::<_, HandlerError>("<p>Access denied</p>")
        }))
        .with(
            Endpoint::new("admin.dashboard", |args: Arguments| async move {
                let user = args.text("user").unwrap_or("unknown").to_string();
                Ok::<_, HandlerError>(ModelView::new("admin").with("user", user))
            })
            .param(ParamDescriptor::session_attribute("user", ParamKind::Scalar(ScalarKind::Text)))
            .access(AccessRule::roles(["admin"])),
        )
        .with(
            Endpoint::new("files.upload", |args: Arguments| async move {
                let file = args
                    .file("document")
                    .ok_or_else(|| HandlerError::new("MissingFile", "no file uploaded as 'document'"))?;
                HandlerOutput::json(json!({
                    "name": file.file_name,
                    "size": file.size(),
                    "content_type": file.content_type,
                }))
            })
            .param(ParamDescriptor::file("document"))
            .json(),
        )
        .with(
            Endpoint::new("api.echo", |args: Arguments| async move {
                Ok::<_, HandlerError>(Value::Object(args.map("params").cloned().unwrap_or_default()))
            })
            .param(ParamDescriptor::map("params"))
            .json(),
        )
}

fn login_form() -> String {
    html! {
        (DOCTYPE)
        html {
            body {
                form method="post" action="login" {
                    input name="user" placeholder="user";
                    input name="role" placeholder="role";
                    button type="submit" { "Log in" }
                }
            }
        }
    }
    .into_string()
}

fn text<'a>(model: &'a Map<String, Value>, key: &str) -> &'a str {
    model.get(key).and_then(Value::as_str).unwrap_or("")
}

/// Views of the demo application.
pub fn render_view(view: &str, model: &Map<String, Value>) -> Result<String, ViewError> {
    let body = match view {
        "home" => html! {
            h1 { (text(model, "title")) }
            ul {
                li { a href="users/42" { "User 42" } }
                li { a href="login" { "Log in" } }
                li { a href="admin" { "Admin" } }
            }
        },
        "user" => html! {
            h1 { "User " (text(model, "user_id")) }
        },
        "admin" => html! {
            h1 { "Admin" }
            p { "Signed in as " (text(model, "user")) }
        },
        other => return Err(ViewError::NotFound(other.to_string())),
    };

    Ok(html! {
        (DOCTYPE)
        html {
            head { meta charset="utf-8"; }
            body { (body) }
        }
    }
    .into_string())
}
