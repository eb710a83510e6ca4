//! The axum adapter, exercised in-process with `oneshot`.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use common::fixed;
use front_controller::config::FrontConfig;
use front_controller::handler::{ParamKind, ScalarKind};
use front_controller::routing::Route;
use front_controller::{Arguments, Dispatcher, Endpoint, HandlerError, HttpServer, ParamDescriptor};

fn app(config: FrontConfig) -> Router {
    let routes = vec![
        Route::get(
            "/users/{id}",
            Endpoint::new("users.show", |args: Arguments| async move {
                Ok::<_, HandlerError>(format!("user {}", args.text("id").unwrap_or_default()))
            })
            .param(ParamDescriptor::positional("id", ScalarKind::Text)),
        )
        .unwrap(),
        Route::get("/", fixed("home", "home")).unwrap(),
        Route::post(
            "/greet",
            Endpoint::new("greet", |args: Arguments| async move {
                Ok::<_, HandlerError>(format!("hello {}", args.text("name").unwrap_or_default()))
            })
            .param(ParamDescriptor::named("name", ScalarKind::Text)),
        )
        .unwrap(),
        Route::get(
            "/me",
            Endpoint::new("me", |args: Arguments| async move {
                Ok::<_, HandlerError>(args.text("user").unwrap_or("nobody").to_string())
            })
            .param(ParamDescriptor::session_attribute("user", ParamKind::Scalar(ScalarKind::Text))),
        )
        .unwrap(),
        Route::post(
            "/upload",
            Endpoint::new("upload", |args: Arguments| async move {
                let file = args
                    .file("doc")
                    .ok_or_else(|| HandlerError::new("MissingFile", "no upload"))?;
                Ok::<_, HandlerError>(serde_json::json!({
                    "file": file.file_name,
                    "size": file.size(),
                    "title": args.text("title"),
                }))
            })
            .param(ParamDescriptor::file("doc"))
            .param(ParamDescriptor::named("title", ScalarKind::Text).optional())
            .json(),
        )
        .unwrap(),
    ];

    let dispatcher = Dispatcher::initialize(&config, routes).unwrap();
    HttpServer::new(config, std::sync::Arc::new(dispatcher)).router()
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_context_path_is_stripped() {
    let mut config = FrontConfig::default();
    config.server.context_path = "/app".into();
    let app = app(config);

    let response = app.clone().oneshot(get("/app/users/5")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "user 5");

    let response = app.clone().oneshot(get("/app")).await.unwrap();
    assert_eq!(body_text(response).await, "home");

    let response = app.oneshot(get("/users/5")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_request_id_is_set_and_propagated() {
    let app = app(FrontConfig::default());

    let response = app.clone().oneshot(get("/")).await.unwrap();
    assert!(response.headers().contains_key("x-request-id"));

    let request = Request::builder()
        .uri("/")
        .header("x-request-id", "trace-me")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "trace-me");
}

#[tokio::test]
async fn test_urlencoded_form_is_bound() {
    let request = Request::builder()
        .method("POST")
        .uri("/greet")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("name=J%C3%BCrgen"))
        .unwrap();
    let response = app(FrontConfig::default()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "hello Jürgen");
}

#[tokio::test]
async fn test_missing_form_field_is_500_page() {
    let request = Request::builder().method("POST").uri("/greet").body(Body::empty()).unwrap();
    let response = app(FrontConfig::default()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_text(response).await.contains("name"));
}

#[tokio::test]
async fn test_session_cookie_round_trip() {
    let mut config = FrontConfig::default();
    config.server.context_path = "/app".into();
    let app = app(config);

    let response = app.clone().oneshot(get("/app/me?user=alice")).await.unwrap();
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(cookie.starts_with("SESSIONID="));
    assert!(cookie.contains("Path=/app"));
    assert!(cookie.contains("HttpOnly"));
    assert_eq!(body_text(response).await, "alice");

    let pair = cookie.split(';').next().unwrap().to_string();
    let request = Request::builder()
        .uri("/app/me")
        .header(header::COOKIE, pair)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert_eq!(body_text(response).await, "alice");

    let response = app.oneshot(get("/app/me")).await.unwrap();
    assert_eq!(body_text(response).await, "nobody");
}

#[tokio::test]
async fn test_multipart_upload() {
    let boundary = "XBOUNDARYX";
    let body = format!(
        "--{b}\r\n\
         Content-Disposition: form-data; name=\"title\"\r\n\r\n\
         Quarterly\r\n\
         --{b}\r\n\
         Content-Disposition: form-data; name=\"doc\"; filename=\"report.txt\"\r\n\
         Content-Type: text/plain\r\n\r\n\
         hello world\r\n\
         --{b}--\r\n",
        b = boundary
    );
    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
        .body(Body::from(body))
        .unwrap();

    let response = app(FrontConfig::default()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let doc: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(doc["status"], "success");
    assert_eq!(doc["data"]["file"], "report.txt");
    assert_eq!(doc["data"]["size"], 11);
    assert_eq!(doc["data"]["title"], "Quarterly");
}

#[tokio::test]
async fn test_static_files_served_before_routes() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("site.css"), "body{}").unwrap();

    let mut config = FrontConfig::default();
    config.static_files.root = Some(dir.path().to_string_lossy().into_owned());
    let app = app(config);

    let response = app.clone().oneshot(get("/site.css")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/css");
    assert_eq!(body_text(response).await, "body{}");

    let response = app.oneshot(get("/missing.css")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_405_carries_allow_header() {
    let response = app(FrontConfig::default()).oneshot(get("/upload")).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()[header::ALLOW], "POST");
}
