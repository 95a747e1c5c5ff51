use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tower::ServiceExt;
use yaml2json_core::handler::{build_router, AppState};
use yaml2json_core::translate::YamlToJson;
use yaml2json_core::types::Config;

fn app_with(config: Config) -> Router {
    build_router(AppState::new(config, Arc::new(YamlToJson)).expect("state"))
}

fn app() -> Router {
    app_with(Config::default())
}

fn app_with_key(key: &str) -> Router {
    app_with(Config {
        auth_key: key.to_string(),
        ..Config::default()
    })
}

async fn call(app: Router, request: Request<Body>) -> (StatusCode, String, String) {
    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (
        status,
        content_type,
        String::from_utf8(body.to_vec()).expect("utf8"),
    )
}

fn post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/x-yaml")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn error_of(body: &str) -> String {
    let value: serde_json::Value = serde_json::from_str(body).expect("json");
    value["error"].as_str().unwrap_or_default().to_string()
}

/// Serves `body` at `/doc.yaml` with `status` on an ephemeral port.
async fn spawn_yaml_source(status: StatusCode, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let source = Router::new().route("/doc.yaml", get(move || async move { (status, body) }));
    tokio::spawn(async move {
        let _ = axum::serve(listener, source).await;
    });
    format!("http://{addr}/doc.yaml")
}

#[tokio::test]
async fn yaml_body_is_converted() {
    let (status, content_type, body) =
        call(app(), post("/", "\nfoo: bar\nbaz:\n  - qux\n  - quux\n")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type, "application/json");
    assert_eq!(body.trim(), r#"{"baz":["qux","quux"],"foo":"bar"}"#);
}

#[tokio::test]
async fn yaml_from_url_is_converted() {
    let url = spawn_yaml_source(StatusCode::OK, "\nfoo: bar\nnumbers:\n  - 1\n  - 2\n").await;
    let request = Request::builder()
        .method("GET")
        .uri(format!("/?url={url}"))
        .body(Body::empty())
        .expect("request");
    let (status, _, body) = call(app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.trim(), r#"{"foo":"bar","numbers":[1,2]}"#);
}

#[tokio::test]
async fn url_overrides_the_request_body() {
    let url = spawn_yaml_source(StatusCode::OK, "from: url\n").await;
    let (status, _, body) = call(app(), post(&format!("/?url={url}"), "from: body\n")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.trim(), r#"{"from":"url"}"#);
}

#[tokio::test]
async fn non_success_remote_bodies_are_still_translated() {
    let url = spawn_yaml_source(StatusCode::NOT_FOUND, "missing: true\n").await;
    let request = Request::builder()
        .uri(format!("/?url={url}"))
        .body(Body::empty())
        .expect("request");
    let (status, _, body) = call(app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.trim(), r#"{"missing":true}"#);
}

#[tokio::test]
async fn query_key_admits() {
    let (status, _, _) = call(app_with_key("secret"), post("/?key=secret", "foo: bar")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn basic_auth_admits() {
    let mut request = post("/", "foo: bar");
    let encoded = STANDARD.encode(":secret");
    request.headers_mut().insert(
        AUTHORIZATION,
        format!("Basic {encoded}").parse().expect("header"),
    );
    let (status, _, body) = call(app_with_key("secret"), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.trim(), r#"{"foo":"bar"}"#);
}

#[tokio::test]
async fn missing_credentials_are_unauthorized() {
    let (status, content_type, body) = call(app_with_key("secret"), post("/", "foo: bar")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(content_type, "application/json");
    assert_eq!(body, "{\"error\":\"Unauthorized\"}\n");
}

#[tokio::test]
async fn wrong_key_is_unauthorized() {
    let (status, _, body) = call(app_with_key("secret"), post("/?key=guess", "foo: bar")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_of(&body), "Unauthorized");
}

#[tokio::test]
async fn no_key_configured_bypasses_auth() {
    let (status, _, _) = call(app(), post("/", "foo: bar")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn empty_request_is_rejected() {
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .body(Body::empty())
        .expect("request");
    let (status, content_type, body) = call(app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(content_type, "application/json");
    assert_eq!(error_of(&body), "No YAML to convert");
}

#[tokio::test]
async fn invalid_yaml_is_a_server_error() {
    let (status, _, body) = call(app(), post("/", "foo: bar: baz")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_of(&body), "Failed to convert YAML to JSON");
}

#[tokio::test]
async fn invalid_url_is_a_fetch_failure() {
    let request = Request::builder()
        .method("GET")
        .uri("/?url=invalid-url")
        .body(Body::empty())
        .expect("request");
    let (status, _, body) = call(app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_of(&body), "Failed to fetch YAML from given URL");
}

#[tokio::test]
async fn unreachable_url_ignores_the_body() {
    // Bind then drop to get a port nobody listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let uri = format!("/?url=http://{addr}/doc.yaml");
    let (status, _, body) = call(app(), post(&uri, "foo: bar")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_of(&body), "Failed to fetch YAML from given URL");
}

/// Accepts one connection, writes `head` and then holds the socket open.
async fn spawn_stalled_source(head: &'static [u8]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let _ = socket.write_all(head).await;
        tokio::time::sleep(Duration::from_secs(60)).await;
    });
    format!("http://{addr}/doc.yaml")
}

fn app_with_fetch_timeout(timeout: Duration) -> Router {
    app_with(Config {
        fetch_timeout: Some(timeout),
        ..Config::default()
    })
}

#[tokio::test]
async fn silent_remote_source_times_out_as_a_fetch_failure() {
    let url = spawn_stalled_source(b"").await;
    let started = Instant::now();
    let (status, _, body) = call(
        app_with_fetch_timeout(Duration::from_secs(1)),
        post(&format!("/?url={url}"), ""),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_of(&body), "Failed to fetch YAML from given URL");
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn remote_body_stalling_mid_stream_is_a_fetch_failure() {
    let url =
        spawn_stalled_source(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\na: 1\n").await;
    let started = Instant::now();
    let (status, _, body) = call(
        app_with_fetch_timeout(Duration::from_secs(1)),
        post(&format!("/?url={url}"), ""),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_of(&body), "Failed to fetch YAML from given URL");
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn auth_is_checked_before_the_fetch() {
    let request = Request::builder()
        .uri("/?url=invalid-url")
        .body(Body::empty())
        .expect("request");
    let (status, _, _) = call(app_with_key("secret"), request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn handler_ignores_the_http_method() {
    for method in ["PUT", "PATCH", "DELETE"] {
        let request = Request::builder()
            .method(method)
            .uri("/")
            .body(Body::from("a: 1"))
            .expect("request");
        let (status, _, body) = call(app(), request).await;
        assert_eq!(status, StatusCode::OK, "method {method}");
        assert_eq!(body.trim(), r#"{"a":1}"#);
    }
}

#[tokio::test]
async fn root_sub_path_serves_every_path() {
    let (status, _, _) = call(app(), post("/any/nested/path", "a: 1")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn exact_sub_path_only_serves_itself() {
    let config = Config {
        url_sub_path: "/convert".to_string(),
        ..Config::default()
    };
    let (status, _, _) = call(app_with(config.clone()), post("/convert", "a: 1")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = call(app_with(config.clone()), post("/", "a: 1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = call(app_with(config), post("/convert/more", "a: 1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn trailing_slash_sub_path_serves_its_subtree() {
    let config = Config {
        url_sub_path: "/api/".to_string(),
        ..Config::default()
    };
    let (status, _, _) = call(app_with(config.clone()), post("/api/", "a: 1")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = call(app_with(config.clone()), post("/api/v1/yaml", "a: 1")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = call(app_with(config), post("/other", "a: 1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn served_over_tcp_end_to_end() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let config = Config {
        auth_key: "secret".to_string(),
        ..Config::default()
    };
    tokio::spawn(yaml2json_core::server::serve_on(
        listener,
        config,
        Arc::new(YamlToJson),
    ));

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{addr}/?key=secret"))
        .body("foo: bar\nbaz:\n  - qux\n  - quux\n")
        .send()
        .await
        .expect("send");
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("application/json")
    );
    let text = response.text().await.expect("text");
    assert_eq!(text, "{\"baz\":[\"qux\",\"quux\"],\"foo\":\"bar\"}\n");

    let denied = client
        .post(format!("http://{addr}/"))
        .body("foo: bar")
        .send()
        .await
        .expect("send");
    assert_eq!(denied.status().as_u16(), 401);

    let empty = client
        .post(format!("http://{addr}/?key=secret"))
        .send()
        .await
        .expect("send");
    assert_eq!(empty.status().as_u16(), 400);
    assert_eq!(error_of(&empty.text().await.expect("text")), "No YAML to convert");
}
