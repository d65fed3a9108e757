//! HTTP transport tests against an in-process admin gateway.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::post;
use serde_json::{Value, json};

use corral_admin::{AdminCommand, ErrorClass, HttpTransport, Session, TransportConfig};
use corral_core::{Endpoint, Principal};

async fn admin_command(
    headers: HeaderMap,
    Json(command): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let authorized = headers.contains_key(header::AUTHORIZATION);

    if command.get("ping").is_some() {
        return (StatusCode::OK, Json(json!({"ok": 1})));
    }
    if command.get("authenticate").is_some() {
        return if command["pwd"] == "rapadura" {
            (StatusCode::OK, Json(json!({"ok": 1})))
        } else {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({"ok": 0, "code": 18, "codeName": "AuthenticationFailed", "errmsg": "Authentication failed."})),
            )
        };
    }
    if command.get("addShard").is_some() {
        return if authorized {
            (StatusCode::OK, Json(json!({"ok": 1, "shardAdded": "rs3"})))
        } else {
            (
                StatusCode::OK,
                Json(json!({"ok": 0, "code": 13, "codeName": "Unauthorized", "errmsg": "command addShard requires authentication"})),
            )
        };
    }
    (StatusCode::BAD_REQUEST, Json(json!({"ok": 0, "errmsg": "no such command"})))
}

async fn spawn_gateway() -> Endpoint {
    serve(Router::new().route("/admin/command", post(admin_command))).await
}

async fn serve(app: Router) -> Endpoint {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let port = listener.local_addr().expect("local addr").port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    Endpoint::loopback(port)
}

fn transport() -> Arc<HttpTransport> {
    let config = TransportConfig {
        scheme: "http".to_string(),
        request_timeout: Duration::from_secs(5),
    };
    Arc::new(HttpTransport::new(&config).expect("transport"))
}

#[tokio::test]
async fn ping_round_trip() {
    let endpoint = spawn_gateway().await;
    let session = Session::new(endpoint, transport());
    let reply = session.run(&AdminCommand::Ping).await.unwrap();
    assert_eq!(reply["ok"], 1);
}

#[tokio::test]
async fn error_status_with_document_is_classified() {
    let endpoint = spawn_gateway().await;
    let mut session = Session::new(endpoint, transport());

    let err = session
        .authenticate(&Principal::new("root", "wrong", &["root"]))
        .await
        .unwrap_err();
    assert_eq!(err.class, ErrorClass::Auth);
    assert_eq!(err.code, Some(18));
}

#[tokio::test]
async fn authenticated_session_sends_basic_auth() {
    let endpoint = spawn_gateway().await;
    let mut session = Session::new(endpoint, transport());
    let shard = "rs3/127.0.0.1:40031".parse().unwrap();

    let err = session.run(&AdminCommand::AddShard(shard)).await.unwrap_err();
    assert_eq!(err.class, ErrorClass::Auth);

    session
        .authenticate(&Principal::new("root", "rapadura", &["root"]))
        .await
        .unwrap();
    let shard = "rs3/127.0.0.1:40031".parse().unwrap();
    let reply = session.run(&AdminCommand::AddShard(shard)).await.unwrap();
    assert_eq!(reply["shardAdded"], "rs3");
}

#[tokio::test]
async fn unknown_command_is_rejected() {
    let endpoint = spawn_gateway().await;
    let session = Session::new(endpoint, transport());
    let err = session.run(&AdminCommand::BuildInfo).await.unwrap_err();
    assert_eq!(err.class, ErrorClass::Rejected);
    assert_eq!(err.message, "no such command");
}

#[tokio::test]
async fn refused_connection_is_connectivity() {
    // Bind and drop to find a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let session = Session::new(Endpoint::loopback(port), transport());
    let err = session.run(&AdminCommand::Ping).await.unwrap_err();
    assert_eq!(err.class, ErrorClass::Connectivity);
}

#[tokio::test]
async fn gateway_without_upstream_is_connectivity() {
    let endpoint = serve(Router::new().route(
        "/admin/command",
        post(|| async { (StatusCode::BAD_GATEWAY, "upstream not ready") }),
    ))
    .await;

    let session = Session::new(endpoint, transport());
    let err = session.run(&AdminCommand::Ping).await.unwrap_err();
    assert_eq!(err.class, ErrorClass::Connectivity);
    assert!(err.class.is_connection_level());
}

#[tokio::test]
async fn server_error_without_document_is_rejected() {
    let endpoint = serve(Router::new().route(
        "/admin/command",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    ))
    .await;

    let session = Session::new(endpoint, transport());
    let err = session.run(&AdminCommand::Ping).await.unwrap_err();
    assert_eq!(err.class, ErrorClass::Rejected);
}
