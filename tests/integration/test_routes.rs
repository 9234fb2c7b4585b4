// Router-level tests for every role, mostly via tower::ServiceExt::oneshot

use crate::common::*;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use elicitation_relay::api::{capability, requester, transfer, CapabilityState, RequesterState, TransferState};
use elicitation_relay::capability::CapabilityServer;
use elicitation_relay::config::{Config, Role};
use elicitation_relay::core::models::{ElicitationDescriptor, ToolOutcome};
use elicitation_relay::core::trace::TRACE_HEADER;
use elicitation_relay::flow::FlowRecorder;
use elicitation_relay::requester::{KeywordDecider, Requester};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tower::ServiceExt;

fn capability_app() -> axum::Router {
    let config = Config::test_config(Role::CapabilityServer);
    capability::router(CapabilityState {
        server: Arc::new(CapabilityServer::new(UPLOAD_URL)),
        config: Arc::new(config),
    })
}

fn requester_app(client: Arc<StubCapabilityClient>) -> axum::Router {
    let config = Config::test_config(Role::Requester);
    let requester = Requester::new(Arc::new(KeywordDecider::new()), client, Arc::new(FlowRecorder::new()));
    requester::router(RequesterState {
        requester: Arc::new(requester),
        config: Arc::new(config),
    })
}

fn transfer_app(store: Arc<MemoryBlobStore>) -> axum::Router {
    let config = Config::test_config(Role::Transfer);
    transfer::router(TransferState::new(store, &config))
}

fn json_post(uri: &str, body: Value, trace_id: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(t) = trace_id {
        builder = builder.header(TRACE_HEADER, t);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn upload_request(field: &str, bytes: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header("content-type", multipart_content_type())
        .body(Body::from(multipart_body(field, "report.pdf", bytes)))
        .unwrap()
}

// Capability server

#[tokio::test]
async fn test_mcp_interactive_call_returns_deferral() {
    let body = json!({
        "jsonrpc": "2.0",
        "id": 2,
        "method": "tools/call",
        "params": {"name": "request_file_process", "arguments": {"message": "Pick", "mode": "ui"}}
    });
    let response = capability_app().oneshot(json_post("/mcp", body, Some("cap-1"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(TRACE_HEADER).unwrap(), "cap-1");
    let json = body_json(response).await;
    assert_eq!(json["id"], 2);
    assert_eq!(json["error"]["code"], -32042);
    assert_eq!(json["error"]["data"]["url"], UPLOAD_URL);
    assert!(json.get("result").is_none());
}

#[tokio::test]
async fn test_mcp_scenario_c_unknown_tool() {
    let body = json!({
        "jsonrpc": "2.0",
        "id": 3,
        "method": "tools/call",
        "params": {"name": "unknown_tool", "arguments": {}}
    });
    let response = capability_app().oneshot(json_post("/mcp", body, None)).await.unwrap();
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], -32601);
    assert!(json["error"]["message"].as_str().unwrap().contains("unknown_tool"));
}

#[tokio::test]
async fn test_mcp_invalid_json_is_parse_error() {
    let request = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json")
        .body(Body::from("{oops"))
        .unwrap();
    let response = capability_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], -32700);
    assert_eq!(json["id"], Value::Null);
}

#[tokio::test]
async fn test_health_reports_role() {
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let json = body_json(capability_app().oneshot(request).await.unwrap()).await;
    assert_eq!(json, json!({"status": "ok", "service": "capability-server"}));
}

// Requester

#[tokio::test]
async fn test_chat_returns_interactive_elicitation_and_echoes_trace() {
    let client = Arc::new(StubCapabilityClient::returning(ToolOutcome::Deferred(
        ElicitationDescriptor::url("Pick a file", UPLOAD_URL),
    )));
    let app = requester_app(client.clone());

    let response = app
        .oneshot(json_post("/chat", json!({"message": "process a file"}), Some("chat-7")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(TRACE_HEADER).unwrap(), "chat-7");
    let json = body_json(response).await;
    assert_eq!(json["elicitation"]["mode"], "interactive");
    assert_eq!(json["elicitation"]["url"], UPLOAD_URL);
    assert_eq!(client.calls()[0].trace.as_str(), "chat-7");
}

#[tokio::test]
async fn test_chat_generates_trace_when_absent() {
    let client = Arc::new(StubCapabilityClient::returning(ToolOutcome::fault("x")));
    let response = requester_app(client.clone())
        .oneshot(json_post("/chat", json!({"message": "upload"}), None))
        .await
        .unwrap();

    let header = response.headers().get(TRACE_HEADER).unwrap().to_str().unwrap().to_string();
    assert_eq!(header.len(), 8);
    assert_eq!(client.calls()[0].trace.as_str(), header);
}

#[tokio::test]
async fn test_chat_small_talk_has_null_elicitation() {
    let client = Arc::new(StubCapabilityClient::returning(ToolOutcome::fault("unused")));
    let json = body_json(
        requester_app(client)
            .oneshot(json_post("/chat", json!({"message": "hi", "has_attached_file": false}), None))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(json["elicitation"], Value::Null);
    assert!(!json["response"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_completion_requires_file_id() {
    let client = Arc::new(StubCapabilityClient::returning(ToolOutcome::fault("unused")));
    for body in [json!({}), json!({"file_id": ""}), json!({"file_id": 42})] {
        let response = requester_app(client.clone())
            .oneshot(json_post("/elicitation/complete", body, Some("done-1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["trace_id"], "done-1");
        assert!(json["error"].as_str().unwrap().contains("file_id"));
    }
}

#[tokio::test]
async fn test_completion_acknowledges() {
    let client = Arc::new(StubCapabilityClient::returning(ToolOutcome::fault("unused")));
    let response = requester_app(client)
        .oneshot(json_post("/elicitation/complete", json!({"file_id": "f-1", "filename": "a.txt"}), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"status": "success", "message": "File upload completed"})
    );
}

// Transfer endpoint

#[tokio::test]
async fn test_scenario_d_every_upload_gets_a_fresh_id() {
    let store = Arc::new(MemoryBlobStore::default());
    let mut ids = HashSet::new();

    for n in 0..5 {
        let payload = format!("payload {}", n);
        let response = transfer_app(store.clone())
            .oneshot(upload_request("file", payload.as_bytes()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "success");
        let id = json["file_id"].as_str().unwrap().to_string();
        assert!(uuid::Uuid::parse_str(&id).is_ok());
        assert_eq!(store.blobs.lock().unwrap()[&id], payload.as_bytes());
        assert!(ids.insert(id));
    }
}

#[tokio::test]
async fn test_upload_without_file_field_is_rejected() {
    let store = Arc::new(MemoryBlobStore::default());
    let response = transfer_app(store.clone())
        .oneshot(upload_request("attachment", b"bytes"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(store.blobs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_is_not_size_limited() {
    let store = Arc::new(MemoryBlobStore::default());
    let big = vec![7u8; 3 * 1024 * 1024];
    let response = transfer_app(store.clone()).oneshot(upload_request("file", &big)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(store.blobs.lock().unwrap()[json["file_id"].as_str().unwrap()].len(), big.len());
}

#[tokio::test]
async fn test_slow_upload_outlives_request_timeout() {
    let mut config = Config::test_config(Role::Transfer);
    config.request_timeout_secs = 1;
    let store = Arc::new(MemoryBlobStore::default());
    let app = transfer::router(TransferState::new(store.clone(), &config));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });

    let body = multipart_body("file", "slow.bin", b"trickled bytes");
    let head = format!(
        "POST /upload HTTP/1.1\r\nHost: {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        addr,
        multipart_content_type(),
        body.len()
    );
    let (first, rest) = body.split_at(body.len() / 2);

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream.write_all(head.as_bytes()).await.unwrap();
    stream.write_all(first).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    stream.write_all(rest).await.unwrap();

    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();
    assert!(raw.starts_with("HTTP/1.1 200"), "unexpected response: {}", raw);
    assert_eq!(store.blobs.lock().unwrap().len(), 1);
}
