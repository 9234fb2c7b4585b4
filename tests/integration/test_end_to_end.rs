// Requester and capability server talking over a real socket

use crate::common::{trace, UPLOAD_URL};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use elicitation_relay::capability::CapabilityServer;
use elicitation_relay::core::models::{ChatRequest, Elicitation};
use elicitation_relay::core::trace::{TraceId, TRACE_HEADER};
use elicitation_relay::flow::FlowRecorder;
use elicitation_relay::protocol::JsonRpcResponse;
use elicitation_relay::requester::orchestrator::PROCESSING_TEXT;
use elicitation_relay::requester::{HttpCapabilityClient, KeywordDecider, Requester};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
struct Observed {
    server: Arc<CapabilityServer>,
    traces: Arc<Mutex<Vec<Option<String>>>>,
}

async fn observed_mcp(State(state): State<Observed>, headers: HeaderMap, body: Bytes) -> Json<JsonRpcResponse> {
    state.traces.lock().unwrap().push(
        headers
            .get(TRACE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    );
    let trace = TraceId::from_headers_or_generate(&headers);
    let response = state.server.handle_body(&body, &trace);
    state.server.flush_trace(&trace);
    Json(response)
}

/// Serve a capability server on an ephemeral port, recording inbound trace headers
async fn spawn_capability_server() -> (String, Arc<Mutex<Vec<Option<String>>>>) {
    let traces = Arc::new(Mutex::new(Vec::new()));
    let state = Observed {
        server: Arc::new(CapabilityServer::new(UPLOAD_URL)),
        traces: traces.clone(),
    };
    let app = Router::new().route("/mcp", post(observed_mcp)).with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });

    (format!("http://{}/mcp", addr), traces)
}

fn requester_for(url: &str) -> Requester {
    Requester::new(
        Arc::new(KeywordDecider::new()),
        Arc::new(HttpCapabilityClient::new(url, 5).unwrap()),
        Arc::new(FlowRecorder::new()),
    )
}

#[tokio::test]
async fn test_interactive_round_trip_carries_trace_on_every_hop() {
    let (url, traces) = spawn_capability_server().await;
    let requester = requester_for(&url);
    let t = trace("e2e-ui-01");

    let (reply, summary) = requester
        .handle_turn_traced(
            ChatRequest {
                message: "Can you process a file for me?".to_string(),
                has_attached_file: false,
            },
            t.clone(),
        )
        .await;

    match reply.elicitation {
        Some(Elicitation::Interactive(prompt)) => assert_eq!(prompt.url, UPLOAD_URL),
        other => panic!("expected interactive prompt, got {:?}", other),
    }

    // initialize + tools/call
    let seen = traces.lock().unwrap().clone();
    assert_eq!(seen, vec![Some("e2e-ui-01".to_string()), Some("e2e-ui-01".to_string())]);
    assert!(summary.steps.iter().all(|s| s.trace_id == t));
}

#[tokio::test]
async fn test_direct_round_trip() {
    let (url, _traces) = spawn_capability_server().await;
    let requester = requester_for(&url);

    let reply = requester
        .handle_turn(
            ChatRequest {
                message: "here is my spreadsheet".to_string(),
                has_attached_file: true,
            },
            trace("e2e-stream"),
        )
        .await;

    assert_eq!(reply.response, PROCESSING_TEXT);
    match reply.elicitation {
        Some(Elicitation::Direct(descriptor)) => {
            assert_eq!(descriptor.url, UPLOAD_URL);
            assert_eq!(descriptor.metadata.method, "POST");
        }
        other => panic!("expected direct descriptor, got {:?}", other),
    }
}

#[tokio::test]
async fn test_concurrent_turns_keep_their_own_traces() {
    let (url, traces) = spawn_capability_server().await;
    let requester = Arc::new(requester_for(&url));

    let mut handles = Vec::new();
    for n in 0..6 {
        let requester = requester.clone();
        handles.push(tokio::spawn(async move {
            let t = trace(&format!("conc-{}", n));
            let (_, summary) = requester
                .handle_turn_traced(
                    ChatRequest {
                        message: "upload".to_string(),
                        has_attached_file: n % 2 == 0,
                    },
                    t.clone(),
                )
                .await;
            (t, summary)
        }));
    }

    for handle in handles {
        let (t, summary) = handle.await.unwrap();
        assert!(!summary.is_empty());
        assert!(summary.steps.iter().all(|s| s.trace_id == t));
    }
    assert_eq!(traces.lock().unwrap().len(), 12);
}
