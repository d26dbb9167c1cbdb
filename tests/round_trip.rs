//! Integration tests for Retrace
//!
//! These tests verify the integration between the engine and its adapters:
//! capture a request through the axum middleware while its handler talks to
//! a real (in-memory) document backend, then replay the same request and
//! assert byte-identical output with zero real dependency calls.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use http::Request;
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;

use retrace::{
    set_recording_enabled, DocumentBackend, InMemoryBackend, InMemoryStore, RecordLayer, Recorder,
    RecorderConfig, RecordingCollection, TestCase,
};

/// The recording switch is process-wide; every test serializes on this.
static SWITCH: Mutex<()> = Mutex::new(());

fn switch_guard() -> MutexGuard<'static, ()> {
    SWITCH.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone)]
struct AppState {
    users: RecordingCollection<InMemoryBackend>,
}

async fn ping() -> Json<serde_json::Value> {
    Json(json!({"message": "pong"}))
}

async fn list_users(State(state): State<AppState>) -> (StatusCode, String) {
    match state.users.find(json!({})).await {
        Ok(cursor) => {
            let docs = cursor.all();
            (StatusCode::OK, json!({ "users": docs }).to_string())
        }
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

struct Harness {
    app: Router,
    recorder: Arc<Recorder>,
    store: Arc<InMemoryStore>,
    backend: Arc<InMemoryBackend>,
}

fn harness() -> Harness {
    let (recorder, store) = Recorder::in_memory(RecorderConfig::new("demo"));
    let recorder = Arc::new(recorder);
    let backend = Arc::new(InMemoryBackend::new());
    let state = AppState {
        users: RecordingCollection::new(backend.clone(), "users"),
    };
    let app = Router::new()
        .route("/ping", get(ping))
        .route("/users", get(list_users))
        .layer(RecordLayer::new(recorder.clone()))
        .with_state(state);
    Harness {
        app,
        recorder,
        store,
        backend,
    }
}

async fn send(app: &Router, request: Request<axum::body::Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

async fn wait_for_cases(store: &InMemoryStore, count: usize) -> Vec<TestCase> {
    for _ in 0..200 {
        let cases = store.cases();
        if cases.len() >= count {
            return cases;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!(
        "expected {count} captured case(s), got {}",
        store.cases().len()
    );
}

async fn wait_for_replayed(
    store: &InMemoryStore,
    test_id: &str,
) -> retrace::HttpResponseSnapshot {
    for _ in 0..200 {
        if let Some(snapshot) = store.replayed(test_id) {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("no replayed response reported for {test_id}");
}

#[tokio::test]
async fn test_capture_without_dependencies_matches_handler_output() {
    let _guard = switch_guard();
    set_recording_enabled(true);
    let h = harness();

    let (status, body) = send(
        &h.app,
        Request::get("/ping")
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, br#"{"message":"pong"}"#);

    let cases = wait_for_cases(&h.store, 1).await;
    assert!(cases[0].dependencies.is_empty());
    assert_eq!(cases[0].response.status, 200);
    assert_eq!(cases[0].response.body, body);
    set_recording_enabled(false);
}

#[tokio::test]
async fn test_round_trip_is_byte_identical_with_zero_real_calls() {
    let _guard = switch_guard();
    set_recording_enabled(true);
    let h = harness();

    // Seed real data directly, outside any request.
    h.backend
        .insert_one("users", json!({"_id": "u1", "name": "alice"}))
        .await
        .unwrap();
    h.backend
        .insert_one("users", json!({"_id": "u2", "name": "bob"}))
        .await
        .unwrap();
    let seeding_calls = h.backend.calls();

    // Capture run: the handler hits the real backend.
    let (status, captured_body) = send(
        &h.app,
        Request::get("/users")
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let cases = wait_for_cases(&h.store, 1).await;
    assert_eq!(cases[0].dependencies.len(), 1);
    assert_eq!(cases[0].dependencies[0].operation, "Find");
    assert!(h.backend.calls() > seeding_calls);

    // Replay run: same route, recorded dependencies, no backend traffic.
    h.store.seed_from_case("t-users", &cases[0]);
    let calls_before_replay = h.backend.calls();
    let (status, replayed_body) = send(
        &h.app,
        Request::get("/users")
            .header(h.recorder.replay_header(), "t-users")
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replayed_body, captured_body);
    assert_eq!(
        h.backend.calls(),
        calls_before_replay,
        "replay must not touch the real backend"
    );

    let snapshot = wait_for_replayed(&h.store, "t-users").await;
    assert_eq!(snapshot.status, cases[0].response.status);
    assert_eq!(snapshot.body, cases[0].response.body);
    set_recording_enabled(false);
}

#[tokio::test]
async fn test_replay_is_deterministic_across_repetitions() {
    let _guard = switch_guard();
    set_recording_enabled(true);
    let h = harness();

    h.backend
        .insert_one("users", json!({"_id": "u1", "name": "alice"}))
        .await
        .unwrap();

    let (_, captured_body) = send(
        &h.app,
        Request::get("/users")
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await;
    let cases = wait_for_cases(&h.store, 1).await;
    h.store.seed_from_case("t-det", &cases[0]);

    for _ in 0..3 {
        let (status, body) = send(
            &h.app,
            Request::get("/users")
                .header(h.recorder.replay_header(), "t-det")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, captured_body);
    }
    set_recording_enabled(false);
}

#[tokio::test]
async fn test_replay_with_short_dependency_sequence_fails_distinctly() {
    let _guard = switch_guard();
    set_recording_enabled(true);
    let h = harness();
    h.store.insert_dependencies("t-short", Vec::new());

    let (status, body) = send(
        &h.app,
        Request::get("/users")
            .header(h.recorder.replay_header(), "t-short")
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let message = String::from_utf8(body).unwrap();
    assert!(message.contains("replay exhausted"), "got: {message}");
    set_recording_enabled(false);
}

#[tokio::test]
async fn test_off_mode_serves_real_traffic_without_capture() {
    let _guard = switch_guard();
    set_recording_enabled(false);
    let h = harness();
    h.backend
        .insert_one("users", json!({"_id": "u1", "name": "alice"}))
        .await
        .unwrap();

    let (status, body) = send(
        &h.app,
        Request::get("/users")
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().contains("alice"));

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(h.store.cases().is_empty());
}
