//! HTTP control surface tests.
//!
//! Requests are sent through the router in-process; time is paused so runs
//! elapse synthetically.

use std::{sync::Arc, time::Duration};

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use futures::StreamExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use menubar_timer::{create_router, AppState, ProgressEngine, RunState, TimerEvent};

fn app() -> (Arc<AppState>, Router) {
    let state = Arc::new(AppState::new(
        ProgressEngine::new(),
        vec![5, 15, 25, 50],
        20554,
        "127.0.0.1".to_string(),
    ));
    (Arc::clone(&state), create_router(state))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test(start_paused = true)]
async fn start_then_progress() {
    let (state, app) = app();

    let (status, body) = send(&app, "POST", "/start", Some(json!({ "minutes": 1 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");
    assert_eq!(body["generation"], 1);
    assert_eq!(body["total_seconds"], 60.0);

    let (_, body) = send(&app, "GET", "/progress", None).await;
    assert_eq!(body["generation"], 1);
    assert_eq!(body["progress"], 0.0);

    tokio::time::sleep(Duration::from_secs(30)).await;
    let (_, body) = send(&app, "GET", "/progress", None).await;
    assert!((body["progress"].as_f64().unwrap() - 0.5).abs() < 1e-9);

    tokio::time::sleep(Duration::from_secs(31)).await;
    let (_, body) = send(&app, "GET", "/status", None).await;
    assert_eq!(body["timer"]["state"], "completed");
    assert_eq!(body["timer"]["progress"], 1.0);
    assert_eq!(body["last_action"], "start");
    assert_eq!(state.engine.state(), RunState::Completed);
}

#[tokio::test(start_paused = true)]
async fn invalid_durations_are_rejected() {
    let (state, app) = app();

    for body in [
        json!({ "minutes": 0 }),
        json!({ "minutes": -5 }),
        json!({ "seconds": 0 }),
        json!({}),
        json!({ "minutes": 1, "seconds": 1 }),
    ] {
        let (status, response) = send(&app, "POST", "/start", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["status"], "error");
    }

    assert_eq!(state.engine.current_generation(), 0);
    assert_eq!(state.engine.state(), RunState::Idle);
}

#[tokio::test(start_paused = true)]
async fn presets_are_listed_and_startable() {
    let (state, app) = app();

    let (_, body) = send(&app, "GET", "/presets", None).await;
    assert_eq!(body["presets_minutes"], json!([5, 15, 25, 50]));

    let (status, body) = send(&app, "POST", "/start/preset/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_seconds"], 900.0);

    let (status, _) = send(&app, "POST", "/start/preset/9", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(state.engine.current_generation(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancel_reports_whether_a_run_stopped() {
    let (state, app) = app();
    let mut events = state.engine.subscribe();

    let (_, body) = send(&app, "POST", "/cancel", None).await;
    assert_eq!(body["cancelled"], false);
    assert_eq!(body["timer"]["state"], "idle");

    send(&app, "POST", "/start", Some(json!({ "seconds": 20 }))).await;
    tokio::time::sleep(Duration::from_secs(10)).await;

    let (_, body) = send(&app, "POST", "/cancel", None).await;
    assert_eq!(body["cancelled"], true);
    assert_eq!(body["timer"]["state"], "cancelled");
    assert_eq!(body["timer"]["progress"], 0.5);

    tokio::time::sleep(Duration::from_secs(60)).await;
    let mut completed = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, TimerEvent::Completed { .. }) {
            completed += 1;
        }
    }
    assert_eq!(completed, 0);
}

/// Split SSE text into `(event name, data)` frames, skipping keep-alive comments
fn sse_frames(text: &str) -> Vec<(String, Value)> {
    let mut frames = Vec::new();
    let mut name = None;
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("event:") {
            name = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("data:") {
            let data = serde_json::from_str(rest.trim()).unwrap();
            frames.push((name.take().unwrap_or_default(), data));
        }
    }
    frames
}

#[tokio::test(start_paused = true)]
async fn events_stream_sends_named_frames() {
    let (_, app) = app();

    let request = Request::builder().uri("/events").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/event-stream");
    let mut body = response.into_body().into_data_stream();

    send(&app, "POST", "/start", Some(json!({ "seconds": 2 }))).await;

    let mut text = String::new();
    let frames = loop {
        let chunk = tokio::time::timeout(Duration::from_secs(30), body.next())
            .await
            .expect("no SSE frame within 30s")
            .expect("SSE stream ended")
            .unwrap();
        text.push_str(std::str::from_utf8(&chunk).unwrap());

        let frames = sse_frames(&text);
        if frames.iter().any(|(name, _)| name == "completed") {
            break frames;
        }
    };

    let names: Vec<&str> = frames.iter().map(|(name, _)| name.as_str()).collect();
    let started = names.iter().position(|n| *n == "started").unwrap();
    let completed = names.iter().position(|n| *n == "completed").unwrap();
    assert!(started < completed);
    assert_eq!(names.iter().filter(|n| **n == "completed").count(), 1);

    assert_eq!(frames[started].1["generation"], 1);
    assert_eq!(frames[started].1["total_seconds"], 2.0);
    assert_eq!(frames[completed].1, json!({ "type": "completed", "generation": 1 }));

    // The final progress sample precedes the completion.
    let (name, data) = &frames[completed - 1];
    assert_eq!(name, "progress");
    assert_eq!(data["progress"], 1.0);
}

#[tokio::test]
async fn health_check() {
    let (_, app) = app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
