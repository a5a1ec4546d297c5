//! HTTP endpoint handlers

use std::{convert::Infallible, sync::Arc};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
};
use chrono::Utc;
use futures::stream::{self, Stream};
use tokio::sync::{
    broadcast::{self, error::RecvError},
    watch,
};
use tracing::{info, warn};

use crate::{
    error::EngineError,
    state::{duration_from_minutes, duration_from_seconds, AppState, ProgressUpdate, TimerEvent},
};
use super::responses::{
    CancelResponse, ErrorResponse, HealthResponse, PresetsResponse, StartRequest, StartResponse,
    StatusResponse,
};

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(message: String) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message)))
}

fn engine_error(e: EngineError) -> ApiError {
    warn!("Rejected timer request: {}", e);
    bad_request(e.to_string())
}

/// Handle POST /start - Start a timer from minutes or seconds
pub async fn start_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartRequest>,
) -> Result<Json<StartResponse>, ApiError> {
    let duration = match (request.minutes, request.seconds) {
        (Some(minutes), None) => duration_from_minutes(minutes),
        (None, Some(seconds)) => duration_from_seconds(seconds),
        _ => {
            let message = "exactly one of `minutes` or `seconds` is required";
            return Err(bad_request(message.to_string()));
        }
    }
    .map_err(engine_error)?;

    let handle = state.start_timer(duration).map_err(engine_error)?;
    info!("Start endpoint called - generation {} running", handle.generation());
    Ok(Json(StartResponse::running(handle)))
}

/// Handle POST /start/preset/:index - Start one of the configured presets
pub async fn start_preset_handler(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> Result<Json<StartResponse>, ApiError> {
    match state.start_preset(index) {
        Some(Ok(handle)) => {
            info!("Preset {} started - generation {} running", index, handle.generation());
            Ok(Json(StartResponse::running(handle)))
        }
        Some(Err(e)) => Err(engine_error(e)),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(format!("no preset at index {}", index))),
        )),
    }
}

/// Handle POST /cancel - Cancel the running timer, if any
pub async fn cancel_handler(State(state): State<Arc<AppState>>) -> Json<CancelResponse> {
    let cancelled = state.cancel_timer();
    info!("Cancel endpoint called - cancelled={}", cancelled);
    Json(CancelResponse {
        cancelled,
        timer: state.engine.snapshot(),
        timestamp: Utc::now(),
    })
}

/// Handle GET /progress - Current progress of the active or last run
pub async fn progress_handler(State(state): State<Arc<AppState>>) -> Json<ProgressUpdate> {
    Json(ProgressUpdate {
        generation: state.engine.current_generation(),
        progress: state.engine.current_progress(),
    })
}

/// Handle GET /status - Return current timer and server status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let (last_action, last_action_time) = state.get_last_action();

    Json(StatusResponse {
        timer: state.engine.snapshot(),
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    })
}

/// Handle GET /presets - List preset durations
pub async fn presets_handler(State(state): State<Arc<AppState>>) -> Json<PresetsResponse> {
    Json(PresetsResponse {
        presets_minutes: state.presets.clone(),
    })
}

fn sse_event(event: &TimerEvent) -> Event {
    Event::default()
        .event(event.name())
        .json_data(event)
        .unwrap_or_else(|_| Event::default().comment("unserializable event"))
}

/// Receivers behind one SSE connection
struct EventFeed {
    lifecycle: broadcast::Receiver<TimerEvent>,
    progress: watch::Receiver<ProgressUpdate>,
}

impl EventFeed {
    /// Next event to send, or `None` once the engine is gone.
    ///
    /// Progress is checked first. The engine updates progress before it
    /// publishes a completion, so the final 1.0 sample is sent ahead of
    /// `completed`.
    async fn next(&mut self) -> Option<TimerEvent> {
        loop {
            tokio::select! {
                biased;
                changed = self.progress.changed() => {
                    changed.ok()?;
                    let update = *self.progress.borrow_and_update();
                    return Some(TimerEvent::Progress {
                        generation: update.generation,
                        progress: update.progress,
                    });
                }
                received = self.lifecycle.recv() => match received {
                    Ok(event) => return Some(event),
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "SSE subscriber lagged; skipping ahead");
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        }
    }
}

/// Handle GET /events - Stream engine events as server-sent events
///
/// Lifecycle events are delivered individually; progress is coalesced to the
/// latest sample.
pub async fn events_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let feed = EventFeed {
        lifecycle: state.engine.subscribe_lifecycle(),
        progress: state.engine.watch_progress(),
    };

    let events = stream::unfold(feed, |mut feed| async move {
        let event = feed.next().await?;
        Some((Ok(sse_event(&event)), feed))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
