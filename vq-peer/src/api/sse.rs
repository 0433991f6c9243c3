//! Server-Sent Events (SSE) stream of one peer's queue signals

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{Stream, StreamExt};
use serde_json::json;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};
use vq_common::PlayerId;

use crate::api::handlers::{error_response, ApiError};
use crate::api::AppState;

/// GET /peers/:id/events - SSE event stream
pub async fn event_stream(
    State(state): State<AppState>,
    Path(id): Path<PlayerId>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let rx = {
        let session = state.session.lock().await;
        session.peer(id).map_err(error_response)?.subscribe()
    };
    debug!("New SSE client connected for player {}", id);

    let stream = BroadcastStream::new(rx).filter_map(move |result| async move {
        match result {
            Ok(event) => {
                let data = json!({
                    "type": event.name(),
                    "peer": id,
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                });
                Some(Ok(Event::default().event(event.name()).data(data.to_string())))
            }
            Err(e) => {
                // Lagged receiver: the client re-reads the queue anyway
                warn!("SSE stream error for player {}: {:?}", id, e);
                None
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}
