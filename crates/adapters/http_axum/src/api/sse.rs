//! Server-Sent Events stream of every event emitted on the bus.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use crate::state::AppState;

/// `GET /events/stream`
///
/// Each bus event becomes one SSE message named after the event, carrying
/// the event as JSON. Slow clients skip what they missed.
pub async fn stream(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = state.api.events().subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => match serde_json::to_string(&event) {
            Ok(json) => Some(Ok(SseEvent::default().event(event.name).data(json))),
            Err(err) => {
                tracing::warn!(error = %err, "failed to serialize event for SSE");
                None
            }
        },
        Err(BroadcastStreamRecvError::Lagged(n)) => {
            tracing::warn!(skipped = n, "SSE client lagged, skipped events");
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
