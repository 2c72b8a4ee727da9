//! SSE event stream
//!
//! Each gate event goes out as one SSE message with the event type in
//! the `event:` field and the serialized event as JSON data. Lagged
//! subscribers skip missed events and keep streaming.

use crate::state::SharedState;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;

/// GET /events - SSE stream of gate events
pub async fn event_stream(
    State(state): State<Arc<SharedState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::info!(
        subscribers = state.event_tx.receiver_count() + 1,
        "New SSE subscriber"
    );
    let rx = state.subscribe_events();

    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(gate_event) => {
                let event = Event::default()
                    .event(gate_event.event_type())
                    .json_data(&gate_event)
                    .ok();
                event.map(Ok)
            }
            Err(e) => {
                tracing::warn!("SSE subscriber lagged: {:?}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("keep-alive"),
    )
}
