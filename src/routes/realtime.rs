use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::Stream;

use crate::AppState;

/// Stream row changes for one table as server-sent events
///
/// Each event is named `change` and carries the JSON change envelope.
/// Closing the response tears the subscription down; nothing else on
/// the hub is affected.
pub async fn realtime_stream(
    State(state): State<AppState>,
    Path(table): Path<String>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    tracing::debug!("Realtime stream opened for '{}'", table);
    let mut subscription = state.realtime.subscribe(&table);

    let stream = async_stream::stream! {
        while let Some(change) = subscription.recv().await {
            match Event::default().event("change").json_data(&change) {
                Ok(event) => yield Ok::<Event, Infallible>(event),
                Err(e) => {
                    tracing::warn!("Dropping unserializable change event: {}", e);
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
