use crate::core::state::AppState;
use crate::dashboard::notifications::Notification;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use tracing::warn;

/// Live operation outcomes as server-sent events
///
/// GET /notifications
///
/// Each event is named after the notification kind (`success` or `error`)
/// and carries the notification as JSON. Only notifications raised after the
/// client connects are delivered.
pub async fn notifications_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.dashboard.subscribe_notifications();
    let stream = BroadcastStream::new(receiver).filter_map(|item| match item {
        Ok(notification) => notification_event(&notification).map(Ok),
        Err(err) => {
            warn!(error = %err, "Notification stream fell behind");
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn notification_event(notification: &Notification) -> Option<Event> {
    match Event::default()
        .event(notification.kind.as_str())
        .json_data(notification)
    {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(error = %err, "Failed to encode notification");
            None
        }
    }
}
