use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::{stream, Stream};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::{app::AppState, domain::ports::RecordChange};

pub fn router() -> Router<AppState> {
    Router::new().route("/events", get(events))
}

/// Streams record changes to dashboards as server-sent events.
async fn events(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.store.subscribe();
    tracing::debug!("change feed subscriber connected");
    Sse::new(change_stream(receiver)).keep_alive(KeepAlive::default())
}

fn change_stream(
    receiver: broadcast::Receiver<RecordChange>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(change) => match to_event(&change) {
                    Some(event) => return Some((Ok(event), receiver)),
                    None => continue,
                },
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "change feed subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
}

fn event_name(change: &RecordChange) -> &'static str {
    match change {
        RecordChange::Inserted(_) => "inserted",
        RecordChange::Updated(_) => "updated",
        RecordChange::Deleted(_) => "deleted",
        RecordChange::ParametersUpdated(_) => "parameters_updated",
    }
}

fn to_event(change: &RecordChange) -> Option<Event> {
    match Event::default().event(event_name(change)).json_data(change) {
        Ok(event) => Some(event),
        Err(error) => {
            tracing::warn!(%error, "failed to encode change event");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use crate::domain::{CostParameters, PropertyId};

    #[tokio::test]
    async fn forwards_changes_until_the_feed_closes() {
        let (sender, receiver) = broadcast::channel(8);
        let stream = change_stream(receiver);

        sender.send(RecordChange::Deleted(PropertyId::nil())).unwrap();
        sender
            .send(RecordChange::ParametersUpdated(CostParameters::default()))
            .unwrap();
        drop(sender);

        let events: Vec<_> = stream.collect().await;
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn names_events_by_change_kind() {
        assert_eq!(event_name(&RecordChange::Deleted(PropertyId::nil())), "deleted");
    }
}
