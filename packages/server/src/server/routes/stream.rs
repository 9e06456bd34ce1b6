//! SSE change feed.
//!
//! GET /api/changes
//!
//! Forwards every [`RecordChange`] as an SSE event named after its table
//! (`shipment_orders` or `parsing_logs`). A `connected` event is sent first;
//! a subscriber that falls behind receives a `lagged` event with the number
//! of changes it missed and should refetch.

use std::convert::Infallible;

use axum::{
    extract::Extension,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, StreamExt};
use intake::{RecordChange, Table};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};

use crate::server::app::AppState;

pub async fn changes_handler(
    Extension(state): Extension<AppState>,
) -> Sse<impl futures::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.changes.subscribe();

    let connected =
        stream::once(async { Ok::<_, Infallible>(Event::default().event("connected").data("ok")) });

    let events = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(change) => change_event(&change).map(Ok),
            Err(BroadcastStreamRecvError::Lagged(n)) => {
                tracing::debug!(missed = n, "Change subscriber lagged");
                Event::default()
                    .event("lagged")
                    .json_data(serde_json::json!({ "missed": n }))
                    .ok()
                    .map(Ok)
            }
        }
    });

    Sse::new(connected.chain(events)).keep_alive(KeepAlive::default())
}

fn change_event(change: &RecordChange) -> Option<Event> {
    let name = match change.table {
        Table::ShipmentOrders => "shipment_orders",
        Table::ParsingLogs => "parsing_logs",
    };
    Event::default().event(name).json_data(change).ok()
}
