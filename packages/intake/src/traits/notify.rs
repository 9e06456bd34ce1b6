//! Change notification hook.
//!
//! The pipeline emits a [`RecordChange`] after every successful mutation so
//! that a UI can refresh without the core knowing about transports.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Table a change happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    ShipmentOrders,
    ParsingLogs,
}

/// Kind of mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Inserted,
    Updated,
}

/// A single row mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordChange {
    pub table: Table,
    pub kind: ChangeKind,
    pub id: Uuid,
}

impl RecordChange {
    pub fn inserted(table: Table, id: Uuid) -> Self {
        Self {
            table,
            kind: ChangeKind::Inserted,
            id,
        }
    }

    pub fn updated(table: Table, id: Uuid) -> Self {
        Self {
            table,
            kind: ChangeKind::Updated,
            id,
        }
    }
}

/// "On record changed" hook.
///
/// Called synchronously after the mutation is durable. Implementations must
/// not block.
pub trait ChangeNotifier: Send + Sync {
    fn notify(&self, change: RecordChange);
}

/// Notifier that drops every change.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl ChangeNotifier for NoopNotifier {
    fn notify(&self, _change: RecordChange) {}
}

/// In-process broadcast of changes.
///
/// Thread-safe, cloneable. Sending with no subscribers is a no-op; slow
/// subscribers lag rather than block producers.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<RecordChange>,
}

impl BroadcastNotifier {
    /// Create a notifier with default capacity (256 changes).
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tx: broadcast::channel(capacity).0,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RecordChange> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeNotifier for BroadcastNotifier {
    fn notify(&self, change: RecordChange) {
        // Ignore send errors (no active receivers)
        let _ = self.tx.send(change);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_delivers_to_all_subscribers() {
        let notifier = BroadcastNotifier::new();
        let mut a = notifier.subscribe();
        let mut b = notifier.subscribe();

        let change = RecordChange::inserted(Table::ShipmentOrders, Uuid::new_v4());
        notifier.notify(change);

        assert_eq!(a.recv().await.unwrap(), change);
        assert_eq!(b.recv().await.unwrap(), change);
    }

    #[test]
    fn test_notify_without_subscribers_is_noop() {
        let notifier = BroadcastNotifier::new();
        notifier.notify(RecordChange::updated(Table::ParsingLogs, Uuid::new_v4()));
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[test]
    fn test_change_serializes_snake_case() {
        let id = Uuid::nil();
        let json = serde_json::to_value(RecordChange::inserted(Table::ShipmentOrders, id)).unwrap();
        assert_eq!(json["table"], "shipment_orders");
        assert_eq!(json["kind"], "inserted");
    }
}
