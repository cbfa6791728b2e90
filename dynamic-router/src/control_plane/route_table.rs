//! Route-table data model and storage owner for installed inbox routes.

use std::collections::HashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Clone, Debug, Eq, PartialEq)]
/// One installed inbox route.
pub struct RouteRecord {
    pub inbox_channel: String,
    pub outbox_channel: String,
    pub installed_at: Instant,
}

/// Installed inbox routes keyed by inbox channel name.
pub(crate) struct RouteTable {
    routes: Mutex<HashMap<String, RouteRecord>>,
}

impl RouteTable {
    /// Creates an empty route table.
    pub(crate) fn new() -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) async fn contains_route(&self, inbox_channel: &str) -> bool {
        self.routes.lock().await.contains_key(inbox_channel)
    }

    /// Records a route. Returns `true` only when first inserted; an existing
    /// record is never overwritten.
    pub(crate) async fn insert_route(&self, record: RouteRecord) -> bool {
        let mut routes = self.routes.lock().await;
        if routes.contains_key(&record.inbox_channel) {
            return false;
        }
        routes.insert(record.inbox_channel.clone(), record);
        true
    }

    /// Removes a route record. Returns the record only when it existed.
    pub(crate) async fn remove_route(&self, inbox_channel: &str) -> Option<RouteRecord> {
        self.routes.lock().await.remove(inbox_channel)
    }

    pub(crate) async fn routes(&self) -> Vec<RouteRecord> {
        let mut routes: Vec<RouteRecord> = self.routes.lock().await.values().cloned().collect();
        routes.sort_by(|a, b| a.inbox_channel.cmp(&b.inbox_channel));
        routes
    }
}

#[cfg(test)]
mod tests {
    use super::{RouteRecord, RouteTable};
    use tokio::time::Instant;

    fn record(inbox: &str, outbox: &str) -> RouteRecord {
        RouteRecord {
            inbox_channel: inbox.to_string(),
            outbox_channel: outbox.to_string(),
            installed_at: Instant::now(),
        }
    }

    #[tokio::test]
    async fn route_table_insert_and_remove_are_idempotent() {
        let route_table = RouteTable::new();
        let route = record("Sensor_Queue_a_Inbox", "Sensor_Queue_a");

        assert!(route_table.insert_route(route.clone()).await);
        assert!(!route_table.insert_route(route.clone()).await);
        assert!(route_table.contains_route("Sensor_Queue_a_Inbox").await);

        assert_eq!(
            route_table.remove_route("Sensor_Queue_a_Inbox").await,
            Some(route)
        );
        assert!(route_table.remove_route("Sensor_Queue_a_Inbox").await.is_none());
    }

    #[tokio::test]
    async fn existing_record_is_not_replaced() {
        let route_table = RouteTable::new();

        assert!(route_table.insert_route(record("In_Inbox", "first")).await);
        assert!(!route_table.insert_route(record("In_Inbox", "second")).await);

        let routes = route_table.routes().await;
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].outbox_channel, "first");
    }
}
