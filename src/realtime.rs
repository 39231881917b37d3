//! Change subscription hub backed by Postgres LISTEN/NOTIFY.
//!
//! Database triggers publish row changes as JSON on one notification
//! channel; the hub fans them out to per-table subscribers. The hub
//! itself has no database dependency, which keeps subscription and
//! teardown behavior testable without a live connection.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::constants::{
    REALTIME_BUFFER, REALTIME_CHANNEL, REALTIME_RECONNECT_BASE_MS, REALTIME_RECONNECT_CAP_MS,
};

/// One row change fanned out to subscribers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableChange {
    pub table: String,
    /// INSERT, UPDATE or DELETE
    pub op: String,
    #[serde(default)]
    pub record: Value,
}

/// Fan-out hub for database change notifications
///
/// Cloning is cheap and every clone feeds the same subscribers.
#[derive(Debug, Clone)]
pub struct RealtimeHub {
    tx: broadcast::Sender<TableChange>,
}

/// Pull-style subscription for one table
pub struct Subscription {
    rx: broadcast::Receiver<TableChange>,
    table: String,
}

/// Handle owning a callback task; dropping it stops delivery
pub struct SubscriptionGuard {
    handle: JoinHandle<()>,
}

impl RealtimeHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(REALTIME_BUFFER);
        RealtimeHub { tx }
    }

    /// Subscribe to changes for one table
    pub fn subscribe(&self, table: &str) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            table: table.to_string(),
        }
    }

    /// Subscribe with a callback driven by a background task
    ///
    /// The task is aborted when the returned guard drops, after which
    /// the callback never fires again. Other subscriptions on the same
    /// hub are unaffected.
    pub fn subscribe_with<F>(&self, table: &str, mut callback: F) -> SubscriptionGuard
    where
        F: FnMut(TableChange) + Send + 'static,
    {
        let mut subscription = self.subscribe(table);
        let handle = tokio::spawn(async move {
            while let Some(change) = subscription.recv().await {
                callback(change);
            }
        });
        SubscriptionGuard { handle }
    }

    /// Fan a change out to current subscribers
    pub fn publish(&self, change: TableChange) {
        // Send only fails when nobody is subscribed, which is fine
        let _ = self.tx.send(change);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Run the LISTEN loop on a background task
    ///
    /// Reconnects with doubling backoff up to the cap; a delivered
    /// notification resets the backoff to its base.
    pub fn spawn_listener(&self, pool: PgPool) -> JoinHandle<()> {
        let hub = self.clone();
        tokio::spawn(async move {
            let mut backoff = Duration::from_millis(REALTIME_RECONNECT_BASE_MS);
            loop {
                if let Err(e) = hub.listen_once(&pool, &mut backoff).await {
                    tracing::warn!(
                        "Realtime listener disconnected: {e}; reconnecting in {:?}",
                        backoff
                    );
                }
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(Duration::from_millis(REALTIME_RECONNECT_CAP_MS));
            }
        })
    }

    async fn listen_once(&self, pool: &PgPool, backoff: &mut Duration) -> Result<(), sqlx::Error> {
        let mut listener = PgListener::connect_with(pool).await?;
        listener.listen(REALTIME_CHANNEL).await?;
        tracing::info!("Realtime listener attached to '{}'", REALTIME_CHANNEL);

        loop {
            let notification = listener.recv().await?;
            // A delivered notification proves the link is healthy
            *backoff = Duration::from_millis(REALTIME_RECONNECT_BASE_MS);

            match serde_json::from_str::<TableChange>(notification.payload()) {
                Ok(change) => self.publish(change),
                Err(e) => {
                    tracing::warn!("Discarding malformed change notification: {e}");
                }
            }
        }
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new()
    }
}

impl Subscription {
    /// Next change for the subscribed table
    ///
    /// Lagged subscribers skip ahead rather than erroring; `None`
    /// means the hub itself is gone.
    pub async fn recv(&mut self) -> Option<TableChange> {
        loop {
            match self.rx.recv().await {
                Ok(change) if change.table == self.table => return Some(change),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Realtime subscriber lagged, skipped {} changes", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn change(table: &str, op: &str) -> TableChange {
        TableChange {
            table: table.to_string(),
            op: op.to_string(),
            record: serde_json::json!({"id": 1}),
        }
    }

    async fn wait_for(seen: &AtomicUsize, target: usize) {
        for _ in 0..200 {
            if seen.load(Ordering::SeqCst) >= target {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("subscriber never saw {target} changes");
    }

    #[tokio::test]
    async fn test_subscription_sees_only_its_table() {
        let hub = RealtimeHub::new();
        let mut sub = hub.subscribe("users");

        hub.publish(change("analysis_results", "INSERT"));
        hub.publish(change("users", "UPDATE"));

        let got = sub.recv().await.unwrap();
        assert_eq!(got.table, "users");
        assert_eq!(got.op, "UPDATE");
    }

    #[tokio::test]
    async fn test_callback_stops_after_guard_drop() {
        let hub = RealtimeHub::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let guard = hub.subscribe_with("users", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        hub.publish(change("users", "INSERT"));
        wait_for(&seen, 1).await;

        drop(guard);
        tokio::time::sleep(Duration::from_millis(20)).await;

        hub.publish(change("users", "UPDATE"));
        hub.publish(change("users", "DELETE"));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        // The hub itself keeps serving later subscribers
        let mut sub = hub.subscribe("users");
        hub.publish(change("users", "INSERT"));
        assert_eq!(sub.recv().await.unwrap().op, "INSERT");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_a_noop() {
        let hub = RealtimeHub::new();
        assert_eq!(hub.subscriber_count(), 0);
        hub.publish(change("users", "INSERT"));
    }

    #[tokio::test]
    async fn test_change_payload_round_trips_as_json() {
        let parsed: TableChange = serde_json::from_str(
            r#"{"table":"analysis_results","op":"INSERT","record":{"id":7,"file_name":"wk1.xlsx"}}"#,
        )
        .unwrap();
        assert_eq!(parsed.table, "analysis_results");
        assert_eq!(parsed.record["file_name"], "wk1.xlsx");

        // `record` may be absent entirely, e.g. for DELETE triggers
        let sparse: TableChange =
            serde_json::from_str(r#"{"table":"users","op":"DELETE"}"#).unwrap();
        assert!(sparse.record.is_null());
    }
}
