//! # Change Feed & Live Subscriptions
//!
//! Every vehicle write publishes a [`VehicleChange`] on an in-process
//! broadcast channel. A [`Subscription`] owns a background task that
//! re-reads its result set whenever a matching change arrives and pushes
//! the full snapshot to the subscriber.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  VehicleRepository::insert/update/delete/apply_rental                  │
//! │       │                                                                 │
//! │       │ publish(VehicleChange)                                          │
//! │       ▼                                                                 │
//! │  ┌──────────────────────┐                                               │
//! │  │ broadcast::Sender    │──────┬───────────────┬─────────────┐         │
//! │  └──────────────────────┘      │               │             │         │
//! │                                ▼               ▼             ▼         │
//! │                        Owner("u1") task  Plate("ABC") task  ...        │
//! │                                │                                        │
//! │                   key matches? │ re-read list                           │
//! │                                ▼                                        │
//! │                        mpsc → Subscription::next()                      │
//! │                                                                         │
//! │  Initial snapshot is delivered before any change.                      │
//! │  cancel() or drop stops the task.                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use parknow_core::Vehicle;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::DbResult;
use crate::repository::vehicle::VehicleRepository;

/// Snapshots buffered per subscription before the task waits on the reader.
const SNAPSHOT_BUFFER: usize = 16;

// =============================================================================
// Change Events
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Rented,
    Deleted,
}

/// A committed write to the vehicles table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleChange {
    pub kind: ChangeKind,
    pub vehicle_id: String,
    pub owner_id: String,
    /// Plates the change touches: the current one, plus the previous one
    /// when an edit renamed it.
    pub plates: Vec<String>,
}

/// Broadcast side of the feed. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<VehicleChange>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        ChangeFeed { tx }
    }

    /// Publishes a change. Having no listeners is not an error.
    pub fn publish(&self, change: VehicleChange) {
        debug!(
            vehicle_id = %change.vehicle_id,
            kind = ?change.kind,
            listeners = self.tx.receiver_count(),
            "Publishing vehicle change"
        );
        let _ = self.tx.send(change);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<VehicleChange> {
        self.tx.subscribe()
    }
}

// =============================================================================
// Subscription Keys
// =============================================================================

/// What a live subscription watches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionKey {
    /// All vehicles registered by a user.
    Owner(String),
    /// All vehicles with exactly this (normalized) plate.
    Plate(String),
}

impl SubscriptionKey {
    pub fn matches(&self, change: &VehicleChange) -> bool {
        match self {
            SubscriptionKey::Owner(owner_id) => &change.owner_id == owner_id,
            SubscriptionKey::Plate(plate) => change.plates.iter().any(|p| p == plate),
        }
    }

    async fn fetch(&self, repo: &VehicleRepository) -> DbResult<Vec<Vehicle>> {
        match self {
            SubscriptionKey::Owner(owner_id) => repo.list_by_owner(owner_id).await,
            SubscriptionKey::Plate(plate) => repo.find_by_plate(plate).await,
        }
    }
}

// =============================================================================
// Subscription
// =============================================================================

/// A cancellable live query.
///
/// ## Usage
/// ```rust,ignore
/// let mut sub = db.vehicles().subscribe(SubscriptionKey::Owner(user_id)).await?;
/// while let Some(vehicles) = sub.next().await {
///     render(&vehicles);
/// }
/// ```
#[derive(Debug)]
pub struct Subscription {
    snapshots: mpsc::Receiver<Vec<Vehicle>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Opens a subscription and queues the current result set.
    ///
    /// The feed is joined before the initial read so no change committed
    /// after the read can be missed.
    pub(crate) async fn open(repo: VehicleRepository, key: SubscriptionKey) -> DbResult<Self> {
        let changes = repo.feed().subscribe();
        let initial = key.fetch(&repo).await?;

        let (snapshot_tx, snapshots) = mpsc::channel(SNAPSHOT_BUFFER);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        // Buffer is empty, so this cannot fail for lack of capacity.
        let _ = snapshot_tx.try_send(initial);

        debug!(?key, "Subscription opened");

        let task = tokio::spawn(Self::run(
            repo,
            key,
            changes,
            snapshot_tx,
            shutdown_rx,
        ));

        Ok(Subscription {
            snapshots,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    async fn run(
        repo: VehicleRepository,
        key: SubscriptionKey,
        mut changes: broadcast::Receiver<VehicleChange>,
        snapshot_tx: mpsc::Sender<Vec<Vehicle>>,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) {
        loop {
            let refresh = tokio::select! {
                _ = &mut shutdown_rx => break,
                change = changes.recv() => match change {
                    Ok(change) => key.matches(&change),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(?key, skipped, "Subscription lagged, re-reading");
                        true
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            };

            if !refresh {
                continue;
            }

            match key.fetch(&repo).await {
                Ok(vehicles) => {
                    // A full buffer must not block cancellation.
                    tokio::select! {
                        _ = &mut shutdown_rx => break,
                        sent = snapshot_tx.send(vehicles) => {
                            if sent.is_err() {
                                break;
                            }
                        }
                    }
                }
                Err(e) => warn!(?key, error = %e, "Subscription refresh failed"),
            }
        }

        debug!(?key, "Subscription stopped");
    }

    /// Waits for the next snapshot. `None` once the subscription has stopped.
    pub async fn next(&mut self) -> Option<Vec<Vehicle>> {
        self.snapshots.recv().await
    }

    /// Stops the background task and waits for it to finish.
    pub async fn cancel(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn change(owner: &str, plates: &[&str]) -> VehicleChange {
        VehicleChange {
            kind: ChangeKind::Updated,
            vehicle_id: "v1".to_string(),
            owner_id: owner.to_string(),
            plates: plates.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_owner_key_matches() {
        let key = SubscriptionKey::Owner("u1".to_string());
        assert!(key.matches(&change("u1", &["ABC1234"])));
        assert!(!key.matches(&change("u2", &["ABC1234"])));
    }

    #[test]
    fn test_plate_key_matches_old_and_new_plate() {
        let key = SubscriptionKey::Plate("OLD0001".to_string());
        assert!(key.matches(&change("u1", &["NEW0001", "OLD0001"])));
        assert!(!key.matches(&change("u1", &["NEW0001"])));
    }

    #[tokio::test]
    async fn test_publish_without_listeners() {
        let feed = ChangeFeed::new(4);
        feed.publish(change("u1", &["ABC1234"]));

        let mut rx = feed.subscribe();
        feed.publish(change("u2", &["XYZ0000"]));
        assert_eq!(rx.recv().await.unwrap().owner_id, "u2");
    }
}
