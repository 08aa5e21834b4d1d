use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::common::traits::{MetricsSink, Notifier};
use crate::common::types::Notification;
use crate::exchanges::registry::VenueRegistry;

/// How long shutdown waits for notifications still in flight
pub const NOTIFICATION_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything the engine talks to, built once at startup
///
/// Components receive this by reference. Apart from the queue of
/// in-flight notifications nothing here changes after construction.
#[derive(Clone)]
pub struct ServiceContext {
    pub registry: VenueRegistry,
    pub notifier: Arc<dyn Notifier>,
    pub metrics: Arc<dyn MetricsSink>,
    deliveries: Arc<Mutex<JoinSet<()>>>,
}

impl ServiceContext {
    pub fn new(
        registry: VenueRegistry,
        notifier: Arc<dyn Notifier>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            registry,
            notifier,
            metrics,
            deliveries: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    fn deliveries(&self) -> MutexGuard<'_, JoinSet<()>> {
        match self.deliveries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Hand a notification to the notifier in the background
    ///
    /// Trading never waits on delivery. Failures are logged and dropped.
    pub fn notify(&self, notification: Notification) {
        let notifier = Arc::clone(&self.notifier);
        let mut deliveries = self.deliveries();
        while deliveries.try_join_next().is_some() {}
        deliveries.spawn(async move {
            if let Err(e) = notifier.send(&notification).await {
                warn!(notifier = notifier.name(), "notification failed: {}", e);
            }
        });
    }

    /// Number of deliveries not yet reaped
    pub fn pending_notifications(&self) -> usize {
        self.deliveries().len()
    }

    /// Wait up to `limit` for in-flight notifications
    ///
    /// Returns how many were abandoned at the deadline.
    pub async fn flush_notifications(&self, limit: Duration) -> usize {
        let mut pending = std::mem::replace(&mut *self.deliveries(), JoinSet::new());
        if pending.is_empty() {
            return 0;
        }
        debug!(pending = pending.len(), "waiting for notifications to be delivered");

        let drained = timeout(limit, async {
            while pending.join_next().await.is_some() {}
        })
        .await;

        match drained {
            Ok(()) => 0,
            Err(_) => {
                let abandoned = pending.len();
                warn!(abandoned, "notifications still in flight after {:?} were dropped", limit);
                pending.abort_all();
                abandoned
            }
        }
    }
}
