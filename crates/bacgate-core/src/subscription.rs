// ── COV subscription lifecycle ──
//
// One manager per mirrored device. Each subscribed point owns a
// capacity-one pending slot: the router overwrites it on every matching
// notification (latest wins, intermediates dropped) and a drain task
// feeds whatever is current through the mapper. Subscriptions are
// re-sent on a schedule strictly inside the lease so the peer never
// sees them expire.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::{CovConfig, CovMode};
use crate::mapper::{self, MapperCtx};
use crate::tree::Point;
use bacgate_proto::{CovNotification, CovRequest, ObjectRef, RemoteLink};

struct SubEntry {
    object: ObjectRef,
    cancel: CancellationToken,
    pending: watch::Sender<Option<Arc<CovNotification>>>,
}

/// Tracks active change subscriptions for one device.
///
/// Keyed by point id, not by object: duplicated nodes mirror the same
/// remote object and each keeps its own lifecycle.
pub struct SubscriptionManager<L> {
    link: Arc<L>,
    cov: CovConfig,
    subs: Arc<DashMap<u64, SubEntry>>,
    next_process_id: AtomicU32,
    cancel: CancellationToken,
}

impl<L: RemoteLink> SubscriptionManager<L> {
    /// Build the manager and start its notification router.
    pub fn new(link: Arc<L>, cov: CovConfig) -> Arc<Self> {
        let manager = Arc::new(Self {
            link,
            cov,
            subs: Arc::new(DashMap::new()),
            next_process_id: AtomicU32::new(1),
            cancel: CancellationToken::new(),
        });
        tokio::spawn(route_notifications(
            manager.link.clone(),
            manager.subs.clone(),
            manager.cancel.clone(),
        ));
        manager
    }

    /// Subscribe a point. Returns false when COV is off for the device
    /// or for this point; the caller falls back to polling.
    pub fn subscribe(&self, point: Arc<Point>, ctx: MapperCtx) -> bool {
        if self.cov.mode == CovMode::None || !point.config().use_cov {
            return false;
        }
        let oid = point.object();
        // Re-subscribing the same node replaces its lifecycle wholesale.
        if let Some((_, old)) = self.subs.remove(&point.id()) {
            old.cancel.cancel();
        }

        let process_id = self.next_process_id.fetch_add(1, Ordering::Relaxed);
        let cancel = self.cancel.child_token();
        let (pending, pending_rx) = watch::channel(None);

        tokio::spawn(maintain_subscription(
            self.link.clone(),
            CovRequest {
                process_id,
                object: oid,
                confirmed: self.cov.mode == CovMode::Confirmed,
                lifetime_secs: u32::try_from(self.cov.lease.as_secs()).unwrap_or(u32::MAX),
            },
            self.cov.lease,
            cancel.clone(),
        ));
        let id = point.id();
        tokio::spawn(drain_pending(point, ctx, pending_rx, cancel.clone()));

        self.subs.insert(
            id,
            SubEntry {
                object: oid,
                cancel,
                pending,
            },
        );
        true
    }

    /// Drop one node's subscription, stopping its renewal and drain
    /// tasks. Synchronous so teardown cannot race a new value in.
    pub fn unsubscribe(&self, point: &Point) {
        if let Some((_, entry)) = self.subs.remove(&point.id()) {
            entry.cancel.cancel();
        }
    }

    pub fn is_subscribed(&self, point: &Point) -> bool {
        self.subs.contains_key(&point.id())
    }

    /// Observe a node's pending slot directly.
    pub fn pending_receiver(
        &self,
        point: &Point,
    ) -> Option<watch::Receiver<Option<Arc<CovNotification>>>> {
        self.subs
            .get(&point.id())
            .map(|entry| entry.pending.subscribe())
    }

    /// Cancel every subscription and the router.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.subs.clear();
    }
}

/// Match incoming notifications to subscribed nodes and overwrite
/// their pending slots. Every node mirroring the monitored object gets
/// the notification.
async fn route_notifications<L: RemoteLink>(
    link: Arc<L>,
    subs: Arc<DashMap<u64, SubEntry>>,
    cancel: CancellationToken,
) {
    let mut notifications = link.cov_notifications();
    loop {
        let notification = tokio::select! {
            () = cancel.cancelled() => return,
            received = notifications.recv() => match received {
                Ok(n) => n,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "notification stream lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return,
            },
        };
        if link.device_ref() != Some(notification.initiating_device) {
            continue;
        }
        for entry in subs.iter() {
            if entry.object == notification.monitored_object {
                entry.pending.send_replace(Some(notification.clone()));
            }
        }
    }
}

/// Send the subscription immediately, then keep re-sending it before
/// the lease runs out.
async fn maintain_subscription<L: RemoteLink>(
    link: Arc<L>,
    request: CovRequest,
    lease: Duration,
    cancel: CancellationToken,
) {
    let renewal = (lease * 3 / 4).max(Duration::from_secs(1));
    loop {
        if let Err(e) = link.send_subscription(request).await {
            // The renewal tick doubles as the retry schedule.
            debug!(object = %request.object, error = %e, "subscription send failed");
        }
        tokio::select! {
            () = cancel.cancelled() => return,
            () = tokio::time::sleep(renewal) => {}
        }
    }
}

/// Apply whatever is in the pending slot each time it changes.
async fn drain_pending(
    point: Arc<Point>,
    ctx: MapperCtx,
    mut pending: watch::Receiver<Option<Arc<CovNotification>>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => return,
            changed = pending.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }
        let Some(notification) = pending.borrow_and_update().clone() else {
            continue;
        };
        for (property, value) in &notification.values {
            mapper::apply(&point, &ctx, *property, value);
        }
    }
}
