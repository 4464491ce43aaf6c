// ── Polling fallback ──
//
// Points without a COV subscription are refreshed on a fixed interval,
// one task per point. A failed cycle is logged and the next tick
// retries; the point keeps its last applied attributes in between.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::fetch;
use crate::mapper::MapperCtx;
use crate::tree::Point;
use bacgate_proto::RemoteLink;

struct PollEntry {
    cancel: CancellationToken,
}

/// Per-device poll scheduler, one entry per node. Duplicated nodes
/// mirror the same remote object and poll independently.
pub struct Poller<L> {
    link: Arc<L>,
    interval: Duration,
    tasks: DashMap<u64, PollEntry>,
    cancel: CancellationToken,
}

impl<L: RemoteLink> Poller<L> {
    pub fn new(link: Arc<L>, interval: Duration) -> Arc<Self> {
        Arc::new(Self {
            link,
            interval,
            tasks: DashMap::new(),
            cancel: CancellationToken::new(),
        })
    }

    /// Start (or restart) the poll loop for a point.
    pub fn schedule(&self, point: Arc<Point>, ctx: MapperCtx) {
        let id = point.id();
        if let Some((_, old)) = self.tasks.remove(&id) {
            old.cancel.cancel();
        }
        let cancel = self.cancel.child_token();
        tokio::spawn(poll_loop(
            self.link.clone(),
            point,
            ctx,
            self.interval,
            cancel.clone(),
        ));
        self.tasks.insert(id, PollEntry { cancel });
    }

    /// Stop polling a node. Synchronous; no further cycle starts after
    /// this returns.
    pub fn cancel(&self, point: &Point) {
        if let Some((_, entry)) = self.tasks.remove(&point.id()) {
            entry.cancel.cancel();
        }
    }

    pub fn is_scheduled(&self, point: &Point) -> bool {
        self.tasks.contains_key(&point.id())
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.tasks.clear();
    }
}

async fn poll_loop<L: RemoteLink>(
    link: Arc<L>,
    point: Arc<Point>,
    ctx: MapperCtx,
    interval: Duration,
    cancel: CancellationToken,
) {
    let points = [point];
    loop {
        tokio::select! {
            () = cancel.cancelled() => return,
            () = tokio::time::sleep(interval) => {}
        }
        if let Err(e) = fetch::run(link.as_ref(), &points, &ctx).await {
            debug!(object = %points[0].object(), error = %e, "poll cycle failed");
        }
    }
}
