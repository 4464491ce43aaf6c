// ── Mirrored point ──

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

use crate::model::{PointAttrs, PointConfig};
use bacgate_proto::ObjectRef;

static NEXT_POINT_ID: AtomicU64 = AtomicU64::new(1);

/// One mirrored remote object.
///
/// The node name is fixed at creation; everything the mapper rewrites
/// lives behind a watch channel, so every mutation doubles as a change
/// notification for subscribers. Two nodes may mirror the same remote
/// object (duplicates), so each point also carries its own id for the
/// subscription and poll registries.
#[derive(Debug)]
pub struct Point {
    id: u64,
    name: String,
    config: PointConfig,
    attrs: watch::Sender<Arc<PointAttrs>>,
}

impl Point {
    pub fn new(name: impl Into<String>, config: PointConfig) -> Arc<Self> {
        let initial = PointAttrs::initial(config.object.object_type);
        let (attrs, _) = watch::channel(Arc::new(initial));
        Arc::new(Self {
            id: NEXT_POINT_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            config,
            attrs,
        })
    }

    /// Identity of this node, distinct from the remote object it mirrors.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Node name under the parent folder.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn object(&self) -> ObjectRef {
        self.config.object
    }

    pub fn config(&self) -> &PointConfig {
        &self.config
    }

    /// Snapshot of the current attributes.
    pub fn attrs(&self) -> Arc<PointAttrs> {
        self.attrs.borrow().clone()
    }

    /// Watch the attributes; the receiver observes every applied write.
    pub fn subscribe(&self) -> watch::Receiver<Arc<PointAttrs>> {
        self.attrs.subscribe()
    }

    /// Apply one batch of field writes as a single notification.
    pub(crate) fn mutate(&self, f: impl FnOnce(&mut PointAttrs)) {
        self.attrs.send_modify(|attrs| f(Arc::make_mut(attrs)));
    }
}
