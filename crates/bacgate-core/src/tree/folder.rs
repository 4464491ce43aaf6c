// ── Folder hierarchy ──
//
// Folders organize mirrored points and carry every structural edit:
// add, remove, duplicate, rename, restore. Structural state lives in
// two places that are kept in step — the runtime child map and the
// session store — and duplicate/rename go through the store on purpose:
// the copy is rebuilt from its serialized form, so a duplicated point
// gets fresh runtime state (subscription, poll task) instead of sharing
// the original's.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicU32;

use dashmap::{DashMap, DashSet};
use futures_util::TryStreamExt;
use serde_json::{Value as Json, json};
use tracing::{debug, info, warn};

use crate::config::{CovMode, GatewayConfig};
use crate::discovery;
use crate::error::CoreError;
use crate::fetch;
use crate::mapper::MapperCtx;
use crate::model::PointConfig;
use crate::plan;
use crate::poller::Poller;
use crate::session::{AttrMap, SENTINEL_NODES, SessionStore, attr};
use crate::subscription::SubscriptionManager;
use crate::tree::Point;
use bacgate_proto::{ObjectRef, ObjectType, RemoteLink};

// ── Shared per-device state ─────────────────────────────────────────

/// State shared by every folder under one gateway root.
pub struct RootShared<L> {
    pub(crate) link: Arc<L>,
    pub(crate) subscriptions: Arc<SubscriptionManager<L>>,
    pub(crate) poller: Arc<Poller<L>>,
    /// Every object reference ever seen by discovery or restore.
    /// Grow-only: removal of a point does not forget its reference, so
    /// re-discovery will not resurrect deleted points.
    pub(crate) known: DashSet<ObjectRef>,
    /// Serializes discovery runs for the whole subtree.
    discovery_gate: tokio::sync::Mutex<()>,
    pub(crate) config: GatewayConfig,
}

impl<L: RemoteLink> RootShared<L> {
    pub(crate) fn new(
        link: Arc<L>,
        subscriptions: Arc<SubscriptionManager<L>>,
        poller: Arc<Poller<L>>,
        config: GatewayConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            link,
            subscriptions,
            poller,
            known: DashSet::new(),
            discovery_gate: tokio::sync::Mutex::new(()),
            config,
        })
    }
}

// ── Children ────────────────────────────────────────────────────────

/// One entry of a folder's child map.
pub enum Child<L> {
    Folder(Arc<Folder<L>>),
    Point(Arc<Point>),
}

impl<L> Clone for Child<L> {
    fn clone(&self) -> Self {
        match self {
            Self::Folder(folder) => Self::Folder(folder.clone()),
            Self::Point(point) => Self::Point(point.clone()),
        }
    }
}

impl<L> fmt::Debug for Child<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Folder(folder) => f.debug_tuple("Folder").field(&folder.name).finish(),
            Self::Point(point) => f.debug_tuple("Point").field(&point.name()).finish(),
        }
    }
}

// ── Folder ──────────────────────────────────────────────────────────

/// A node grouping mirrored points and subfolders.
pub struct Folder<L> {
    name: String,
    /// Segments from the store root to this node, inclusive.
    path: Vec<String>,
    children: DashMap<String, Child<L>>,
    shared: Arc<RootShared<L>>,
    store: Arc<dyn SessionStore>,
    /// Counter behind `unnamed device <n>` names for this folder's
    /// points.
    unnamed: Arc<AtomicU32>,
}

impl<L: RemoteLink> Folder<L> {
    pub(crate) fn root(
        shared: Arc<RootShared<L>>,
        store: Arc<dyn SessionStore>,
        name: &str,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_owned(),
            path: vec![name.to_owned()],
            children: DashMap::new(),
            shared,
            store,
            unnamed: Arc::new(AtomicU32::new(0)),
        })
    }

    fn child_folder(&self, name: &str) -> Arc<Self> {
        let mut path = self.path.clone();
        path.push(name.to_owned());
        Arc::new(Self {
            name: name.to_owned(),
            path,
            children: DashMap::new(),
            shared: self.shared.clone(),
            store: self.store.clone(),
            unnamed: Arc::new(AtomicU32::new(0)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Look up a direct child.
    pub fn child(&self, name: &str) -> Option<Child<L>> {
        self.children.get(name).map(|c| c.value().clone())
    }

    pub fn child_names(&self) -> Vec<String> {
        self.children.iter().map(|c| c.key().clone()).collect()
    }

    fn child_path(&self, name: &str) -> Vec<String> {
        let mut path = self.path.clone();
        path.push(name.to_owned());
        path
    }

    fn ctx(&self) -> MapperCtx {
        MapperCtx {
            device: self.shared.link.device_ref(),
            unnamed: self.unnamed.clone(),
        }
    }

    fn check_name_free(&self, name: &str) -> Result<(), CoreError> {
        if name.is_empty() {
            return Err(CoreError::validation("node name must not be empty"));
        }
        if self.children.contains_key(name) {
            return Err(CoreError::validation(format!(
                "name already in use: {name}"
            )));
        }
        Ok(())
    }

    // ── Structural edits ─────────────────────────────────────────────

    /// Create an empty subfolder.
    pub fn add_folder(self: &Arc<Self>, name: &str) -> Result<Arc<Self>, CoreError> {
        self.check_name_free(name)?;
        let mut attrs = AttrMap::new();
        attrs.insert(attr::RESTORE_TYPE.to_owned(), json!(attr::RESTORE_FOLDER));
        self.store.save(&self.child_path(name), &attrs)?;

        let folder = self.child_folder(name);
        self.children
            .insert(name.to_owned(), Child::Folder(folder.clone()));
        Ok(folder)
    }

    /// Mirror one explicitly chosen remote object under this folder:
    /// persist it, fetch its planned properties once, then put it on
    /// COV or the poll schedule.
    pub async fn add_object(
        self: &Arc<Self>,
        name: &str,
        config: PointConfig,
    ) -> Result<Arc<Point>, CoreError> {
        self.check_name_free(name)?;
        self.store
            .save(&self.child_path(name), &point_attrs(&config))?;

        let point = Point::new(name, config);
        self.shared.known.insert(config.object);
        self.children
            .insert(name.to_owned(), Child::Point(point.clone()));

        fetch::run(
            self.shared.link.as_ref(),
            std::slice::from_ref(&point),
            &self.ctx(),
        )
        .await?;
        self.attach(&point);
        Ok(point)
    }

    /// Remove a child and its whole subtree, runtime and persisted.
    /// Point teardown is synchronous: no COV delivery or poll cycle
    /// starts for a removed point after this returns.
    pub fn remove_child(&self, name: &str) -> Result<(), CoreError> {
        let Some((_, child)) = self.children.remove(name) else {
            return Err(CoreError::validation(format!("no such child: {name}")));
        };
        self.teardown(&child);
        self.store.remove(&self.child_path(name))
    }

    fn teardown(&self, child: &Child<L>) {
        match child {
            Child::Point(point) => self.detach(point),
            Child::Folder(folder) => {
                for entry in &folder.children {
                    folder.teardown(entry.value());
                }
                folder.children.clear();
            }
        }
    }

    /// Copy a child under a new name. The copy is rebuilt from its
    /// serialized subtree and fetched fresh. An empty or unchanged
    /// `new_name` is a no-op.
    pub async fn duplicate_child(
        self: &Arc<Self>,
        name: &str,
        new_name: &str,
    ) -> Result<Option<Child<L>>, CoreError> {
        if new_name.is_empty() || new_name == name {
            return Ok(None);
        }
        if !self.children.contains_key(name) {
            return Err(CoreError::validation(format!("no such child: {name}")));
        }
        self.check_name_free(new_name)?;

        let subtree = self
            .store
            .export_subtree(&self.child_path(name))?
            .ok_or_else(|| CoreError::session(format!("no persisted state for {name}")))?;
        self.store
            .import_subtree(&self.child_path(new_name), subtree)?;

        let child = self.restore_entry(new_name)?;
        if let Some(child) = &child {
            self.sync_child(child).await?;
        }
        Ok(child)
    }

    /// Rename a child: duplicate under the new name, then remove the
    /// original. The renamed node keeps its persisted attributes but
    /// gets fresh runtime state.
    pub async fn rename_child(
        self: &Arc<Self>,
        name: &str,
        new_name: &str,
    ) -> Result<Option<Child<L>>, CoreError> {
        let Some(child) = self.duplicate_child(name, new_name).await? else {
            return Ok(None);
        };
        self.remove_child(name)?;
        Ok(Some(child))
    }

    // ── Restore ──────────────────────────────────────────────────────

    /// Rebuild this folder's subtree from the session store. Nodes that
    /// cannot be restored are pruned from the store; sentinel service
    /// nodes are left alone.
    pub(crate) fn restore(self: &Arc<Self>) -> Result<(), CoreError> {
        for name in self.store.children(&self.path)? {
            if SENTINEL_NODES.contains(&name.as_str()) {
                continue;
            }
            self.restore_entry(&name)?;
        }
        Ok(())
    }

    /// Restore one named child from its persisted node. Returns `None`
    /// when the node was unrecognizable and got pruned.
    fn restore_entry(self: &Arc<Self>, name: &str) -> Result<Option<Child<L>>, CoreError> {
        let path = self.child_path(name);
        let Some(attrs) = self.store.load(&path)? else {
            return Ok(None);
        };
        match attrs.get(attr::RESTORE_TYPE).and_then(Json::as_str) {
            Some(attr::RESTORE_FOLDER) => {
                let folder = self.child_folder(name);
                folder.restore()?;
                let child = Child::Folder(folder);
                self.children.insert(name.to_owned(), child.clone());
                Ok(Some(child))
            }
            Some(attr::RESTORE_POINT) => match parse_point(&attrs) {
                Some((config, had_priority)) => {
                    if !had_priority {
                        // Nodes persisted before the attribute existed
                        // are upgraded in place.
                        self.store.set_attr(
                            &path,
                            attr::DEFAULT_PRIORITY,
                            json!(config.default_priority),
                        )?;
                    }
                    self.shared.known.insert(config.object);
                    let child = Child::Point(Point::new(name, config));
                    self.children.insert(name.to_owned(), child.clone());
                    Ok(Some(child))
                }
                None => {
                    warn!(node = name, "persisted point is missing required attributes, pruning");
                    self.store.remove(&path)?;
                    Ok(None)
                }
            },
            _ => {
                warn!(node = name, "persisted node has no recognizable kind, pruning");
                self.store.remove(&path)?;
                Ok(None)
            }
        }
    }

    // ── Synchronization ──────────────────────────────────────────────

    /// Every point in this subtree.
    pub fn points(&self) -> Vec<Arc<Point>> {
        let mut out = Vec::new();
        self.collect_points(&mut out);
        out
    }

    fn collect_points(&self, out: &mut Vec<Arc<Point>>) {
        for entry in &self.children {
            match entry.value() {
                Child::Point(point) => out.push(point.clone()),
                Child::Folder(folder) => folder.collect_points(out),
            }
        }
    }

    /// Fetch and attach one restored or duplicated child.
    async fn sync_child(self: &Arc<Self>, child: &Child<L>) -> Result<(), CoreError> {
        match child {
            Child::Point(point) => {
                fetch::run(
                    self.shared.link.as_ref(),
                    std::slice::from_ref(point),
                    &self.ctx(),
                )
                .await?;
                self.attach(point);
            }
            Child::Folder(folder) => {
                folder.sync_all().await?;
            }
        }
        Ok(())
    }

    /// Fetch and attach every point in this subtree, one batch per
    /// folder so name fallbacks use each folder's own counter.
    pub(crate) async fn sync_all(self: &Arc<Self>) -> Result<usize, CoreError> {
        let mut points = Vec::new();
        let mut folders = Vec::new();
        for entry in &self.children {
            match entry.value() {
                Child::Point(point) => points.push(point.clone()),
                Child::Folder(folder) => folders.push(folder.clone()),
            }
        }

        fetch::run(self.shared.link.as_ref(), &points, &self.ctx()).await?;
        for point in &points {
            self.attach(point);
        }
        let mut count = points.len();
        for folder in folders {
            count += Box::pin(folder.sync_all()).await?;
        }
        Ok(count)
    }

    /// Put a point on COV or the poll fallback.
    fn attach(&self, point: &Arc<Point>) {
        let ctx = self.ctx();
        if !self
            .shared
            .subscriptions
            .subscribe(point.clone(), ctx.clone())
        {
            self.shared.poller.schedule(point.clone(), ctx);
        }
    }

    fn detach(&self, point: &Point) {
        self.shared.subscriptions.unsubscribe(point);
        self.shared.poller.cancel(point);
    }

    // ── Discovery ────────────────────────────────────────────────────

    /// Discover remote objects not yet mirrored anywhere under this
    /// gateway and add them as points of this folder. Runs are
    /// serialized per device; concurrent calls queue up and see each
    /// other's additions. Returns the number of points added.
    pub async fn discover_objects(self: &Arc<Self>) -> Result<usize, CoreError> {
        let _gate = self.shared.discovery_gate.lock().await;

        let found: Vec<ObjectRef> = discovery::discover(self.shared.link.as_ref(), &self.shared.known)
            .try_collect()
            .await?;

        let mut added = Vec::new();
        for oid in found {
            if Some(oid) == self.shared.link.device_ref() {
                // The gateway root already mirrors its own device object.
                continue;
            }
            let name = oid.to_string();
            if self.children.contains_key(&name) {
                debug!(object = %oid, "discovered object already mirrored, skipping");
                continue;
            }
            let mut config = PointConfig::new(oid);
            config.use_cov = self.shared.config.cov_mode != CovMode::None
                && plan::properties_for(oid.object_type).contains(&bacgate_proto::PropertyId::PresentValue);
            config.settable = plan::default_settable(oid.object_type);
            self.store.save(&self.child_path(&name), &point_attrs(&config))?;

            let point = Point::new(&name, config);
            self.children
                .insert(name.clone(), Child::Point(point.clone()));
            added.push(point);
        }

        if added.is_empty() {
            return Ok(0);
        }
        info!(count = added.len(), folder = %self.name, "discovered new objects");
        fetch::run(self.shared.link.as_ref(), &added, &self.ctx()).await?;
        for point in &added {
            self.attach(point);
        }
        Ok(added.len())
    }
}

// ── Persisted point attributes ──────────────────────────────────────

fn point_attrs(config: &PointConfig) -> AttrMap {
    let mut attrs = AttrMap::new();
    attrs.insert(attr::RESTORE_TYPE.to_owned(), json!(attr::RESTORE_POINT));
    attrs.insert(
        attr::OBJECT_TYPE.to_owned(),
        json!(config.object.object_type.to_string()),
    );
    attrs.insert(
        attr::OBJECT_INSTANCE.to_owned(),
        json!(config.object.instance),
    );
    attrs.insert(attr::USE_COV.to_owned(), json!(config.use_cov));
    attrs.insert(attr::SETTABLE.to_owned(), json!(config.settable));
    attrs.insert(
        attr::DEFAULT_PRIORITY.to_owned(),
        json!(config.default_priority),
    );
    attrs
}

/// Parse a persisted point node. `None` when a required attribute is
/// missing or malformed. The bool reports whether the optional default
/// priority was present.
fn parse_point(attrs: &AttrMap) -> Option<(PointConfig, bool)> {
    let object_type = attrs
        .get(attr::OBJECT_TYPE)?
        .as_str()?
        .parse::<ObjectType>()
        .ok()?;
    let instance = u32::try_from(attrs.get(attr::OBJECT_INSTANCE)?.as_u64()?).ok()?;
    let use_cov = attrs.get(attr::USE_COV)?.as_bool()?;
    let settable = attrs.get(attr::SETTABLE)?.as_bool()?;
    let priority = attrs
        .get(attr::DEFAULT_PRIORITY)
        .and_then(Json::as_u64)
        .and_then(|p| u8::try_from(p).ok());

    let mut config = PointConfig::new(ObjectRef::new(object_type, instance));
    config.use_cov = use_cov;
    config.settable = settable;
    if let Some(priority) = priority {
        config.default_priority = priority;
    }
    Some((config, priority.is_some()))
}
