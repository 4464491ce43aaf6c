// ── Gateway ──
//
// Ties one link, one session store, and one folder tree together. The
// embedding application builds a `Gateway` per remote device and drives
// it: `restore` first, `discover` whenever it wants the object list
// re-walked, `shutdown` on the way out.

use std::sync::Arc;

use serde_json::json;
use tracing::info;

use crate::config::GatewayConfig;
use crate::error::CoreError;
use crate::poller::Poller;
use crate::session::{SessionStore, attr};
use crate::subscription::SubscriptionManager;
use crate::tree::{Folder, RootShared};
use bacgate_proto::RemoteLink;

/// One mirrored remote device.
pub struct Gateway<L> {
    root: Arc<Folder<L>>,
    shared: Arc<RootShared<L>>,
}

impl<L: RemoteLink> Gateway<L> {
    /// Build a gateway and persist its root node. Starts the COV
    /// router; nothing is fetched until `restore` or `discover`.
    pub fn new(
        link: Arc<L>,
        store: Arc<dyn SessionStore>,
        config: GatewayConfig,
    ) -> Result<Self, CoreError> {
        let subscriptions = SubscriptionManager::new(link.clone(), config.cov());
        let poller = Poller::new(link.clone(), config.poll_interval);

        let mut attrs = config.to_attrs();
        attrs.insert(attr::RESTORE_TYPE.to_owned(), json!(attr::RESTORE_FOLDER));
        store.save(&[config.name.clone()], &attrs)?;

        let name = config.name.clone();
        let shared = RootShared::new(link, subscriptions, poller, config);
        let root = Folder::root(shared.clone(), store, &name);
        Ok(Self { root, shared })
    }

    /// Read a previously persisted gateway configuration back out of a
    /// store, for reopening a session. `None` when the node is absent
    /// or incomplete.
    pub fn stored_config(
        store: &dyn SessionStore,
        name: &str,
    ) -> Result<Option<GatewayConfig>, CoreError> {
        let Some(attrs) = store.load(&[name.to_owned()])? else {
            return Ok(None);
        };
        Ok(GatewayConfig::from_attrs(name, &attrs))
    }

    pub fn root(&self) -> &Arc<Folder<L>> {
        &self.root
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.shared.config
    }

    /// Rebuild the tree from the session store, fetch every restored
    /// point once, and put each on COV or the poll schedule. Returns
    /// the number of live points.
    pub async fn restore(&self) -> Result<usize, CoreError> {
        self.root.restore()?;
        let count = self.root.sync_all().await?;
        info!(gateway = %self.root.name(), points = count, "session restored");
        Ok(count)
    }

    /// Walk the remote object list and mirror everything new under the
    /// root folder.
    pub async fn discover(&self) -> Result<usize, CoreError> {
        self.root.discover_objects().await
    }

    /// Stop every subscription, poll task, and the notification router.
    pub fn shutdown(&self) {
        self.shared.subscriptions.shutdown();
        self.shared.poller.shutdown();
    }
}
