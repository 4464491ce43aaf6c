// ── Session persistence ──
//
// The mirrored tree is persisted as one JSON document of nested nodes,
// each `{"attrs": {...}, "children": {name: node}}`. Paths are segment
// lists from the root node (the empty path). Export/import of whole
// subtrees is the primitive behind duplicate and rename: the engine
// copies serialized state and rebuilds runtime objects from it, never
// the other way around.

use std::path::PathBuf;
use std::sync::Mutex;

use serde_json::{Map, Value as Json, json};
use tracing::warn;

use crate::error::CoreError;

/// Flat attribute map of one node.
pub type AttrMap = Map<String, Json>;

/// Persisted attribute names and values.
pub mod attr {
    /// Node kind marker, present on every restorable node.
    pub const RESTORE_TYPE: &str = "restore type";
    pub const RESTORE_FOLDER: &str = "folder";
    pub const RESTORE_POINT: &str = "point";

    pub const OBJECT_TYPE: &str = "object type";
    pub const OBJECT_INSTANCE: &str = "object instance number";
    pub const USE_COV: &str = "use COV";
    pub const SETTABLE: &str = "settable";
    pub const DEFAULT_PRIORITY: &str = "default priority";
}

/// Child names that are never restored or pruned: transient service
/// nodes recreated by the embedding application.
pub const SENTINEL_NODES: [&str; 2] = ["STATUS", "EVENTS"];

/// Storage for one gateway's persisted tree.
pub trait SessionStore: Send + Sync {
    /// Attributes of the node at `path`, or `None` if absent.
    fn load(&self, path: &[String]) -> Result<Option<AttrMap>, CoreError>;

    /// Create or replace the node at `path` with these attributes,
    /// creating missing ancestors. Existing children are kept.
    fn save(&self, path: &[String], attrs: &AttrMap) -> Result<(), CoreError>;

    /// Set one attribute on an existing node.
    fn set_attr(&self, path: &[String], key: &str, value: Json) -> Result<(), CoreError>;

    /// Child names of the node at `path`, empty if the node is absent.
    fn children(&self, path: &[String]) -> Result<Vec<String>, CoreError>;

    /// Remove the node at `path` and its whole subtree.
    fn remove(&self, path: &[String]) -> Result<(), CoreError>;

    /// Serialize the subtree rooted at `path`.
    fn export_subtree(&self, path: &[String]) -> Result<Option<Json>, CoreError>;

    /// Splice a serialized subtree in at `path`, replacing any node
    /// already there.
    fn import_subtree(&self, path: &[String], subtree: Json) -> Result<(), CoreError>;
}

// ── Document helpers ────────────────────────────────────────────────

fn empty_node() -> Json {
    json!({ "attrs": {}, "children": {} })
}

fn descend<'a>(mut node: &'a Json, path: &[String]) -> Option<&'a Json> {
    for segment in path {
        node = node.get("children")?.get(segment)?;
    }
    Some(node)
}

fn descend_or_create<'a>(mut node: &'a mut Json, path: &[String]) -> &'a mut Json {
    for segment in path {
        if !node.is_object() {
            *node = empty_node();
        }
        let map = node.as_object_mut().expect("node is an object");
        let children = map
            .entry("children")
            .or_insert_with(|| Json::Object(Map::new()));
        if !children.is_object() {
            *children = Json::Object(Map::new());
        }
        node = children
            .as_object_mut()
            .expect("children is an object")
            .entry(segment.clone())
            .or_insert_with(empty_node);
    }
    node
}

fn doc_load(root: &Json, path: &[String]) -> Option<AttrMap> {
    descend(root, path)?.get("attrs")?.as_object().cloned()
}

fn doc_save(root: &mut Json, path: &[String], attrs: &AttrMap) {
    let node = descend_or_create(root, path);
    if !node.is_object() {
        *node = empty_node();
    }
    let map = node.as_object_mut().expect("node is an object");
    map.insert("attrs".to_owned(), Json::Object(attrs.clone()));
    map.entry("children")
        .or_insert_with(|| Json::Object(Map::new()));
}

fn doc_set_attr(root: &mut Json, path: &[String], key: &str, value: Json) {
    let node = descend_or_create(root, path);
    let map = node.as_object_mut().expect("node is an object");
    let attrs = map
        .entry("attrs")
        .or_insert_with(|| Json::Object(Map::new()));
    if let Some(attrs) = attrs.as_object_mut() {
        attrs.insert(key.to_owned(), value);
    }
}

fn doc_children(root: &Json, path: &[String]) -> Vec<String> {
    descend(root, path)
        .and_then(|n| n.get("children"))
        .and_then(Json::as_object)
        .map(|m| m.keys().cloned().collect())
        .unwrap_or_default()
}

fn doc_remove(root: &mut Json, path: &[String]) {
    let Some((name, parent_path)) = path.split_last() else {
        *root = empty_node();
        return;
    };
    let parent = descend_or_create(root, parent_path);
    if let Some(children) = parent.get_mut("children").and_then(Json::as_object_mut) {
        children.remove(name);
    }
}

fn doc_import(root: &mut Json, path: &[String], subtree: Json) {
    let Some((name, parent_path)) = path.split_last() else {
        *root = subtree;
        return;
    };
    let parent = descend_or_create(root, parent_path);
    let map = parent.as_object_mut().expect("node is an object");
    let children = map
        .entry("children")
        .or_insert_with(|| Json::Object(Map::new()));
    if let Some(children) = children.as_object_mut() {
        children.insert(name.clone(), subtree);
    }
}

// ── In-memory store ─────────────────────────────────────────────────

/// Volatile store, for embedding applications without persistence and
/// for tests.
#[derive(Debug)]
pub struct MemoryStore {
    root: Mutex<Json>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            root: Mutex::new(empty_node()),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Json>, CoreError> {
        self.root
            .lock()
            .map_err(|_| CoreError::session("session document lock poisoned"))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for MemoryStore {
    fn load(&self, path: &[String]) -> Result<Option<AttrMap>, CoreError> {
        let root = self.lock()?;
        Ok(doc_load(&root, path))
    }

    fn save(&self, path: &[String], attrs: &AttrMap) -> Result<(), CoreError> {
        let mut root = self.lock()?;
        doc_save(&mut root, path, attrs);
        Ok(())
    }

    fn set_attr(&self, path: &[String], key: &str, value: Json) -> Result<(), CoreError> {
        let mut root = self.lock()?;
        doc_set_attr(&mut root, path, key, value);
        Ok(())
    }

    fn children(&self, path: &[String]) -> Result<Vec<String>, CoreError> {
        let root = self.lock()?;
        Ok(doc_children(&root, path))
    }

    fn remove(&self, path: &[String]) -> Result<(), CoreError> {
        let mut root = self.lock()?;
        doc_remove(&mut root, path);
        Ok(())
    }

    fn export_subtree(&self, path: &[String]) -> Result<Option<Json>, CoreError> {
        let root = self.lock()?;
        Ok(descend(&root, path).cloned())
    }

    fn import_subtree(&self, path: &[String], subtree: Json) -> Result<(), CoreError> {
        let mut root = self.lock()?;
        doc_import(&mut root, path, subtree);
        Ok(())
    }
}

// ── JSON file store ─────────────────────────────────────────────────

/// Store backed by a single JSON file, flushed after every mutation.
///
/// Flush failures are logged and swallowed: the in-memory document
/// stays authoritative for the rest of the session and the next
/// successful flush writes the full state anyway.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    root: Mutex<Json>,
}

impl JsonFileStore {
    /// Open the store, loading the existing document if the file is
    /// present and parseable.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let path = path.into();
        let root = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| CoreError::session(format!("corrupt session file: {e}")))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => empty_node(),
            Err(e) => {
                return Err(CoreError::session(format!(
                    "cannot read session file {}: {e}",
                    path.display()
                )));
            }
        };
        Ok(Self {
            path,
            root: Mutex::new(root),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Json>, CoreError> {
        self.root
            .lock()
            .map_err(|_| CoreError::session("session document lock poisoned"))
    }

    fn flush(&self, root: &Json) {
        let serialized = match serde_json::to_vec_pretty(root) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "session document failed to serialize");
                return;
            }
        };
        if let Err(e) = std::fs::write(&self.path, serialized) {
            warn!(path = %self.path.display(), error = %e, "session flush failed");
        }
    }
}

impl SessionStore for JsonFileStore {
    fn load(&self, path: &[String]) -> Result<Option<AttrMap>, CoreError> {
        let root = self.lock()?;
        Ok(doc_load(&root, path))
    }

    fn save(&self, path: &[String], attrs: &AttrMap) -> Result<(), CoreError> {
        let mut root = self.lock()?;
        doc_save(&mut root, path, attrs);
        self.flush(&root);
        Ok(())
    }

    fn set_attr(&self, path: &[String], key: &str, value: Json) -> Result<(), CoreError> {
        let mut root = self.lock()?;
        doc_set_attr(&mut root, path, key, value);
        self.flush(&root);
        Ok(())
    }

    fn children(&self, path: &[String]) -> Result<Vec<String>, CoreError> {
        let root = self.lock()?;
        Ok(doc_children(&root, path))
    }

    fn remove(&self, path: &[String]) -> Result<(), CoreError> {
        let mut root = self.lock()?;
        doc_remove(&mut root, path);
        self.flush(&root);
        Ok(())
    }

    fn export_subtree(&self, path: &[String]) -> Result<Option<Json>, CoreError> {
        let root = self.lock()?;
        Ok(descend(&root, path).cloned())
    }

    fn import_subtree(&self, path: &[String], subtree: Json) -> Result<(), CoreError> {
        let mut root = self.lock()?;
        doc_import(&mut root, path, subtree);
        self.flush(&root);
        Ok(())
    }
}
