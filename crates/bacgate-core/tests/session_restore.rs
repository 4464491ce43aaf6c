// Session restore, pruning, and the duplicate/rename edits.

mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::{Value as Json, json};

use bacgate_core::session::attr;
use bacgate_core::{
    AttrMap, Child, CoreError, Gateway, GatewayConfig, MemoryStore, PointConfig, SessionStore,
};
use bacgate_proto::{ObjectRef, ObjectType};
use common::ScriptedDevice;

fn config(name: &str) -> GatewayConfig {
    GatewayConfig {
        name: name.to_owned(),
        ..GatewayConfig::default()
    }
}

fn path(segments: &[&str]) -> Vec<String> {
    segments.iter().map(|s| (*s).to_owned()).collect()
}

fn stored_point(object_type: &str, instance: u32) -> AttrMap {
    let mut attrs = AttrMap::new();
    attrs.insert(attr::RESTORE_TYPE.to_owned(), json!(attr::RESTORE_POINT));
    attrs.insert(attr::OBJECT_TYPE.to_owned(), json!(object_type));
    attrs.insert(attr::OBJECT_INSTANCE.to_owned(), json!(instance));
    attrs.insert(attr::USE_COV.to_owned(), json!(false));
    attrs.insert(attr::SETTABLE.to_owned(), json!(false));
    attrs
}

#[tokio::test]
async fn restore_revives_points_and_prunes_junk() {
    let device = ScriptedDevice::new(9);
    device.add_analog_input(1, "Zone Temp", 62, 21.5);

    let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());
    store
        .save(&path(&["hvac", "Zone Temp"]), &stored_point("analog-input", 1))
        .expect("seed point");
    // A subfolder with its own point.
    let mut folder_attrs = AttrMap::new();
    folder_attrs.insert(attr::RESTORE_TYPE.to_owned(), json!(attr::RESTORE_FOLDER));
    store
        .save(&path(&["hvac", "floor 2"]), &folder_attrs)
        .expect("seed folder");
    store
        .save(
            &path(&["hvac", "floor 2", "Old Sensor"]),
            &stored_point("analog-input", 2),
        )
        .expect("seed nested point");
    // Junk: a node with no recognizable kind, and a point missing its
    // instance number.
    store
        .save(&path(&["hvac", "mystery"]), &AttrMap::new())
        .expect("seed junk");
    let mut broken = stored_point("analog-input", 3);
    broken.remove(attr::OBJECT_INSTANCE);
    store
        .save(&path(&["hvac", "broken"]), &broken)
        .expect("seed broken");
    // Service nodes survive untouched.
    store
        .save(&path(&["hvac", "STATUS"]), &AttrMap::new())
        .expect("seed sentinel");

    let gateway = Gateway::new(device, store.clone(), config("hvac")).expect("gateway");
    assert_eq!(gateway.restore().await.expect("restore"), 2);

    let temp = match gateway.root().child("Zone Temp").expect("restored") {
        Child::Point(point) => point,
        Child::Folder(_) => panic!("expected a point"),
    };
    assert_eq!(temp.object(), ObjectRef::new(ObjectType::AnalogInput, 1));
    assert_eq!(temp.attrs().present_value, "21.5");
    // The pre-priority node was upgraded in place.
    let upgraded = store
        .load(&path(&["hvac", "Zone Temp"]))
        .expect("load")
        .expect("present");
    assert_eq!(
        upgraded.get(attr::DEFAULT_PRIORITY).and_then(Json::as_u64),
        Some(8)
    );

    assert!(matches!(
        gateway.root().child("floor 2"),
        Some(Child::Folder(_))
    ));
    assert!(gateway.root().child("mystery").is_none());
    assert!(store.load(&path(&["hvac", "mystery"])).expect("load").is_none());
    assert!(store.load(&path(&["hvac", "broken"])).expect("load").is_none());
    // Sentinel kept in the store, never a runtime child.
    assert!(store.load(&path(&["hvac", "STATUS"])).expect("load").is_some());
    assert!(gateway.root().child("STATUS").is_none());
    gateway.shutdown();
}

#[tokio::test]
async fn restored_points_are_not_rediscovered() {
    let device = ScriptedDevice::new(9);
    device.add_analog_input(1, "Zone Temp", 62, 21.5);

    let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());
    store
        .save(&path(&["hvac", "Zone Temp"]), &stored_point("analog-input", 1))
        .expect("seed point");

    let gateway = Gateway::new(device, store, config("hvac")).expect("gateway");
    gateway.restore().await.expect("restore");
    // The restored reference is already known, so discovery is a no-op.
    assert_eq!(gateway.discover().await.expect("discover"), 0);
    gateway.shutdown();
}

#[tokio::test]
async fn duplicate_copies_state_and_fetches_fresh() {
    let device = ScriptedDevice::new(9);
    let oid = device.add_analog_input(5, "Pump Speed", 98, 40.0);

    let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());
    let gateway = Gateway::new(device, store.clone(), config("plant")).expect("gateway");
    let original = gateway
        .root()
        .add_object("Pump Speed", PointConfig::new(oid))
        .await
        .expect("add");

    let copy = gateway
        .root()
        .duplicate_child("Pump Speed", "Pump Speed (copy)")
        .await
        .expect("duplicate")
        .expect("created");
    let copy = match copy {
        Child::Point(point) => point,
        Child::Folder(_) => panic!("expected a point"),
    };

    assert_eq!(copy.object(), original.object());
    assert_eq!(copy.attrs().present_value, "40");
    assert!(
        store
            .load(&path(&["plant", "Pump Speed (copy)"]))
            .expect("load")
            .is_some()
    );
    // The original is still there.
    assert!(gateway.root().child("Pump Speed").is_some());
    gateway.shutdown();
}

#[tokio::test]
async fn rename_is_duplicate_then_remove() {
    let device = ScriptedDevice::new(9);
    let oid = device.add_analog_input(6, "Old Name", 98, 10.0);

    let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());
    let gateway = Gateway::new(device, store.clone(), config("plant")).expect("gateway");
    gateway
        .root()
        .add_object("Old Name", PointConfig::new(oid))
        .await
        .expect("add");

    gateway
        .root()
        .rename_child("Old Name", "New Name")
        .await
        .expect("rename")
        .expect("renamed");

    assert!(gateway.root().child("Old Name").is_none());
    assert!(gateway.root().child("New Name").is_some());
    assert!(store.load(&path(&["plant", "Old Name"])).expect("load").is_none());
    assert!(store.load(&path(&["plant", "New Name"])).expect("load").is_some());
    gateway.shutdown();
}

#[tokio::test]
async fn rename_no_ops_and_collisions() {
    let device = ScriptedDevice::new(9);
    let a = device.add_analog_input(1, "a", 98, 1.0);
    let b = device.add_analog_input(2, "b", 98, 2.0);

    let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());
    let gateway = Gateway::new(device, store, config("plant")).expect("gateway");
    gateway
        .root()
        .add_object("a", PointConfig::new(a))
        .await
        .expect("add a");
    gateway
        .root()
        .add_object("b", PointConfig::new(b))
        .await
        .expect("add b");

    // Empty and unchanged names are accepted no-ops.
    assert!(gateway.root().rename_child("a", "").await.expect("empty").is_none());
    assert!(gateway.root().rename_child("a", "a").await.expect("same").is_none());
    assert!(gateway.root().child("a").is_some());

    // A taken name is a rejected edit.
    let err = gateway
        .root()
        .rename_child("a", "b")
        .await
        .expect_err("collision");
    assert!(matches!(err, CoreError::ValidationFailed { .. }));
    assert!(gateway.root().child("a").is_some());
    assert!(gateway.root().child("b").is_some());
    gateway.shutdown();
}

#[tokio::test]
async fn remove_child_drops_runtime_and_store() {
    let device = ScriptedDevice::new(9);
    let oid = device.add_analog_input(3, "Doomed", 98, 3.0);

    let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());
    let gateway = Gateway::new(device, store.clone(), config("plant")).expect("gateway");
    gateway
        .root()
        .add_object("Doomed", PointConfig::new(oid))
        .await
        .expect("add");

    gateway.root().remove_child("Doomed").expect("remove");
    assert!(gateway.root().child("Doomed").is_none());
    assert!(store.load(&path(&["plant", "Doomed"])).expect("load").is_none());

    // Removing again is an error.
    assert!(gateway.root().remove_child("Doomed").is_err());
    gateway.shutdown();
}

#[tokio::test]
async fn stored_config_round_trips() {
    let device = ScriptedDevice::new(9);
    let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());
    let mut cfg = config("boiler");
    cfg.cov_lease_minutes = 20;
    let gateway = Gateway::new(device, store.clone(), cfg.clone()).expect("gateway");
    gateway.shutdown();

    let restored = Gateway::<ScriptedDevice>::stored_config(store.as_ref(), "boiler")
        .expect("read")
        .expect("present");
    assert_eq!(restored, cfg);
    assert!(
        Gateway::<ScriptedDevice>::stored_config(store.as_ref(), "unknown")
            .expect("read")
            .is_none()
    );
}
