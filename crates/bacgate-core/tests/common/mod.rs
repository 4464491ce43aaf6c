// ── Scripted device harness ──

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, mpsc};

use bacgate_proto::{
    CovNotification, CovRequest, LinkError, ObjectListDelta, ObjectRef, ObjectReport, ObjectType,
    Primitive, PropertyId, PropertyReport, RemoteLink, WireValue,
};

/// An in-memory remote device with a scripted object table. Object
/// lists are delivered element by element, the way a partial-array
/// reader would produce them.
pub struct ScriptedDevice {
    device: ObjectRef,
    table: Mutex<BTreeMap<ObjectRef, Vec<(PropertyId, WireValue)>>>,
    cov_requests: Mutex<Vec<CovRequest>>,
    cov_tx: broadcast::Sender<Arc<CovNotification>>,
}

impl ScriptedDevice {
    pub fn new(instance: u32) -> Arc<Self> {
        Arc::new(Self {
            device: ObjectRef::new(ObjectType::Device, instance),
            table: Mutex::new(BTreeMap::new()),
            cov_requests: Mutex::new(Vec::new()),
            cov_tx: broadcast::channel(32).0,
        })
    }

    pub fn device(&self) -> ObjectRef {
        self.device
    }

    /// Add one object with its readable properties.
    pub fn add_object(&self, oid: ObjectRef, properties: Vec<(PropertyId, WireValue)>) {
        self.table.lock().expect("table lock").insert(oid, properties);
    }

    /// Convenience: a named analog input with units and a value.
    pub fn add_analog_input(&self, instance: u32, name: &str, units_code: u32, value: f32) -> ObjectRef {
        let oid = ObjectRef::new(ObjectType::AnalogInput, instance);
        self.add_object(
            oid,
            vec![
                (
                    PropertyId::ObjectName,
                    Primitive::CharacterString(name.to_owned()).into(),
                ),
                (PropertyId::Units, Primitive::Enumerated(units_code).into()),
                (PropertyId::PresentValue, Primitive::Real(value).into()),
            ],
        );
        oid
    }

    pub fn set_property(&self, oid: ObjectRef, property: PropertyId, value: WireValue) {
        let mut table = self.table.lock().expect("table lock");
        let props = table.entry(oid).or_default();
        if let Some(slot) = props.iter_mut().find(|(p, _)| *p == property) {
            slot.1 = value;
        } else {
            props.push((property, value));
        }
    }

    pub fn cov_requests(&self) -> Vec<CovRequest> {
        self.cov_requests.lock().expect("requests lock").clone()
    }

    /// Push a present-value change notification for one object.
    pub fn notify(&self, oid: ObjectRef, value: WireValue) {
        let _ = self.cov_tx.send(Arc::new(CovNotification {
            process_id: 1,
            initiating_device: self.device,
            monitored_object: oid,
            time_remaining_secs: 60,
            values: vec![(PropertyId::PresentValue, value)],
        }));
    }
}

impl RemoteLink for ScriptedDevice {
    fn device_ref(&self) -> Option<ObjectRef> {
        Some(self.device)
    }

    async fn list_objects(&self) -> Result<mpsc::Receiver<ObjectReport>, LinkError> {
        let refs: Vec<ObjectRef> = self.table.lock().expect("table lock").keys().copied().collect();
        let total = refs.len().max(1);
        let (tx, rx) = mpsc::channel(total);
        for (i, oid) in refs.into_iter().enumerate() {
            tx.send(ObjectReport {
                delta: ObjectListDelta::Item(oid),
                progress: (i + 1) as f64 / total as f64,
            })
            .await
            .map_err(|_| LinkError::Closed)?;
        }
        Ok(rx)
    }

    async fn read_batch(
        &self,
        batch: Vec<(ObjectRef, Vec<PropertyId>)>,
    ) -> Result<mpsc::Receiver<PropertyReport>, LinkError> {
        let table = self.table.lock().expect("table lock").clone();
        let mut reports = Vec::new();
        for (oid, wanted) in &batch {
            let Some(props) = table.get(oid) else { continue };
            for (property, value) in props {
                if wanted.contains(property) {
                    reports.push(PropertyReport {
                        object: *oid,
                        property: *property,
                        value: value.clone(),
                        progress: 0.0,
                    });
                }
            }
        }
        let total = reports.len().max(1);
        let (tx, rx) = mpsc::channel(total);
        for (i, mut report) in reports.into_iter().enumerate() {
            report.progress = (i + 1) as f64 / total as f64;
            tx.send(report).await.map_err(|_| LinkError::Closed)?;
        }
        Ok(rx)
    }

    async fn send_subscription(&self, request: CovRequest) -> Result<(), LinkError> {
        self.cov_requests.lock().expect("requests lock").push(request);
        Ok(())
    }

    fn cov_notifications(&self) -> broadcast::Receiver<Arc<CovNotification>> {
        self.cov_tx.subscribe()
    }
}
