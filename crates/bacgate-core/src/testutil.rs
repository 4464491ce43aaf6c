// ── Test doubles ──

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, mpsc};

use bacgate_proto::{
    CovNotification, CovRequest, LinkError, ObjectListDelta, ObjectRef, ObjectReport, ObjectType,
    PropertyId, PropertyReport, RemoteLink, WireValue,
};

/// Scripted in-memory link.
pub struct MockLink {
    device: Option<ObjectRef>,
    objects: Mutex<Vec<ObjectRef>>,
    properties: Mutex<HashMap<(ObjectRef, PropertyId), WireValue>>,
    requests: Mutex<Vec<CovRequest>>,
    fail_reads: AtomicBool,
    cov_tx: broadcast::Sender<Arc<CovNotification>>,
}

impl MockLink {
    pub fn new() -> Self {
        Self {
            device: Some(ObjectRef::new(ObjectType::Device, 9)),
            objects: Mutex::new(Vec::new()),
            properties: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            fail_reads: AtomicBool::new(false),
            cov_tx: broadcast::channel(16).0,
        }
    }

    /// A link whose peer device has not been resolved.
    pub fn unresolved() -> Self {
        Self {
            device: None,
            ..Self::new()
        }
    }

    pub fn script_objects(&self, refs: Vec<ObjectRef>) {
        *self.objects.lock().expect("objects lock") = refs;
    }

    pub fn script_property(&self, object: ObjectRef, property: PropertyId, value: WireValue) {
        self.properties
            .lock()
            .expect("properties lock")
            .insert((object, property), value);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Every subscription request the engine sent, in order.
    pub fn subscription_requests(&self) -> Vec<CovRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    /// Inject a change notification as if the peer sent one.
    pub fn push_cov(&self, notification: CovNotification) {
        // No receivers is fine; delivery is best effort.
        let _ = self.cov_tx.send(Arc::new(notification));
    }
}

impl RemoteLink for MockLink {
    fn device_ref(&self) -> Option<ObjectRef> {
        self.device
    }

    async fn list_objects(&self) -> Result<mpsc::Receiver<ObjectReport>, LinkError> {
        let refs = self.objects.lock().expect("objects lock").clone();
        let (tx, rx) = mpsc::channel(refs.len().max(1));
        tx.send(ObjectReport {
            delta: ObjectListDelta::Full(refs),
            progress: 1.0,
        })
        .await
        .map_err(|_| LinkError::Closed)?;
        Ok(rx)
    }

    async fn read_batch(
        &self,
        batch: Vec<(ObjectRef, Vec<PropertyId>)>,
    ) -> Result<mpsc::Receiver<PropertyReport>, LinkError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(LinkError::transport("injected read failure"));
        }
        let properties = self.properties.lock().expect("properties lock").clone();
        let mut reports = Vec::new();
        for (object, props) in &batch {
            for property in props {
                if let Some(value) = properties.get(&(*object, *property)) {
                    reports.push(PropertyReport {
                        object: *object,
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
        self.requests.lock().expect("requests lock").push(request);
        Ok(())
    }

    fn cov_notifications(&self) -> broadcast::Receiver<Arc<CovNotification>> {
        self.cov_tx.subscribe()
    }
}
