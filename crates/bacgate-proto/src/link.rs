// ── RemoteLink boundary ──
//
// The transport seam between the mirror engine and one remote device.
// Implementations own the socket and the frame codec; the engine sees
// decoded reports arriving on channels. Batch reads deliver results out
// of order across objects, but the progress fraction is monotonically
// non-decreasing and reaches 1.0 on the final report.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use crate::error::LinkError;
use crate::object::{ObjectRef, PropertyId};
use crate::value::WireValue;

// ── Progress reports ────────────────────────────────────────────────

/// One delivery from an object-list read.
///
/// The peer may answer with the whole list at once or element by
/// element; both shapes flow through the same channel.
#[derive(Debug, Clone)]
pub struct ObjectReport {
    pub delta: ObjectListDelta,
    pub progress: f64,
}

/// Payload of an [`ObjectReport`].
#[derive(Debug, Clone)]
pub enum ObjectListDelta {
    /// The full object list arrived as one batch.
    Full(Vec<ObjectRef>),
    /// One element of a partial-array delivery.
    Item(ObjectRef),
}

/// One property result from a batched read.
#[derive(Debug, Clone)]
pub struct PropertyReport {
    pub object: ObjectRef,
    pub property: PropertyId,
    pub value: WireValue,
    pub progress: f64,
}

// ── COV types ───────────────────────────────────────────────────────

/// A change-of-value subscription request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CovRequest {
    /// Subscriber process id, echoed back in notifications.
    pub process_id: u32,
    pub object: ObjectRef,
    pub confirmed: bool,
    pub lifetime_secs: u32,
}

/// A change-of-value notification pushed by the remote device.
#[derive(Debug, Clone)]
pub struct CovNotification {
    pub process_id: u32,
    /// Device object identifier of the initiating device.
    pub initiating_device: ObjectRef,
    pub monitored_object: ObjectRef,
    pub time_remaining_secs: u32,
    pub values: Vec<(PropertyId, WireValue)>,
}

// ── RemoteLink ──────────────────────────────────────────────────────

/// Connection to one remote device.
///
/// All methods returning futures are `Send` so engine tasks can be
/// spawned onto the runtime. Channel-based delivery keeps the engine
/// from holding any lock while a batch is in flight.
pub trait RemoteLink: Send + Sync + 'static {
    /// Object identifier of the remote device, once resolved.
    ///
    /// `None` while the device has not answered identification yet;
    /// discovery silently stops in that state.
    fn device_ref(&self) -> Option<ObjectRef>;

    /// Read the device's object list.
    ///
    /// Reports arrive on the returned channel; see [`ObjectListDelta`]
    /// for the two delivery shapes.
    fn list_objects(
        &self,
    ) -> impl Future<Output = Result<mpsc::Receiver<ObjectReport>, LinkError>> + Send;

    /// Issue one batched property read for many objects.
    ///
    /// One network round-trip batch per call; per-property results
    /// stream back out of order across objects.
    fn read_batch(
        &self,
        refs: Vec<(ObjectRef, Vec<PropertyId>)>,
    ) -> impl Future<Output = Result<mpsc::Receiver<PropertyReport>, LinkError>> + Send;

    /// Send (or re-send) a COV subscription for one object.
    fn send_subscription(
        &self,
        request: CovRequest,
    ) -> impl Future<Output = Result<(), LinkError>> + Send;

    /// Subscribe to the link's COV notification fan-out.
    fn cov_notifications(&self) -> broadcast::Receiver<Arc<CovNotification>>;
}
