//! Protocol boundary for the bacgate object mirror.
//!
//! This crate defines everything the synchronization engine needs to talk
//! about a remote device without knowing how frames reach it:
//!
//! - **[`ObjectRef`]** — `(object type, instance number)` pair uniquely
//!   naming one addressable entity on a remote device.
//! - **[`WireValue`]** — tagged union over every decoded value shape the
//!   engine consumes, including the [`AmbiguousValue`] wrapper for values
//!   whose primitive type is not fixed by their property.
//! - **[`RemoteLink`]** — the transport seam. Implementations own frame
//!   encoding and the socket; the engine only sees decoded reports
//!   arriving on channels with a monotonically increasing progress
//!   fraction.
//! - **[`EngineeringUnit`]** — the unit enumeration with display symbols.
//!
//! Opening the underlying transport and the frame codec live behind
//! `RemoteLink` implementations and are out of scope here.

pub mod error;
pub mod link;
pub mod object;
pub mod units;
pub mod value;

pub use error::LinkError;
pub use link::{
    CovNotification, CovRequest, ObjectListDelta, ObjectReport, PropertyReport, RemoteLink,
};
pub use object::{ObjectRef, ObjectType, PropertyId};
pub use units::EngineeringUnit;
pub use value::{
    AmbiguousValue, CalendarEntry, DailySchedule, DateRange, Destination, Primitive,
    PropertyAccessError, PropertyRef, SpecialEvent, TimeValue, WireValue, format_date,
    format_datetime,
};
