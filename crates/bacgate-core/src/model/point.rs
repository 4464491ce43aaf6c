// ── Point data model ──
//
// The attribute set mirrored for one remote object. `PointConfig` is the
// identity-and-behavior half fixed at creation; `PointAttrs` is the
// half the property mapper rewrites on every fetch or COV delivery.

use serde_json::Value as Json;

use bacgate_proto::{ObjectRef, ObjectType};

// ── DataType ────────────────────────────────────────────────────────

/// Generic value type of a mirrored point.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum DataType {
    Binary,
    Numeric,
    Alphanumeric,
    Multistate,
    #[default]
    Unknown,
}

/// Infer the value type implied by an object's type alone.
///
/// Schedule present values stay `Unknown` until ambiguous-value
/// resolution observes an actual primitive.
pub fn data_type_for(object_type: ObjectType) -> DataType {
    match object_type {
        ObjectType::AnalogInput
        | ObjectType::AnalogOutput
        | ObjectType::AnalogValue
        | ObjectType::Accumulator
        | ObjectType::PulseConverter
        | ObjectType::LifeSafetyPoint
        | ObjectType::Loop => DataType::Numeric,
        ObjectType::BinaryInput | ObjectType::BinaryOutput | ObjectType::BinaryValue => {
            DataType::Binary
        }
        ObjectType::MultiStateInput
        | ObjectType::MultiStateOutput
        | ObjectType::MultiStateValue => DataType::Multistate,
        ObjectType::Device | ObjectType::TrendLog => DataType::Alphanumeric,
        _ => DataType::Unknown,
    }
}

// ── PointConfig ─────────────────────────────────────────────────────

/// Identity and behavior flags of a point, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointConfig {
    pub object: ObjectRef,
    pub use_cov: bool,
    pub settable: bool,
    /// Write priority used for settable points (1 = highest, 16 = lowest).
    pub default_priority: u8,
}

impl PointConfig {
    pub fn new(object: ObjectRef) -> Self {
        Self {
            object,
            use_cov: false,
            settable: false,
            default_priority: 8,
        }
    }
}

// ── PointAttrs ──────────────────────────────────────────────────────

/// Mapped attributes of a point.
///
/// Writes are last-writer-wins per field, matching the update
/// granularity of the wire protocol: two unrelated property deliveries
/// may be observed as a partially-updated point in between.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PointAttrs {
    pub display_name: String,
    pub data_type: DataType,
    /// Normalized textual form of the present value.
    pub present_value: String,
    /// Unit / state labels: index 0/1 carry binary inactive/active text,
    /// the full list carries multi-state labels or the unit symbol.
    pub units: Vec<String>,
    /// Resolved abbreviation key, `"engUnit.abbr.<enum-int>"`.
    pub engineering_units: Option<String>,

    // Log / trend reference fields.
    pub reference_device: Option<String>,
    pub reference_object: Option<String>,
    pub reference_property: Option<String>,
    pub record_count: Option<u64>,
    pub buffer_size: Option<u64>,
    pub start_time: Option<String>,
    pub stop_time: Option<String>,
    pub log_buffer: Option<String>,

    // Schedule fields.
    pub effective_period: Option<String>,
    pub weekly_schedule: Option<Json>,
    pub exception_schedule: Option<Json>,
    /// Application tag of the last non-null primitive observed while
    /// scanning a weekly schedule.
    pub schedule_value_tag: Option<u8>,

    // Notification-class fields.
    pub priority_array: Option<Vec<u32>>,
    pub ack_required: Option<[bool; 3]>,
    pub recipient_list: Option<Json>,

    // Calendar fields.
    pub date_list: Option<Json>,
}

impl PointAttrs {
    /// Initial attributes for a freshly created point.
    pub fn initial(object_type: ObjectType) -> Self {
        Self {
            data_type: data_type_for(object_type),
            ..Self::default()
        }
    }
}
