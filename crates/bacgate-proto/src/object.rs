// ── Object and property identifiers ──
//
// ObjectRef is the identity of every mirrored entity: a (type, instance)
// pair with structural equality, usable as a map key. Type and property
// identifiers round-trip through the persisted attribute strings, so
// Display/FromStr must stay stable.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ── ObjectType ──────────────────────────────────────────────────────

/// Object type of a remote entity.
///
/// Covers the standard types the property plan knows how to enrich;
/// everything else is carried as `Proprietary(code)` so an unplanned
/// object still mirrors its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectType {
    AnalogInput,
    AnalogOutput,
    AnalogValue,
    BinaryInput,
    BinaryOutput,
    BinaryValue,
    Calendar,
    Device,
    Loop,
    MultiStateInput,
    MultiStateOutput,
    MultiStateValue,
    NotificationClass,
    Schedule,
    TrendLog,
    LifeSafetyPoint,
    Accumulator,
    PulseConverter,
    /// A standard type the plan has no property set for, or a vendor type.
    Proprietary(u16),
}

impl ObjectType {
    /// Standard wire code for this type.
    pub fn code(self) -> u16 {
        match self {
            Self::AnalogInput => 0,
            Self::AnalogOutput => 1,
            Self::AnalogValue => 2,
            Self::BinaryInput => 3,
            Self::BinaryOutput => 4,
            Self::BinaryValue => 5,
            Self::Calendar => 6,
            Self::Device => 8,
            Self::Loop => 12,
            Self::MultiStateInput => 13,
            Self::MultiStateOutput => 14,
            Self::NotificationClass => 15,
            Self::Schedule => 17,
            Self::MultiStateValue => 19,
            Self::TrendLog => 20,
            Self::LifeSafetyPoint => 21,
            Self::Accumulator => 23,
            Self::PulseConverter => 24,
            Self::Proprietary(code) => code,
        }
    }

    /// Map a wire code back to a type. Unrecognized codes become
    /// `Proprietary` rather than failing — the mirror still tracks them.
    pub fn from_code(code: u16) -> Self {
        match code {
            0 => Self::AnalogInput,
            1 => Self::AnalogOutput,
            2 => Self::AnalogValue,
            3 => Self::BinaryInput,
            4 => Self::BinaryOutput,
            5 => Self::BinaryValue,
            6 => Self::Calendar,
            8 => Self::Device,
            12 => Self::Loop,
            13 => Self::MultiStateInput,
            14 => Self::MultiStateOutput,
            15 => Self::NotificationClass,
            17 => Self::Schedule,
            19 => Self::MultiStateValue,
            20 => Self::TrendLog,
            21 => Self::LifeSafetyPoint,
            23 => Self::Accumulator,
            24 => Self::PulseConverter,
            other => Self::Proprietary(other),
        }
    }

    /// Stable lowercase-hyphenated name, matching the persisted form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AnalogInput => "analog-input",
            Self::AnalogOutput => "analog-output",
            Self::AnalogValue => "analog-value",
            Self::BinaryInput => "binary-input",
            Self::BinaryOutput => "binary-output",
            Self::BinaryValue => "binary-value",
            Self::Calendar => "calendar",
            Self::Device => "device",
            Self::Loop => "loop",
            Self::MultiStateInput => "multi-state-input",
            Self::MultiStateOutput => "multi-state-output",
            Self::MultiStateValue => "multi-state-value",
            Self::NotificationClass => "notification-class",
            Self::Schedule => "schedule",
            Self::TrendLog => "trend-log",
            Self::LifeSafetyPoint => "life-safety-point",
            Self::Accumulator => "accumulator",
            Self::PulseConverter => "pulse-converter",
            Self::Proprietary(_) => "proprietary",
        }
    }

    /// All types the property plan has a dedicated property set for.
    pub fn planned() -> &'static [ObjectType] {
        &[
            Self::AnalogInput,
            Self::AnalogOutput,
            Self::AnalogValue,
            Self::BinaryInput,
            Self::BinaryOutput,
            Self::BinaryValue,
            Self::Calendar,
            Self::Device,
            Self::Loop,
            Self::MultiStateInput,
            Self::MultiStateOutput,
            Self::MultiStateValue,
            Self::NotificationClass,
            Self::Schedule,
            Self::TrendLog,
            Self::LifeSafetyPoint,
            Self::Accumulator,
            Self::PulseConverter,
        ]
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Proprietary(code) => write!(f, "proprietary-{code}"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Error parsing an object type or reference from its persisted string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized object identifier: {0}")]
pub struct ParseObjectError(pub String);

impl FromStr for ObjectType {
    type Err = ParseObjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(code) = s.strip_prefix("proprietary-") {
            let code = code
                .parse::<u16>()
                .map_err(|_| ParseObjectError(s.to_owned()))?;
            return Ok(Self::Proprietary(code));
        }
        Self::planned()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ParseObjectError(s.to_owned()))
    }
}

impl Serialize for ObjectType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ObjectType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ── PropertyId ──────────────────────────────────────────────────────

/// Enumerated tag naming one readable field of an object.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum PropertyId {
    ObjectName,
    ObjectList,
    PresentValue,
    ModelName,
    Units,
    OutputUnits,
    InactiveText,
    ActiveText,
    StateText,
    LogDeviceObjectProperty,
    RecordCount,
    BufferSize,
    StartTime,
    StopTime,
    LogBuffer,
    EffectivePeriod,
    WeeklySchedule,
    ExceptionSchedule,
    NotificationClass,
    Priority,
    AckRequired,
    RecipientList,
    DateList,
}

// ── ObjectRef ───────────────────────────────────────────────────────

/// Identifier of one remote object: object type plus instance number.
///
/// Immutable, structurally comparable, and cheap to copy — used as the
/// key of every per-device registry (known set, subscription map, poll
/// map).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectRef {
    #[serde(rename = "type")]
    pub object_type: ObjectType,
    pub instance: u32,
}

impl ObjectRef {
    pub fn new(object_type: ObjectType, instance: u32) -> Self {
        Self {
            object_type,
            instance,
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.object_type, self.instance)
    }
}

impl FromStr for ObjectRef {
    type Err = ParseObjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ty, inst) = s
            .rsplit_once(' ')
            .ok_or_else(|| ParseObjectError(s.to_owned()))?;
        Ok(Self {
            object_type: ty.parse()?,
            instance: inst
                .parse::<u32>()
                .map_err(|_| ParseObjectError(s.to_owned()))?,
        })
    }
}
