// ── Decoded wire values ──
//
// Every value shape the engine consumes, as one tagged union. The frame
// codec (out of scope) produces these; the property mapper classifies
// them with plain matches instead of run-time type inspection.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{Value as Json, json};

use crate::object::{ObjectRef, PropertyId};

// ── Primitive ───────────────────────────────────────────────────────

/// A primitive application-tagged value.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Null,
    Boolean(bool),
    Unsigned(u64),
    Signed(i64),
    Real(f32),
    Double(f64),
    OctetString(Vec<u8>),
    CharacterString(String),
    Enumerated(u32),
    Date(NaiveDate),
    Time(NaiveTime),
    ObjectId(ObjectRef),
}

impl Primitive {
    /// Standard application tag code for this primitive.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Boolean(_) => 1,
            Self::Unsigned(_) => 2,
            Self::Signed(_) => 3,
            Self::Real(_) => 4,
            Self::Double(_) => 5,
            Self::OctetString(_) => 6,
            Self::CharacterString(_) => 7,
            Self::Enumerated(_) => 9,
            Self::Date(_) => 10,
            Self::Time(_) => 11,
            Self::ObjectId(_) => 12,
        }
    }

    /// Normalized display form used for `present value` style attributes.
    pub fn to_display_string(&self) -> String {
        match self {
            Self::Null => "null".to_owned(),
            Self::Boolean(b) => b.to_string(),
            Self::Unsigned(n) => n.to_string(),
            Self::Signed(n) => n.to_string(),
            Self::Real(v) => v.to_string(),
            Self::Double(v) => v.to_string(),
            Self::OctetString(bytes) => bytes.iter().map(|b| format!("{b:02x}")).collect(),
            Self::CharacterString(s) => s.clone(),
            Self::Enumerated(n) => n.to_string(),
            Self::Date(d) => format_date(*d),
            Self::Time(t) => t.format("%H:%M:%S").to_string(),
            Self::ObjectId(oid) => oid.to_string(),
        }
    }

    /// JSON form used inside transcoded schedule payloads.
    pub fn to_json(&self) -> Json {
        match self {
            Self::Null => Json::Null,
            Self::Boolean(b) => json!(b),
            Self::Unsigned(n) => json!(n),
            Self::Signed(n) => json!(n),
            Self::Real(v) => json!(v),
            Self::Double(v) => json!(v),
            Self::Enumerated(n) => json!(n),
            other => json!(other.to_display_string()),
        }
    }
}

// ── Ambiguous values ────────────────────────────────────────────────

/// Conversion failure for an [`AmbiguousValue`].
///
/// The message text ends up verbatim in the point's present value, so it
/// must stand alone as a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot convert ambiguous value (tag {tag}): {reason}")]
pub struct AmbiguousError {
    pub tag: u8,
    pub reason: String,
}

/// A wire value whose primitive type was not fixed by its property.
///
/// The codec leaves the application tag and raw contents in place;
/// [`resolve`](Self::resolve) performs the explicit conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguousValue {
    pub tag: u8,
    pub data: Vec<u8>,
}

impl AmbiguousValue {
    pub fn new(tag: u8, data: impl Into<Vec<u8>>) -> Self {
        Self {
            tag,
            data: data.into(),
        }
    }

    /// Convert to a primitive according to the application tag.
    pub fn resolve(&self) -> Result<Primitive, AmbiguousError> {
        let err = |reason: &str| AmbiguousError {
            tag: self.tag,
            reason: reason.to_owned(),
        };
        match self.tag {
            0 => Ok(Primitive::Null),
            1 => match self.data.first() {
                Some(b) => Ok(Primitive::Boolean(*b != 0)),
                None => Err(err("empty boolean contents")),
            },
            2 => Ok(Primitive::Unsigned(be_uint(&self.data).ok_or_else(
                || err("unsigned contents longer than 8 octets"),
            )?)),
            3 => Ok(Primitive::Signed(
                be_int(&self.data).ok_or_else(|| err("signed contents longer than 8 octets"))?,
            )),
            4 => {
                let bytes: [u8; 4] = self.data[..]
                    .try_into()
                    .map_err(|_| err("real contents must be 4 octets"))?;
                Ok(Primitive::Real(f32::from_be_bytes(bytes)))
            }
            5 => {
                let bytes: [u8; 8] = self.data[..]
                    .try_into()
                    .map_err(|_| err("double contents must be 8 octets"))?;
                Ok(Primitive::Double(f64::from_be_bytes(bytes)))
            }
            6 => Ok(Primitive::OctetString(self.data.clone())),
            7 => String::from_utf8(self.data.clone())
                .map(Primitive::CharacterString)
                .map_err(|_| err("character string is not valid UTF-8")),
            9 => {
                let wide =
                    be_uint(&self.data).ok_or_else(|| err("enumerated contents too long"))?;
                u32::try_from(wide)
                    .map(Primitive::Enumerated)
                    .map_err(|_| err("enumerated value exceeds 32 bits"))
            }
            other => Err(AmbiguousError {
                tag: other,
                reason: "no primitive interpretation for this tag".to_owned(),
            }),
        }
    }
}

fn be_uint(data: &[u8]) -> Option<u64> {
    if data.len() > 8 {
        return None;
    }
    Some(data.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
}

fn be_int(data: &[u8]) -> Option<i64> {
    if data.is_empty() || data.len() > 8 {
        return None;
    }
    let negative = data[0] & 0x80 != 0;
    let mut acc: i64 = if negative { -1 } else { 0 };
    for b in data {
        acc = (acc << 8) | i64::from(*b);
    }
    Some(acc)
}

// ── Constructed values ──────────────────────────────────────────────

/// One (time, value) pair inside a daily schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeValue {
    pub time: NaiveTime,
    pub value: Primitive,
}

impl TimeValue {
    pub fn to_json(&self) -> Json {
        json!({
            "time": self.time.format("%H:%M:%S").to_string(),
            "value": self.value.to_json(),
        })
    }
}

/// Schedule entries for one day of the week.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DailySchedule {
    pub entries: Vec<TimeValue>,
}

/// Inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// One entry of a calendar's date list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarEntry {
    Date(NaiveDate),
    Range(DateRange),
    /// (month, week-of-month, weekday), each 0 meaning "any".
    WeekAndDay { month: u8, week: u8, weekday: u8 },
}

impl CalendarEntry {
    pub fn to_json(&self) -> Json {
        match self {
            Self::Date(d) => json!({ "date": format_date(*d) }),
            Self::Range(r) => json!({
                "start": format_date(r.start),
                "end": format_date(r.end),
            }),
            Self::WeekAndDay {
                month,
                week,
                weekday,
            } => json!({ "month": month, "week": week, "weekday": weekday }),
        }
    }
}

/// One exception-schedule entry: a period with its own timetable.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecialEvent {
    pub period: CalendarEntry,
    pub schedule: Vec<TimeValue>,
    pub priority: u8,
}

impl SpecialEvent {
    pub fn to_json(&self) -> Json {
        json!({
            "period": self.period.to_json(),
            "schedule": self.schedule.iter().map(TimeValue::to_json).collect::<Vec<_>>(),
            "priority": self.priority,
        })
    }
}

/// One recipient of a notification class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// Monday-first validity flags.
    pub valid_days: [bool; 7],
    pub from_time: NaiveTime,
    pub to_time: NaiveTime,
    pub recipient: String,
    pub process_id: u32,
    pub issue_confirmed: bool,
    /// (to-offnormal, to-fault, to-normal).
    pub transitions: [bool; 3],
}

impl Destination {
    pub fn to_json(&self) -> Json {
        json!({
            "validDays": self.valid_days,
            "fromTime": self.from_time.format("%H:%M:%S").to_string(),
            "toTime": self.to_time.format("%H:%M:%S").to_string(),
            "recipient": self.recipient,
            "processId": self.process_id,
            "issueConfirmed": self.issue_confirmed,
            "transitions": self.transitions,
        })
    }
}

/// Reference to a property of an object, optionally on another device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PropertyRef {
    pub device: Option<ObjectRef>,
    pub object: Option<ObjectRef>,
    pub property: Option<PropertyId>,
}

/// Protocol-level error indicator returned in place of a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyAccessError {
    pub class: String,
    pub code: String,
}

// ── WireValue ───────────────────────────────────────────────────────

/// Tagged union over every decoded value shape the engine consumes.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Primitive(Primitive),
    Ambiguous(AmbiguousValue),
    /// Sequence of state labels (multi-state `state-text`).
    StateTexts(Vec<String>),
    DateTime(NaiveDateTime),
    DateRange(DateRange),
    WeeklySchedule(Vec<DailySchedule>),
    SpecialEvents(Vec<SpecialEvent>),
    PropertyRef(PropertyRef),
    /// Sequence of unsigned integers (priority array).
    UnsignedList(Vec<u32>),
    /// Bit string (event-transition-bits and friends).
    Bits(Vec<bool>),
    Destinations(Vec<Destination>),
    CalendarEntries(Vec<CalendarEntry>),
    /// Whole-batch object list delivery.
    ObjectList(Vec<ObjectRef>),
    /// The peer answered with an error for this property.
    Error(PropertyAccessError),
}

impl WireValue {
    /// Shorthand for a primitive wrapped in the union.
    pub fn primitive(p: Primitive) -> Self {
        Self::Primitive(p)
    }

    /// Best-effort display coercion, used where a property is stored
    /// verbatim as text (present value, model name, log buffer).
    /// Structured shapes render as their canonical JSON so the text is
    /// stable across versions.
    pub fn to_display_string(&self) -> String {
        match self {
            Self::Primitive(p) => p.to_display_string(),
            Self::Ambiguous(av) => match av.resolve() {
                Ok(p) => p.to_display_string(),
                Err(e) => e.to_string(),
            },
            Self::DateTime(dt) => format_datetime(*dt),
            Self::DateRange(r) => format!("{} - {}", format_date(r.start), format_date(r.end)),
            Self::StateTexts(texts) => texts.join(", "),
            Self::PropertyRef(r) => [
                r.device.map(|d| d.to_string()),
                r.object.map(|o| o.to_string()),
                r.property.map(|p| p.to_string()),
            ]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" "),
            Self::UnsignedList(list) => list
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            Self::Bits(bits) => bits.iter().map(|b| if *b { '1' } else { '0' }).collect(),
            Self::ObjectList(refs) => refs
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            Self::WeeklySchedule(days) => Json::Array(
                days.iter()
                    .map(|d| {
                        Json::Array(d.entries.iter().map(TimeValue::to_json).collect())
                    })
                    .collect(),
            )
            .to_string(),
            Self::SpecialEvents(events) => {
                Json::Array(events.iter().map(SpecialEvent::to_json).collect()).to_string()
            }
            Self::Destinations(list) => {
                Json::Array(list.iter().map(Destination::to_json).collect()).to_string()
            }
            Self::CalendarEntries(entries) => {
                Json::Array(entries.iter().map(CalendarEntry::to_json).collect()).to_string()
            }
            Self::Error(e) => format!("error: {} / {}", e.class, e.code),
        }
    }
}

impl From<Primitive> for WireValue {
    fn from(p: Primitive) -> Self {
        Self::Primitive(p)
    }
}

// ── Canonical formatting ────────────────────────────────────────────

/// Canonical date form used in persisted attributes.
pub fn format_date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// Canonical date-time form used in persisted attributes.
pub fn format_datetime(dt: NaiveDateTime) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectType;
    use pretty_assertions::assert_eq;

    #[test]
    fn ambiguous_real_resolves() {
        let av = AmbiguousValue::new(4, 72.5f32.to_be_bytes());
        assert_eq!(av.resolve(), Ok(Primitive::Real(72.5)));
    }

    #[test]
    fn ambiguous_signed_sign_extends() {
        let av = AmbiguousValue::new(3, vec![0xff, 0x38]);
        assert_eq!(av.resolve(), Ok(Primitive::Signed(-200)));
    }

    #[test]
    fn ambiguous_enumerated_resolves() {
        let av = AmbiguousValue::new(9, vec![0x01]);
        assert_eq!(av.resolve(), Ok(Primitive::Enumerated(1)));
    }

    #[test]
    fn ambiguous_unknown_tag_fails_with_message() {
        let av = AmbiguousValue::new(13, vec![]);
        let err = av.resolve().expect_err("tag 13 has no primitive form");
        assert_eq!(
            err.to_string(),
            "cannot convert ambiguous value (tag 13): no primitive interpretation for this tag"
        );
    }

    #[test]
    fn ambiguous_malformed_real_fails() {
        let av = AmbiguousValue::new(4, vec![0x00, 0x01]);
        assert!(av.resolve().is_err());
    }

    #[test]
    fn real_displays_without_trailing_zeroes() {
        assert_eq!(Primitive::Real(72.5).to_display_string(), "72.5");
        assert_eq!(Primitive::Real(72.0).to_display_string(), "72");
    }

    #[test]
    fn octet_string_displays_as_hex() {
        let p = Primitive::OctetString(vec![0xde, 0xad, 0x01]);
        assert_eq!(p.to_display_string(), "dead01");
    }

    #[test]
    fn date_range_display_form() {
        let r = DateRange {
            start: NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date"),
            end: NaiveDate::from_ymd_opt(2024, 6, 30).expect("valid date"),
        };
        assert_eq!(
            WireValue::DateRange(r).to_display_string(),
            "2024-01-01 - 2024-06-30"
        );
    }

    #[test]
    fn structured_values_display_as_stable_text() {
        assert_eq!(
            WireValue::Bits(vec![true, false, true]).to_display_string(),
            "101"
        );
        assert_eq!(
            WireValue::UnsignedList(vec![3, 8, 16]).to_display_string(),
            "3, 8, 16"
        );
        assert_eq!(
            WireValue::PropertyRef(PropertyRef {
                device: Some(ObjectRef::new(ObjectType::Device, 9)),
                object: Some(ObjectRef::new(ObjectType::AnalogInput, 1)),
                property: Some(PropertyId::PresentValue),
            })
            .to_display_string(),
            "device 9 analog-input 1 present-value"
        );

        // Schedule shapes come out as their canonical JSON, never the
        // derived debug form.
        let schedule = WireValue::WeeklySchedule(vec![DailySchedule {
            entries: vec![TimeValue {
                time: NaiveTime::from_hms_opt(8, 0, 0).expect("valid time"),
                value: Primitive::Real(21.0),
            }],
        }]);
        assert_eq!(
            schedule.to_display_string(),
            r#"[[{"time":"08:00:00","value":21.0}]]"#
        );
    }
}
