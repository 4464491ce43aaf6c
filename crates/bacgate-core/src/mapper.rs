// ── Property mapper ──
//
// Translates one delivered (property, value) pair into attribute writes
// on a point. Pure with respect to I/O; the only shared state is the
// per-folder unnamed-device counter. Idempotent: re-applying the same
// delivery leaves the point unchanged.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use serde_json::{Value as Json, json};
use tracing::debug;

use crate::model::DataType;
use crate::tree::Point;
use bacgate_proto::{
    AmbiguousValue, DailySchedule, EngineeringUnit, ObjectRef, ObjectType, Primitive, PropertyId,
    WireValue, format_datetime,
};

/// Shared context the mapper needs beyond the point itself.
#[derive(Debug, Clone)]
pub struct MapperCtx {
    /// Identity of the mirrored device, for trend-log references that
    /// omit their device part.
    pub device: Option<ObjectRef>,
    /// Counter behind `unnamed device <n>` fallback names.
    pub unnamed: Arc<AtomicU32>,
}

impl MapperCtx {
    pub fn new(device: Option<ObjectRef>) -> Self {
        Self {
            device,
            unnamed: Arc::new(AtomicU32::new(0)),
        }
    }
}

/// Apply one property delivery to a point.
pub fn apply(point: &Point, ctx: &MapperCtx, property: PropertyId, value: &WireValue) {
    if let WireValue::Error(e) = value {
        // Binary label slots still get their numeric fallback so the
        // point renders "0"/"1" states; every other property is skipped.
        if !matches!(property, PropertyId::InactiveText | PropertyId::ActiveText) {
            debug!(object = %point.object(), %property, class = %e.class, code = %e.code,
                   "property rejected by peer, skipping");
            return;
        }
    }

    match property {
        PropertyId::ObjectName => apply_object_name(point, ctx, value),
        PropertyId::PresentValue => apply_present_value(point, value),
        PropertyId::ModelName | PropertyId::NotificationClass => {
            point.mutate(|a| a.present_value = value.to_display_string());
        }
        PropertyId::Units | PropertyId::OutputUnits => apply_units(point, value),
        PropertyId::InactiveText => apply_state_label(point, 0, value),
        PropertyId::ActiveText => apply_state_label(point, 1, value),
        PropertyId::StateText => {
            if let WireValue::StateTexts(texts) = value {
                point.mutate(|a| a.units = texts.clone());
            }
        }
        PropertyId::LogDeviceObjectProperty => apply_log_reference(point, ctx, value),
        PropertyId::RecordCount => {
            if let Some(n) = as_unsigned(value) {
                point.mutate(|a| a.record_count = Some(n));
            }
        }
        PropertyId::BufferSize => {
            if let Some(n) = as_unsigned(value) {
                point.mutate(|a| a.buffer_size = Some(n));
            }
        }
        PropertyId::StartTime => {
            if let WireValue::DateTime(dt) = value {
                point.mutate(|a| a.start_time = Some(format_datetime(*dt)));
            }
        }
        PropertyId::StopTime => {
            if let WireValue::DateTime(dt) = value {
                point.mutate(|a| a.stop_time = Some(format_datetime(*dt)));
            }
        }
        PropertyId::LogBuffer => {
            point.mutate(|a| a.log_buffer = Some(value.to_display_string()));
        }
        PropertyId::EffectivePeriod => {
            if let WireValue::DateRange(_) = value {
                point.mutate(|a| a.effective_period = Some(value.to_display_string()));
            }
        }
        PropertyId::WeeklySchedule => apply_weekly_schedule(point, value),
        PropertyId::ExceptionSchedule => {
            if let WireValue::SpecialEvents(events) = value {
                let arr: Vec<Json> = events.iter().map(|e| e.to_json()).collect();
                point.mutate(|a| a.exception_schedule = Some(Json::Array(arr)));
            }
        }
        PropertyId::Priority => {
            if let WireValue::UnsignedList(list) = value {
                point.mutate(|a| a.priority_array = Some(list.clone()));
            }
        }
        PropertyId::AckRequired => {
            if let WireValue::Bits(bits) = value {
                let flag = |i: usize| bits.get(i).copied().unwrap_or(false);
                point.mutate(|a| a.ack_required = Some([flag(1), flag(2), flag(3)]));
            }
        }
        PropertyId::RecipientList => {
            if let WireValue::Destinations(dests) = value {
                let arr: Vec<Json> = dests.iter().map(|d| d.to_json()).collect();
                point.mutate(|a| a.recipient_list = Some(Json::Array(arr)));
            }
        }
        PropertyId::DateList => {
            if let WireValue::CalendarEntries(entries) = value {
                let arr: Vec<Json> = entries.iter().map(|e| e.to_json()).collect();
                point.mutate(|a| a.date_list = Some(Json::Array(arr)));
            }
        }
        PropertyId::ObjectList => {
            debug!(object = %point.object(), "object-list delivered to mapper, ignoring");
        }
    }
}

// ── Name ────────────────────────────────────────────────────────────

fn apply_object_name(point: &Point, ctx: &MapperCtx, value: &WireValue) {
    let name = value.to_display_string();
    if name.is_empty() {
        // Only assign a counter slot the first time the empty name is
        // observed; repeat deliveries keep the assigned name stable.
        if point.attrs().display_name.is_empty() {
            let n = ctx.unnamed.fetch_add(1, Ordering::Relaxed);
            point.mutate(|a| a.display_name = format!("unnamed device {n}"));
        }
        return;
    }
    point.mutate(|a| a.display_name = name);
}

// ── Present value ───────────────────────────────────────────────────

fn apply_present_value(point: &Point, value: &WireValue) {
    if point.object().object_type == ObjectType::Schedule {
        if let WireValue::Ambiguous(av) = value {
            apply_ambiguous(point, av);
            return;
        }
    }
    point.mutate(|a| a.present_value = value.to_display_string());
}

/// Resolve a schedule's ambiguous present value: on success classify
/// the point's value type from the observed primitive, on failure
/// surface the conversion error as the present value itself.
fn apply_ambiguous(point: &Point, av: &AmbiguousValue) {
    match av.resolve() {
        Ok(prim) => {
            let data_type = classify(&prim);
            point.mutate(|a| {
                a.present_value = prim.to_display_string();
                if let Some(dt) = data_type {
                    a.data_type = dt;
                }
            });
        }
        Err(e) => {
            debug!(object = %point.object(), tag = av.tag, "ambiguous value did not resolve");
            point.mutate(|a| a.present_value = e.to_string());
        }
    }
}

fn classify(prim: &Primitive) -> Option<DataType> {
    match prim {
        Primitive::Boolean(_) => Some(DataType::Binary),
        Primitive::Signed(_) | Primitive::Real(_) | Primitive::Double(_) => Some(DataType::Numeric),
        Primitive::OctetString(_) | Primitive::CharacterString(_) => Some(DataType::Alphanumeric),
        Primitive::Enumerated(_) | Primitive::Unsigned(_) => Some(DataType::Multistate),
        _ => None,
    }
}

// ── Units and state labels ──────────────────────────────────────────

fn apply_units(point: &Point, value: &WireValue) {
    let Some(code) = as_unsigned(value).and_then(|n| u32::try_from(n).ok()) else {
        return;
    };
    let label = EngineeringUnit::label_for(code);
    point.mutate(|a| {
        a.engineering_units = Some(format!("engUnit.abbr.{code}"));
        a.units = vec![label];
    });
}

/// Write a binary state label into its slot, defaulting empty or
/// rejected labels to the slot's numeric form.
fn apply_state_label(point: &Point, slot: usize, value: &WireValue) {
    let text = match value {
        WireValue::Error(_) => String::new(),
        other => other.to_display_string(),
    };
    let text = if text.is_empty() {
        slot.to_string()
    } else {
        text
    };
    point.mutate(|a| {
        if a.units.len() <= slot {
            a.units.resize(slot + 1, String::new());
        }
        a.units[slot] = text;
    });
}

// ── Trend-log reference ─────────────────────────────────────────────

fn apply_log_reference(point: &Point, ctx: &MapperCtx, value: &WireValue) {
    let WireValue::PropertyRef(pr) = value else {
        return;
    };
    let device = pr.device.or(ctx.device);
    let data_type = pr.object.map(|o| crate::model::data_type_for(o.object_type));
    point.mutate(|a| {
        a.reference_device = device.map(|d| d.to_string());
        a.reference_object = pr.object.map(|o| o.to_string());
        a.reference_property = pr.property.map(|p| p.to_string());
        if let Some(dt) = data_type {
            a.data_type = dt;
        }
    });
}

// ── Weekly schedule ─────────────────────────────────────────────────

fn apply_weekly_schedule(point: &Point, value: &WireValue) {
    let WireValue::WeeklySchedule(days) = value else {
        return;
    };
    let tag = last_value_tag(days);
    let arr: Vec<Json> = days
        .iter()
        .map(|day| {
            json!(
                day.entries
                    .iter()
                    .map(|tv| tv.to_json())
                    .collect::<Vec<_>>()
            )
        })
        .collect();
    point.mutate(|a| {
        a.weekly_schedule = Some(Json::Array(arr));
        if tag.is_some() {
            a.schedule_value_tag = tag;
        }
    });
}

fn last_value_tag(days: &[DailySchedule]) -> Option<u8> {
    days.iter()
        .flat_map(|day| day.entries.iter())
        .filter(|tv| !matches!(tv.value, Primitive::Null))
        .map(|tv| tv.value.tag())
        .next_back()
}

fn as_unsigned(value: &WireValue) -> Option<u64> {
    match value {
        WireValue::Primitive(Primitive::Unsigned(n)) => Some(*n),
        WireValue::Primitive(Primitive::Enumerated(n)) => Some(u64::from(*n)),
        _ => None,
    }
}
