// ── Property plan ──
//
// Pure mapping from object type to the fixed property set fetched for
// it. Every plan starts with the object name; unplanned types get only
// that. No side effects, no failure mode.

use bacgate_proto::{ObjectRef, ObjectType, PropertyId};

/// Properties fetched for one object of the given type.
pub fn properties_for(object_type: ObjectType) -> Vec<PropertyId> {
    let mut plan = vec![PropertyId::ObjectName];
    match object_type {
        ObjectType::AnalogInput
        | ObjectType::AnalogOutput
        | ObjectType::AnalogValue
        | ObjectType::Accumulator
        | ObjectType::PulseConverter
        | ObjectType::LifeSafetyPoint => {
            plan.push(PropertyId::Units);
            plan.push(PropertyId::PresentValue);
        }
        ObjectType::Loop => {
            plan.push(PropertyId::OutputUnits);
            plan.push(PropertyId::PresentValue);
        }
        ObjectType::BinaryInput | ObjectType::BinaryOutput | ObjectType::BinaryValue => {
            plan.push(PropertyId::InactiveText);
            plan.push(PropertyId::ActiveText);
            plan.push(PropertyId::PresentValue);
        }
        ObjectType::MultiStateInput
        | ObjectType::MultiStateOutput
        | ObjectType::MultiStateValue => {
            plan.push(PropertyId::StateText);
            plan.push(PropertyId::PresentValue);
        }
        ObjectType::Device => {
            plan.push(PropertyId::ModelName);
        }
        ObjectType::Schedule => {
            plan.push(PropertyId::PresentValue);
            plan.push(PropertyId::EffectivePeriod);
            plan.push(PropertyId::WeeklySchedule);
            plan.push(PropertyId::ExceptionSchedule);
        }
        ObjectType::TrendLog => {
            plan.push(PropertyId::LogDeviceObjectProperty);
            plan.push(PropertyId::RecordCount);
            plan.push(PropertyId::StartTime);
            plan.push(PropertyId::StopTime);
            plan.push(PropertyId::BufferSize);
        }
        ObjectType::NotificationClass => {
            plan.push(PropertyId::NotificationClass);
            plan.push(PropertyId::Priority);
            plan.push(PropertyId::AckRequired);
            plan.push(PropertyId::RecipientList);
        }
        ObjectType::Calendar => {
            plan.push(PropertyId::PresentValue);
            plan.push(PropertyId::DateList);
        }
        ObjectType::Proprietary(_) => {}
    }
    plan
}

/// Whether a discovered object of this type defaults to settable.
/// Output and value objects are writable on well-behaved devices.
pub fn default_settable(object_type: ObjectType) -> bool {
    matches!(
        object_type,
        ObjectType::AnalogOutput
            | ObjectType::AnalogValue
            | ObjectType::BinaryOutput
            | ObjectType::BinaryValue
            | ObjectType::MultiStateOutput
            | ObjectType::MultiStateValue
    )
}

/// Build the batched read request for a set of objects.
pub fn build_batch(objects: impl IntoIterator<Item = ObjectRef>) -> Vec<(ObjectRef, Vec<PropertyId>)> {
    objects
        .into_iter()
        .map(|oid| (oid, properties_for(oid.object_type)))
        .collect()
}
