//! Canonical data model for mirrored points.

mod point;

pub use point::{DataType, PointAttrs, PointConfig, data_type_for};
