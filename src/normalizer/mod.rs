//! Metric normalization module
//!
//! Turns the raw per-endpoint JSON bodies of one refresh cycle into a flat
//! metric snapshot, driven by a declarative field-mapping table.

pub mod engine;
pub mod mapping;
pub mod snapshot;

pub use engine::Normalizer;
pub use mapping::{
    at, metric_keys, FieldSpec, PercentConventions, PercentScale, Rule, Source, FIELD_TABLE,
};
pub use snapshot::{MetricSnapshot, MetricValue};
