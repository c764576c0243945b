//! Metric normalizer
//!
//! Walks the per-endpoint JSON bodies using the field-mapping table and
//! produces a flat [`MetricSnapshot`]. A missing or renamed field never fails
//! normalization; it degrades to the field's default. Only a body that is not
//! a JSON object or array at all is rejected.

use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

use super::mapping::{FieldSpec, PercentConventions, Rule, Source, FIELD_TABLE};
use super::snapshot::{MetricSnapshot, MetricValue};
use crate::client::ResponseSet;
use crate::error::ApplianceError;

/// Placeholder for unknown attribute values
const UNKNOWN: &str = "Unknown";

/// Uptime floor used by the queries-per-minute rate, in seconds
const MIN_RATE_UPTIME_SECS: f64 = 60.0;

/// Table-driven normalizer
#[derive(Debug, Clone)]
pub struct Normalizer {
    table: Vec<FieldSpec>,
    conventions: PercentConventions,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(PercentConventions::default())
    }
}

impl Normalizer {
    /// Normalizer over the built-in field table
    pub fn new(conventions: PercentConventions) -> Self {
        Self::with_table(FIELD_TABLE.to_vec(), conventions)
    }

    /// Normalizer over a custom field table
    pub fn with_table(table: Vec<FieldSpec>, conventions: PercentConventions) -> Self {
        Self { table, conventions }
    }

    pub fn table(&self) -> &[FieldSpec] {
        &self.table
    }

    /// Normalize one response set into a snapshot
    ///
    /// # Errors
    /// Returns `ApplianceError::MalformedData` if an endpoint body is neither
    /// a JSON object nor an array.
    #[instrument(skip(self, responses), fields(endpoints = responses.len()))]
    pub fn normalize(&self, responses: &ResponseSet) -> Result<MetricSnapshot, ApplianceError> {
        for (endpoint, body) in responses.iter() {
            if !(body.is_object() || body.is_array()) {
                return Err(ApplianceError::malformed(
                    endpoint.name(),
                    "top-level body is not a JSON object or array",
                ));
            }
        }

        let metrics: BTreeMap<String, MetricValue> = self
            .table
            .iter()
            .map(|spec| (spec.key.to_string(), self.extract(spec, responses)))
            .collect();

        debug!(metrics = metrics.len(), "Normalized response set");
        Ok(MetricSnapshot::new(metrics))
    }

    fn extract(&self, spec: &FieldSpec, responses: &ResponseSet) -> MetricValue {
        let found = first_present(responses, spec.sources);

        match spec.rule {
            Rule::Number { divisor, decimals } => {
                let value = found.and_then(number).unwrap_or(0.0) / divisor;
                MetricValue::Number(match decimals {
                    Some(d) => round(value, d),
                    None => value,
                })
            }
            Rule::Integer => MetricValue::Integer(found.and_then(integer).unwrap_or(0)),
            Rule::Percent { scale } => {
                let scale = self.conventions.resolve(spec, scale);
                let value = found.and_then(number).unwrap_or(0.0);
                MetricValue::Number(round(scale.to_percent(value), 1).clamp(0.0, 100.0))
            }
            Rule::Text { default } => {
                MetricValue::Text(found.and_then(text).unwrap_or_else(|| default.to_string()))
            }
            Rule::TextAt { index, default } => MetricValue::Text(
                found
                    .and_then(Value::as_array)
                    .and_then(|items| items.get(index))
                    .and_then(text)
                    .unwrap_or_else(|| default.to_string()),
            ),
            Rule::TextList => MetricValue::List(
                found
                    .and_then(Value::as_array)
                    .map(|items| items.iter().filter_map(text).collect())
                    .unwrap_or_default(),
            ),
            Rule::Count => {
                let count = found.and_then(Value::as_array).map_or(0, Vec::len);
                MetricValue::Integer(count as i64)
            }
            Rule::Messages => MetricValue::Map(
                found
                    .and_then(Value::as_array)
                    .map(|items| messages(items))
                    .unwrap_or_default(),
            ),
            Rule::Blocking => MetricValue::Text(blocking_state(found)),
            Rule::Attributes { fields } => {
                MetricValue::Map(attributes(responses, spec.sources, fields))
            }
            Rule::QueriesPerMinute { uptime } => {
                let total = found.and_then(number).unwrap_or(0.0);
                let uptime = first_present(responses, uptime)
                    .and_then(number)
                    .unwrap_or(0.0);
                let minutes = uptime.max(MIN_RATE_UPTIME_SECS) / 60.0;
                MetricValue::Number(round(total / minutes, 2))
            }
        }
    }
}

/// Resolve a dotted path against a JSON value
fn walk<'a>(body: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(body);
    }

    path.split('.').try_fold(body, |value, segment| match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn lookup<'a>(responses: &'a ResponseSet, source: &Source) -> Option<&'a Value> {
    responses
        .get(source.endpoint)
        .and_then(|body| walk(body, source.path))
        .filter(|value| !value.is_null())
}

fn first_present<'a>(responses: &'a ResponseSet, sources: &[Source]) -> Option<&'a Value> {
    sources.iter().find_map(|source| lookup(responses, source))
}

fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn round(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Message objects to `id -> plain text`
///
/// Messages without an id are keyed `Alert <position>` so they never collide
/// with appliance-issued numeric ids.
fn messages(items: &[Value]) -> BTreeMap<String, String> {
    items
        .iter()
        .enumerate()
        .map(|(position, item)| {
            let id = item
                .get("id")
                .and_then(text)
                .unwrap_or_else(|| format!("Alert {}", position));
            let content = ["plain", "message"]
                .iter()
                .find_map(|field| item.get(*field).and_then(text))
                .or_else(|| text(item))
                .unwrap_or_default();
            (id, content)
        })
        .collect()
}

fn blocking_state(value: Option<&Value>) -> String {
    match value {
        Some(Value::Bool(true)) => "Active".to_string(),
        Some(Value::Bool(false)) => "Disabled".to_string(),
        Some(Value::String(s)) => match s.to_ascii_lowercase().as_str() {
            "enabled" | "active" => "Active".to_string(),
            "disabled" => "Disabled".to_string(),
            "" => UNKNOWN.to_string(),
            other => title_case(other),
        },
        _ => UNKNOWN.to_string(),
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn attributes(
    responses: &ResponseSet,
    sources: &[Source],
    fields: &[&str],
) -> BTreeMap<String, String> {
    fields
        .iter()
        .map(|field| {
            let value = sources
                .iter()
                .filter_map(|source| lookup(responses, source))
                .find_map(|object| object.get(*field).and_then(text))
                .unwrap_or_else(|| UNKNOWN.to_string());
            (field.to_string(), value)
        })
        .collect()
}
