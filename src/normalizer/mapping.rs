//! Declarative field-mapping table
//!
//! Every metric in the snapshot is described by one [`FieldSpec`]: where to
//! read it from (one or more candidate paths, first present wins), and how to
//! convert it. Variations between appliance API versions live here and
//! nowhere else.
//!
//! # Path syntax
//!
//! Dotted segments walked from the endpoint's top-level body. A numeric
//! segment indexes into an array (`gateway.0.address`). The empty path
//! refers to the body itself.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::client::Endpoint;

/// How an upstream percentage field is scaled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PercentScale {
    /// Already in the 0-100 range
    Percent,
    /// Relative 0-1 fraction, multiplied by 100
    Fraction,
}

impl PercentScale {
    pub fn to_percent(self, value: f64) -> f64 {
        match self {
            PercentScale::Percent => value,
            PercentScale::Fraction => value * 100.0,
        }
    }
}

/// One candidate location of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Source {
    pub endpoint: Endpoint,
    pub path: &'static str,
}

/// Shorthand for building a [`Source`] in const tables
pub const fn at(endpoint: Endpoint, path: &'static str) -> Source {
    Source { endpoint, path }
}

/// Extraction and conversion rule for a field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rule {
    /// Float, divided by `divisor`, rounded to `decimals`; default 0
    Number { divisor: f64, decimals: Option<u32> },
    /// Whole number; default 0
    Integer,
    /// Percentage rounded to 1 decimal, clamped to 0-100; default 0.
    /// `scale` is the convention of the upstream field unless overridden.
    Percent { scale: PercentScale },
    /// String; non-string scalars are stringified
    Text { default: &'static str },
    /// Element `index` of a string list
    TextAt {
        index: usize,
        default: &'static str,
    },
    /// List of strings; default empty
    TextList,
    /// Length of a list; default 0
    Count,
    /// Message objects keyed by id (or position) to plain text; default empty
    Messages,
    /// Blocking state: "Active", "Disabled", or the upstream word; default "Unknown"
    Blocking,
    /// Selected string fields of an object; missing fields become "Unknown"
    Attributes { fields: &'static [&'static str] },
    /// Total queries per minute of uptime; uptime is floored at 60 seconds
    QueriesPerMinute { uptime: &'static [Source] },
}

/// Mapping of one snapshot key to its source fields and conversion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub key: &'static str,
    pub sources: &'static [Source],
    pub rule: Rule,
}

impl FieldSpec {
    pub const fn new(key: &'static str, sources: &'static [Source], rule: Rule) -> Self {
        Self { key, sources, rule }
    }
}

const UPTIME: &[Source] = &[at(Endpoint::System, "system.uptime")];
const RECENT_BLOCKED: &[Source] = &[
    at(Endpoint::RecentBlocked, "blocked"),
    at(Endpoint::RecentBlocked, "recent_blocked"),
];

/// Field table for the Pi-hole v6 API
pub static FIELD_TABLE: &[FieldSpec] = &[
    FieldSpec::new(
        "cpu_temp",
        &[at(Endpoint::Sensors, "sensors.cpu_temp")],
        Rule::Number {
            divisor: 1.0,
            decimals: Some(1),
        },
    ),
    FieldSpec::new(
        "hot_limit",
        &[at(Endpoint::Sensors, "sensors.hot_limit")],
        Rule::Number {
            divisor: 1.0,
            decimals: None,
        },
    ),
    FieldSpec::new(
        "cpu_usage",
        &[
            at(Endpoint::System, "system.cpu.%cpu"),
            at(Endpoint::System, "cpu.%cpu"),
        ],
        Rule::Percent {
            scale: PercentScale::Percent,
        },
    ),
    FieldSpec::new(
        "mem_usage",
        &[
            at(Endpoint::System, "system.memory.ram.%used"),
            at(Endpoint::System, "memory.ram.%used"),
        ],
        Rule::Percent {
            scale: PercentScale::Percent,
        },
    ),
    FieldSpec::new(
        "load",
        &[at(Endpoint::System, "system.cpu.load.raw.0")],
        Rule::Number {
            divisor: 1.0,
            decimals: Some(2),
        },
    ),
    FieldSpec::new(
        "uptime_days",
        UPTIME,
        Rule::Number {
            divisor: 86_400.0,
            decimals: Some(2),
        },
    ),
    FieldSpec::new(
        "queries_pm",
        &[at(Endpoint::Summary, "queries.total")],
        Rule::QueriesPerMinute { uptime: UPTIME },
    ),
    FieldSpec::new(
        "queries_total",
        &[at(Endpoint::Summary, "queries.total")],
        Rule::Integer,
    ),
    FieldSpec::new(
        "queries_blocked",
        &[at(Endpoint::Summary, "queries.blocked")],
        Rule::Integer,
    ),
    FieldSpec::new(
        "percent_blocked",
        &[at(Endpoint::Summary, "queries.percent_blocked")],
        Rule::Percent {
            scale: PercentScale::Percent,
        },
    ),
    FieldSpec::new(
        "domains_blocked",
        &[at(Endpoint::Summary, "gravity.domains_being_blocked")],
        Rule::Integer,
    ),
    FieldSpec::new(
        "gateway",
        &[at(Endpoint::Gateway, "gateway.0.address")],
        Rule::Text { default: "N/A" },
    ),
    FieldSpec::new("blocking", &[at(Endpoint::Blocking, "blocking")], Rule::Blocking),
    FieldSpec::new(
        "active_clients",
        &[
            at(Endpoint::Ftl, "ftl.clients.active"),
            at(Endpoint::Ftl, "clients.active"),
            at(Endpoint::Summary, "clients.active"),
        ],
        Rule::Integer,
    ),
    FieldSpec::new("msg_count", &[at(Endpoint::Messages, "messages")], Rule::Count),
    FieldSpec::new("msg_list", &[at(Endpoint::Messages, "messages")], Rule::Messages),
    FieldSpec::new(
        "ver_core",
        &[at(Endpoint::Version, "version.core.local.version")],
        Rule::Text { default: "N/A" },
    ),
    FieldSpec::new(
        "rem_core",
        &[at(Endpoint::Version, "version.core.remote.version")],
        Rule::Text { default: "N/A" },
    ),
    FieldSpec::new(
        "ver_ftl",
        &[at(Endpoint::Version, "version.ftl.local.version")],
        Rule::Text { default: "N/A" },
    ),
    FieldSpec::new(
        "rem_ftl",
        &[at(Endpoint::Version, "version.ftl.remote.version")],
        Rule::Text { default: "N/A" },
    ),
    FieldSpec::new(
        "ver_web",
        &[at(Endpoint::Version, "version.web.local.version")],
        Rule::Text { default: "N/A" },
    ),
    FieldSpec::new(
        "rem_web",
        &[at(Endpoint::Version, "version.web.remote.version")],
        Rule::Text { default: "N/A" },
    ),
    FieldSpec::new(
        "host_model",
        &[at(Endpoint::Host, "host.model"), at(Endpoint::Host, "model")],
        Rule::Text { default: "Unknown" },
    ),
    FieldSpec::new(
        "host_attr",
        &[at(Endpoint::Host, "host.uname"), at(Endpoint::Host, "")],
        Rule::Attributes {
            fields: &["release", "sysname", "version"],
        },
    ),
    FieldSpec::new("recent_blocked", RECENT_BLOCKED, Rule::TextList),
    FieldSpec::new(
        "blocked_1",
        RECENT_BLOCKED,
        Rule::TextAt {
            index: 0,
            default: "None",
        },
    ),
    FieldSpec::new(
        "blocked_2",
        RECENT_BLOCKED,
        Rule::TextAt {
            index: 1,
            default: "None",
        },
    ),
    FieldSpec::new(
        "blocked_3",
        RECENT_BLOCKED,
        Rule::TextAt {
            index: 2,
            default: "None",
        },
    ),
];

/// Per-metric percent conventions
///
/// Starts from the scale recorded in the field table and lets the operator
/// override it for appliances whose API reports a fraction instead.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PercentConventions {
    overrides: BTreeMap<String, PercentScale>,
}

impl PercentConventions {
    pub fn set(&mut self, metric: &str, scale: PercentScale) {
        self.overrides.insert(metric.to_string(), scale);
    }

    /// Effective scale for `spec`, honouring overrides
    pub fn resolve(&self, spec: &FieldSpec, table_scale: PercentScale) -> PercentScale {
        self.overrides
            .get(spec.key)
            .copied()
            .unwrap_or(table_scale)
    }

    /// Whether `metric` is a percentage field of the default table
    pub fn is_percent_metric(metric: &str) -> bool {
        FIELD_TABLE
            .iter()
            .any(|spec| spec.key == metric && matches!(spec.rule, Rule::Percent { .. }))
    }
}

/// Keys produced by the default table, in table order
pub fn metric_keys() -> impl Iterator<Item = &'static str> {
    FIELD_TABLE.iter().map(|spec| spec.key)
}
