//! Consumer-side entity views
//!
//! Maps snapshot keys to presentation: sensors with display name, unit and
//! icon, and firmware update views for the three Pi-hole components. Entity
//! ids carry a numeric prefix for every instance after the first.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::normalizer::{MetricSnapshot, MetricValue};

/// Sensor presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorDescriptor {
    pub key: &'static str,
    pub name: &'static str,
    pub unit: Option<&'static str>,
    pub icon: &'static str,
}

const fn sensor(
    key: &'static str,
    name: &'static str,
    unit: Option<&'static str>,
    icon: &'static str,
) -> SensorDescriptor {
    SensorDescriptor {
        key,
        name,
        unit,
        icon,
    }
}

pub static SENSORS: &[SensorDescriptor] = &[
    sensor("cpu_temp", "CPU Temperature", Some("°C"), "mdi:thermometer"),
    sensor("cpu_usage", "CPU Usage", Some("%"), "mdi:cpu-64-bit"),
    sensor("mem_usage", "Memory Usage", Some("%"), "mdi:memory"),
    sensor("load", "System Load", None, "mdi:speedometer"),
    sensor("uptime_days", "Uptime", Some("days"), "mdi:timer-outline"),
    sensor("queries_pm", "QPM", Some("qpm"), "mdi:chart-line"),
    sensor("gateway", "Network Gateway", None, "mdi:router-wireless"),
    sensor("blocking", "DNS Blocking", None, "mdi:shield-check"),
    sensor("active_clients", "Active Clients", Some("clients"), "mdi:account-group"),
    sensor("msg_count", "Diagnostics", Some("msgs"), "mdi:alert-circle-outline"),
    sensor("host_model", "Host Model", None, "mdi:raspberry-pi"),
    sensor("recent_blocked", "Recent Blocks", None, "mdi:close-octagon"),
];

/// Pi-hole components with an installed/latest version pair
pub static UPDATE_COMPONENTS: &[(&str, &str)] =
    &[("core", "Core"), ("ftl", "FTL"), ("web", "Web Interface")];

const NO_VERSION: &str = "N/A";

/// Entity naming for one configured instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityNaming {
    instance: u32,
}

impl EntityNaming {
    /// `instance` is the 1-based creation order
    pub fn new(instance: u32) -> Self {
        Self {
            instance: instance.max(1),
        }
    }

    fn prefix(&self) -> String {
        if self.instance == 1 {
            String::new()
        } else {
            format!("{}_", self.instance)
        }
    }

    pub fn sensor_entity_id(&self, key: &str) -> String {
        format!("sensor.pi_hole_stat_{}{}", self.prefix(), key)
    }

    pub fn update_entity_id(&self, component: &str) -> String {
        format!("update.pi_hole_{}{}", self.prefix(), component)
    }

    pub fn unique_id(&self, key: &str) -> String {
        format!("{}_{}", self.instance, key)
    }
}

/// Rendered sensor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorState {
    pub entity_id: String,
    pub unique_id: String,
    pub name: &'static str,
    pub unit: Option<&'static str>,
    pub icon: &'static str,
    pub available: bool,
    pub state: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Value>,
}

/// Rendered firmware update view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateState {
    pub entity_id: String,
    pub unique_id: String,
    pub name: String,
    pub available: bool,
    pub installed_version: Option<String>,
    pub latest_version: Option<String>,
    pub update_available: bool,
    pub release_url: String,
}

fn to_json(value: Option<&MetricValue>) -> Value {
    value
        .and_then(|v| serde_json::to_value(v).ok())
        .unwrap_or(Value::Null)
}

fn sensor_state(snapshot: &MetricSnapshot, key: &str) -> Value {
    match key {
        "recent_blocked" => snapshot
            .get(key)
            .and_then(MetricValue::as_list)
            .and_then(|items| items.first())
            .map_or_else(|| json!("None"), |first| json!(first)),
        _ => to_json(snapshot.get(key)),
    }
}

fn sensor_attributes(snapshot: &MetricSnapshot, key: &str) -> Option<Value> {
    match key {
        "recent_blocked" => Some(json!({ "blocked_domains": to_json(snapshot.get("recent_blocked")) })),
        "msg_count" => Some(json!({ "alerts": to_json(snapshot.get("msg_list")) })),
        "host_model" => Some(to_json(snapshot.get("host_attr"))),
        "cpu_temp" => {
            let mut attrs = Map::new();
            attrs.insert("hot_limit".to_string(), to_json(snapshot.get("hot_limit")));
            Some(Value::Object(attrs))
        }
        _ => None,
    }
}

/// Render every sensor from the latest snapshot
///
/// Without a snapshot all states are null; `available` mirrors the last cycle.
pub fn render_sensors(
    naming: &EntityNaming,
    snapshot: Option<&MetricSnapshot>,
    available: bool,
) -> Vec<SensorState> {
    SENSORS
        .iter()
        .map(|descriptor| SensorState {
            entity_id: naming.sensor_entity_id(descriptor.key),
            unique_id: naming.unique_id(descriptor.key),
            name: descriptor.name,
            unit: descriptor.unit,
            icon: descriptor.icon,
            available: available && snapshot.is_some(),
            state: snapshot.map_or(Value::Null, |s| sensor_state(s, descriptor.key)),
            attributes: snapshot.and_then(|s| sensor_attributes(s, descriptor.key)),
        })
        .collect()
}

fn known_version(snapshot: Option<&MetricSnapshot>, key: &str) -> Option<String> {
    snapshot
        .and_then(|s| s.text(key))
        .filter(|v| *v != NO_VERSION)
        .map(str::to_string)
}

/// Render the core/ftl/web update views
pub fn render_updates(
    naming: &EntityNaming,
    snapshot: Option<&MetricSnapshot>,
    available: bool,
) -> Vec<UpdateState> {
    UPDATE_COMPONENTS
        .iter()
        .map(|(component, label)| {
            let installed = known_version(snapshot, &format!("ver_{}", component));
            let latest = known_version(snapshot, &format!("rem_{}", component));
            let update_available = matches!((&installed, &latest), (Some(i), Some(l)) if i != l);
            let repo = if *component == "web" { "web" } else { "pi-hole" };

            UpdateState {
                entity_id: naming.update_entity_id(component),
                unique_id: naming.unique_id(&format!("update_{}", component)),
                name: format!("Pi-hole {} Update", label),
                available: available && snapshot.is_some(),
                installed_version: installed,
                latest_version: latest,
                update_available,
                release_url: format!("https://github.com/pi-hole/{}/releases", repo),
            }
        })
        .collect()
}
