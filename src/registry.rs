//! Host device registry
//!
//! The home automation host owns the devices: it registers them, stores their
//! last value and applies the semantics of each device type. Incremental
//! counters add every published value to their stored total; all other types
//! overwrite it. Stored values are strings and are parsed defensively.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::Mutex;

use crate::error::{MirrorError, Result};

/// Device types understood by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    /// Running total that accepts deltas
    IncrementalCounter { unit: String },
    Percentage,
    /// Numeric sensor with a free unit label
    CustomSensor { unit: String },
    /// On/off switch shown as a lock
    Switch,
    Text,
}

/// Registration data for one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSpec {
    pub unit: u8,
    pub name: String,
    pub device_type: DeviceType,
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// A registered device and its last value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub spec: DeviceSpec,
    pub n_value: i64,
    pub s_value: String,
    pub last_update: Option<DateTime<Utc>>,
}

/// One publish call as received by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedValue {
    pub unit: u8,
    pub n_value: i64,
    pub s_value: String,
}

/// Host device registry seam
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// Whether a device is registered for `unit`
    async fn exists(&self, unit: u8) -> bool;

    /// Register a device; no-op when the unit is already taken
    async fn register(&self, spec: &DeviceSpec) -> Result<()>;

    /// Publish a numeric flag and string value to a registered device
    async fn publish(&self, unit: u8, n_value: i64, s_value: &str) -> Result<()>;

    /// Last stored string value of a device
    async fn read_last_published(&self, unit: u8) -> Option<String>;

    /// All registered devices in unit order
    async fn devices(&self) -> Vec<DeviceRecord>;
}

/// Parse a stored integer, 0 when not numeric
pub fn parse_stored_u64(value: &str) -> u64 {
    let trimmed = value.trim();
    trimmed.parse::<u64>().ok().unwrap_or_else(|| {
        trimmed
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map_or(0, |v| v.trunc() as u64)
    })
}

/// Parse a stored decimal, 0.0 when not numeric
pub fn parse_stored_f64(value: &str) -> f64 {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Render a decimal the way the host displays it, keeping one fractional digit
pub fn format_decimal(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// In-process table shared by the registry implementations
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct DeviceTable {
    devices: BTreeMap<u8, DeviceRecord>,
}

impl DeviceTable {
    pub fn get(&self, unit: u8) -> Option<&DeviceRecord> {
        self.devices.get(&unit)
    }

    pub fn records(&self) -> Vec<DeviceRecord> {
        self.devices.values().cloned().collect()
    }

    /// Returns true when a new device was added
    pub fn register(&mut self, spec: &DeviceSpec) -> bool {
        if self.devices.contains_key(&spec.unit) {
            return false;
        }
        self.devices.insert(
            spec.unit,
            DeviceRecord {
                spec: spec.clone(),
                n_value: 0,
                s_value: String::new(),
                last_update: None,
            },
        );
        true
    }

    pub fn publish(&mut self, unit: u8, n_value: i64, s_value: &str) -> Result<()> {
        let record = self
            .devices
            .get_mut(&unit)
            .ok_or_else(|| MirrorError::registry(format!("Unknown device unit {}", unit)))?;
        record.n_value = n_value;
        record.s_value = match record.spec.device_type {
            DeviceType::IncrementalCounter { .. } => {
                let total = parse_stored_f64(&record.s_value) + parse_stored_f64(s_value);
                format!("{}", (total * 1000.0).round() / 1000.0)
            }
            _ => s_value.to_string(),
        };
        record.last_update = Some(Utc::now());
        Ok(())
    }
}

/// Registry kept in memory, recording every publish in order
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    table: Mutex<DeviceTable>,
    writes: Mutex<Vec<PublishedValue>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All publish calls so far
    pub async fn writes(&self) -> Vec<PublishedValue> {
        self.writes.lock().await.clone()
    }

    /// Publish calls for one unit
    pub async fn writes_for(&self, unit: u8) -> Vec<PublishedValue> {
        self.writes
            .lock()
            .await
            .iter()
            .filter(|w| w.unit == unit)
            .cloned()
            .collect()
    }

    pub async fn clear_writes(&self) {
        self.writes.lock().await.clear();
    }

    /// Current record of a device
    pub async fn record(&self, unit: u8) -> Option<DeviceRecord> {
        self.table.lock().await.get(unit).cloned()
    }
}

#[async_trait]
impl DeviceRegistry for MemoryRegistry {
    async fn exists(&self, unit: u8) -> bool {
        self.table.lock().await.get(unit).is_some()
    }

    async fn register(&self, spec: &DeviceSpec) -> Result<()> {
        self.table.lock().await.register(spec);
        Ok(())
    }

    async fn publish(&self, unit: u8, n_value: i64, s_value: &str) -> Result<()> {
        self.table.lock().await.publish(unit, n_value, s_value)?;
        self.writes.lock().await.push(PublishedValue {
            unit,
            n_value,
            s_value: s_value.to_string(),
        });
        Ok(())
    }

    async fn read_last_published(&self, unit: u8) -> Option<String> {
        self.table
            .lock()
            .await
            .get(unit)
            .map(|r| r.s_value.clone())
    }

    async fn devices(&self) -> Vec<DeviceRecord> {
        self.table.lock().await.records()
    }
}
