// Record model: one telemetry sample and its per-device payloads

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// `[watts, circuit name]`
pub type WattName = (f64, String);

pub type Devices = BTreeMap<String, DeviceEntry>;

/// One minute-granularity record covering all devices.
///
/// On the wire a sample is the two-element array `[timestamp, {key: entry}]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(i64, Devices)", into = "(i64, Devices)")]
pub struct Sample {
    pub timestamp: i64,
    pub devices: Devices,
}

impl Sample {
    pub fn new(timestamp: i64, devices: Devices) -> Self {
        Self { timestamp, devices }
    }

    /// Collection minute (floor of the timestamp in minutes).
    pub fn minute(&self) -> i64 {
        self.timestamp.div_euclid(60)
    }
}

impl From<(i64, Devices)> for Sample {
    fn from((timestamp, devices): (i64, Devices)) -> Self {
        Self { timestamp, devices }
    }
}

impl From<Sample> for (i64, Devices) {
    fn from(s: Sample) -> Self {
        (s.timestamp, s.devices)
    }
}

/// A device payload plus its own last-update time, which may lag the sample.
///
/// Decoding never fails: a missing or mistyped `dat` becomes
/// `DeviceReading::Unknown` and a missing or mistyped `ut` becomes 0, so one
/// broken device cannot take the rest of its sample down with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceEntry {
    pub dat: DeviceReading,
    pub ut: i64,
}

impl From<Value> for DeviceEntry {
    fn from(mut value: Value) -> Self {
        let ut = value.get("ut").and_then(Value::as_i64).unwrap_or_default();
        let dat = match value.get_mut("dat").map(Value::take) {
            Some(dat) => serde_json::from_value(dat).unwrap_or_default(),
            None => DeviceReading::default(),
        };
        Self { dat, ut }
    }
}

impl<'de> Deserialize<'de> for DeviceEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(DeviceEntry::from)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeviceReading {
    Aggregate(AggregatePower),
    Co2(Co2Reading),
    Climate(ClimateReading),
    Plug(PlugReading),
    Bulb(BulbReading),
    Contact(ContactReading),
    /// Anything we do not understand; ignored by aggregation.
    Unknown(Value),
}

impl Default for DeviceReading {
    fn default() -> Self {
        DeviceReading::Unknown(Value::Null)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatePower {
    pub gen: Vec<WattName>,
    #[serde(rename = "use")]
    pub consumption: Vec<WattName>,
}

impl AggregatePower {
    pub fn generation_total(&self) -> f64 {
        self.gen.iter().map(|(w, _)| w).sum()
    }

    pub fn consumption_total(&self) -> f64 {
        self.consumption.iter().map(|(w, _)| w).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateReading {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sq: Option<u32>,
    #[serde(rename = "dcE1")]
    pub dc_e1: f64,
    pub rh: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bt: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hs: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Co2Reading {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sq: Option<u32>,
    #[serde(rename = "dcE1")]
    pub dc_e1: f64,
    pub rh: f64,
    #[serde(rename = "CO2")]
    pub co2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlugReading {
    pub name: String,
    #[serde(default)]
    pub sq: u32,
    pub on: u8,
    #[serde(rename = "pwrE1")]
    pub pwr_e1: f64,
}

impl PlugReading {
    pub fn watts(&self) -> f64 {
        self.pwr_e1 / 10.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulbReading {
    pub name: String,
    #[serde(default)]
    pub sq: u32,
    pub on: u8,
    pub br: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactReading {
    #[serde(default)]
    pub name: String,
    pub bt: u8,
    pub dr: u8,
    pub lux: u8,
    pub pir: u32,
    pub hal: u32,
}

/// Temperature/humidity view shared by climate meters and CO2 sensors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateView<'a> {
    pub name: &'a str,
    pub sequenced: bool,
    pub celsius: f64,
    pub rh: f64,
}

impl DeviceReading {
    pub fn climate(&self) -> Option<ClimateView<'_>> {
        match self {
            DeviceReading::Climate(c) => Some(ClimateView {
                name: &c.name,
                sequenced: c.sq.is_some(),
                celsius: c.dc_e1 / 10.0,
                rh: c.rh,
            }),
            DeviceReading::Co2(c) => Some(ClimateView {
                name: &c.name,
                sequenced: c.sq.is_some(),
                celsius: c.dc_e1 / 10.0,
                rh: c.rh,
            }),
            _ => None,
        }
    }

    pub fn co2(&self) -> Option<(&str, f64)> {
        match self {
            DeviceReading::Co2(c) => Some((&c.name, c.co2)),
            _ => None,
        }
    }

    pub fn plug(&self) -> Option<&PlugReading> {
        match self {
            DeviceReading::Plug(p) => Some(p),
            _ => None,
        }
    }

    pub fn aggregate(&self) -> Option<&AggregatePower> {
        match self {
            DeviceReading::Aggregate(a) => Some(a),
            _ => None,
        }
    }
}
