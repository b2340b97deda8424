use serde::{Deserialize, Serialize};

pub const TEMPERATURE_COLLECTION: &str = "sensors temperature";
pub const VELOCITY_COLLECTION: &str = "sensors velocity";

/// Canonical sensor row as stored in the relational table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Sensor {
    pub id: i64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub sensor_type: String,
    pub mac_address: String,
    pub manufacturer: String,
    pub model: String,
    pub serie_number: String,
    pub firmware_version: String,
}

/// Fields supplied when registering a sensor; the id is assigned by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorCreate {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "type")]
    pub sensor_type: String,
    pub mac_address: String,
    pub manufacturer: String,
    pub model: String,
    pub serie_number: String,
    pub firmware_version: String,
}

/// Denormalized copy of a sensor kept in the per-type document collections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorDocument {
    pub id: i64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "type")]
    pub sensor_type: String,
    pub mac_address: String,
    pub manufacturer: String,
    pub model: String,
    pub serie_number: String,
    pub firmware_version: String,
}

impl SensorDocument {
    pub fn new(id: i64, sensor: &SensorCreate) -> Self {
        Self {
            id,
            name: sensor.name.clone(),
            latitude: sensor.latitude,
            longitude: sensor.longitude,
            sensor_type: sensor.sensor_type.clone(),
            mac_address: sensor.mac_address.clone(),
            manufacturer: sensor.manufacturer.clone(),
            model: sensor.model.clone(),
            serie_number: sensor.serie_number.clone(),
            firmware_version: sensor.firmware_version.clone(),
        }
    }
}

/// Exact-equality location filter used against the document collections
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoFilter {
    pub latitude: f64,
    pub longitude: f64,
}

/// Sensor category, which decides where the projection document lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    Temperature,
    Velocity,
    Unrecognized,
}

impl SensorKind {
    /// Kinds that own a document collection, in the order they are queried
    pub const PROJECTED: [SensorKind; 2] = [SensorKind::Temperature, SensorKind::Velocity];

    pub fn from_type(sensor_type: &str) -> Self {
        match sensor_type {
            "Temperature" => SensorKind::Temperature,
            "Velocity" => SensorKind::Velocity,
            _ => SensorKind::Unrecognized,
        }
    }

    pub fn collection(self) -> Option<&'static str> {
        match self {
            SensorKind::Temperature => Some(TEMPERATURE_COLLECTION),
            SensorKind::Velocity => Some(VELOCITY_COLLECTION),
            SensorKind::Unrecognized => None,
        }
    }
}

/// One telemetry ingestion, as received over HTTP or MQTT
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryReading {
    pub name: String,
    pub battery_level: f64,
    pub last_seen: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
}

/// Latest known telemetry of a sensor, rebuilt from the key-value record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryView {
    pub id: i64,
    pub name: String,
    pub battery_level: f64,
    pub last_seen: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<f64>,
}

/// REST API list response wrapper
#[derive(Debug, Serialize)]
pub struct SensorListResponse {
    pub data: Vec<Sensor>,
    /// Number of sensors in this page
    pub count: usize,
    pub skip: i64,
    pub limit: i64,
}
