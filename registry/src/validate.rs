use crate::errors::{Error, Result};
use crate::model::{SensorCreate, TelemetryReading};
use chrono::DateTime;

const LATITUDE_MIN: f64 = -90.0;
const LATITUDE_MAX: f64 = 90.0;
const LONGITUDE_MIN: f64 = -180.0;
const LONGITUDE_MAX: f64 = 180.0;
const HUMIDITY_MIN: f64 = 0.0;
const HUMIDITY_MAX: f64 = 100.0;
const BATTERY_MIN: f64 = 0.0;
const BATTERY_MAX: f64 = 100.0;

fn check_range(label: &str, value: f64, min: f64, max: f64) -> Result<()> {
    // NaN fails both comparisons, so test for containment instead
    if !(min..=max).contains(&value) {
        return Err(Error::Validation(format!(
            "{} {} out of range [{}, {}]",
            label, value, min, max
        )));
    }
    Ok(())
}

/// Validates a sensor registration request
pub fn validate_sensor(sensor: &SensorCreate) -> Result<()> {
    if sensor.name.trim().is_empty() {
        return Err(Error::Validation("Sensor name cannot be empty".to_string()));
    }

    check_range("Latitude", sensor.latitude, LATITUDE_MIN, LATITUDE_MAX)?;
    check_range("Longitude", sensor.longitude, LONGITUDE_MIN, LONGITUDE_MAX)?;

    Ok(())
}

/// Validates a telemetry reading
pub fn validate_reading(reading: &TelemetryReading) -> Result<()> {
    if reading.name.trim().is_empty() {
        return Err(Error::Validation("Sensor name cannot be empty".to_string()));
    }

    check_range("Battery", reading.battery_level, BATTERY_MIN, BATTERY_MAX)?;

    if let Some(humidity) = reading.humidity {
        check_range("Humidity", humidity, HUMIDITY_MIN, HUMIDITY_MAX)?;
    }

    for (label, value) in [
        ("Temperature", reading.temperature),
        ("Velocity", reading.velocity),
    ] {
        if value.is_some_and(|v| !v.is_finite()) {
            return Err(Error::Validation(format!("{} must be a finite number", label)));
        }
    }

    if DateTime::parse_from_rfc3339(&reading.last_seen).is_err() {
        return Err(Error::Validation(format!(
            "last_seen '{}' is not an RFC 3339 timestamp",
            reading.last_seen
        )));
    }

    Ok(())
}
