//! Layout of the per-sensor telemetry record in the key-value store.

use crate::errors::{Error, Result};
use crate::model::{TelemetryReading, TelemetryView};
use std::collections::HashMap;
use std::str::FromStr;

pub fn telemetry_key(sensor_id: i64) -> String {
    format!("sensor:{}", sensor_id)
}

/// Field writes for one ingestion, in the order they are applied.
///
/// Temperature and velocity each push a synthesized `name` label, but the
/// literal name from the reading is pushed afterwards and always wins.
pub fn reading_fields(sensor_id: i64, reading: &TelemetryReading) -> Vec<(&'static str, String)> {
    let mut fields = Vec::with_capacity(9);

    if let Some(temperature) = reading.temperature {
        fields.push(("temperature", temperature.to_string()));
        fields.push(("name", format!("Sensor Temperature {}", sensor_id)));
    }
    if let Some(velocity) = reading.velocity {
        fields.push(("velocity", velocity.to_string()));
        fields.push(("name", format!("Sensor Velocity {}", sensor_id)));
    }
    if let Some(humidity) = reading.humidity {
        fields.push(("humidity", humidity.to_string()));
    }

    fields.push(("name", reading.name.clone()));
    fields.push(("id", sensor_id.to_string()));
    fields.push(("battery_level", reading.battery_level.to_string()));
    fields.push(("last_seen", reading.last_seen.clone()));
    fields
}

/// Rebuilds the latest view. `None` when the record has no `id` field,
/// meaning the sensor never reported.
pub fn decode_view(fields: &HashMap<String, String>) -> Result<Option<TelemetryView>> {
    let Some(id) = fields.get("id") else {
        return Ok(None);
    };

    Ok(Some(TelemetryView {
        id: parse("id", id)?,
        name: text(fields, "name"),
        battery_level: parse("battery_level", &text(fields, "battery_level"))?,
        last_seen: text(fields, "last_seen"),
        humidity: optional(fields, "humidity")?,
        temperature: optional(fields, "temperature")?,
        velocity: optional(fields, "velocity")?,
    }))
}

fn text(fields: &HashMap<String, String>, field: &str) -> String {
    fields.get(field).cloned().unwrap_or_default()
}

fn optional(fields: &HashMap<String, String>, field: &'static str) -> Result<Option<f64>> {
    fields.get(field).map(|value| parse(field, value)).transpose()
}

fn parse<T: FromStr>(field: &'static str, value: &str) -> Result<T> {
    value.parse().map_err(|_| Error::Conversion {
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading() -> TelemetryReading {
        TelemetryReading {
            name: "S1".to_string(),
            battery_level: 80.0,
            last_seen: "2024-01-01T00:00:00Z".to_string(),
            temperature: None,
            velocity: None,
            humidity: None,
        }
    }

    fn apply(fields: &[(&'static str, String)]) -> HashMap<String, String> {
        fields
            .iter()
            .map(|(field, value)| (field.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn test_key_layout() {
        assert_eq!(telemetry_key(42), "sensor:42");
    }

    #[test]
    fn test_synthesized_labels_precede_literal_name() {
        let mut reading = reading();
        reading.temperature = Some(21.5);
        reading.velocity = Some(3.0);

        let fields = reading_fields(5, &reading);
        let names: Vec<_> = fields
            .iter()
            .filter(|(field, _)| *field == "name")
            .map(|(_, value)| value.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["Sensor Temperature 5", "Sensor Velocity 5", "S1"]
        );
        assert_eq!(apply(&fields).get("name").map(String::as_str), Some("S1"));
    }

    #[test]
    fn test_decode_minimal_record() {
        let view = decode_view(&apply(&reading_fields(1, &reading())))
            .unwrap()
            .unwrap();
        assert_eq!(view.id, 1);
        assert_eq!(view.name, "S1");
        assert_eq!(view.battery_level, 80.0);
        assert_eq!(view.last_seen, "2024-01-01T00:00:00Z");
        assert_eq!(view.humidity, None);
        assert_eq!(view.temperature, None);
        assert_eq!(view.velocity, None);
    }

    #[test]
    fn test_missing_id_means_no_telemetry() {
        let mut fields = HashMap::new();
        fields.insert("name".to_string(), "orphan".to_string());
        assert!(decode_view(&fields).unwrap().is_none());
        assert!(decode_view(&HashMap::new()).unwrap().is_none());
    }

    #[test]
    fn test_non_numeric_field_is_conversion_error() {
        let mut fields = apply(&reading_fields(1, &reading()));
        fields.insert("humidity".to_string(), "damp".to_string());

        match decode_view(&fields) {
            Err(Error::Conversion { field, value }) => {
                assert_eq!(field, "humidity");
                assert_eq!(value, "damp");
            }
            other => panic!("expected conversion error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_battery_level_is_conversion_error() {
        let mut fields = apply(&reading_fields(1, &reading()));
        fields.remove("battery_level");
        assert!(matches!(
            decode_view(&fields),
            Err(Error::Conversion { field: "battery_level", .. })
        ));
    }
}
