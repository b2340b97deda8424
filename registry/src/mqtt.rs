use crate::errors::{Error, Result};
use crate::metrics::{
    MQTT_INVALID_MESSAGES_TOTAL, MQTT_MESSAGES_TOTAL, MQTT_STORAGE_FAILURES_TOTAL,
};
use crate::model::TelemetryReading;
use crate::service::SensorService;
use crate::validate::validate_reading;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tracing::{debug, error, info, warn};

/// Topic filter for telemetry; the middle segment is the sensor id
pub const TELEMETRY_TOPIC: &str = "sensors/+/telemetry";

pub async fn run_mqtt(
    broker: String,
    port: u16,
    client_id: String,
    service: SensorService,
) -> Result<()> {
    info!("Connecting to MQTT broker at {}:{}", broker, port);

    let mut mqtt_options = MqttOptions::new(client_id, broker, port);
    mqtt_options.set_keep_alive(std::time::Duration::from_secs(30));
    mqtt_options.set_clean_session(false);

    let (client, mut eventloop) = AsyncClient::new(mqtt_options, 1000);

    client
        .subscribe(TELEMETRY_TOPIC, QoS::AtLeastOnce)
        .await
        .map_err(Error::Mqtt)?;

    info!("Subscribed to {} with QoS 1", TELEMETRY_TOPIC);

    loop {
        match eventloop.poll().await {
            Ok(notification) => {
                if let Event::Incoming(Packet::Publish(publish)) = notification {
                    MQTT_MESSAGES_TOTAL.inc();

                    debug!(
                        "Received message on topic {}, size: {} bytes",
                        publish.topic,
                        publish.payload.len()
                    );

                    match process_message(&publish.topic, &publish.payload, &service).await {
                        Ok(()) => {}
                        Err(e) if is_rejected(&e) => {
                            warn!("Dropping telemetry from {}: {}", publish.topic, e);
                            MQTT_INVALID_MESSAGES_TOTAL.inc();
                        }
                        Err(e) => {
                            error!("Failed to record telemetry from {}: {}", publish.topic, e);
                            MQTT_STORAGE_FAILURES_TOTAL.inc();
                        }
                    }
                }
            }
            Err(e) => {
                error!("MQTT error: {}", e);
                // rumqttc reconnects on the next poll
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            }
        }
    }
}

/// Extracts the sensor id from `sensors/{id}/telemetry`
pub fn sensor_id_from_topic(topic: &str) -> Result<i64> {
    let mut segments = topic.split('/');
    match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some("sensors"), Some(id), Some("telemetry"), None) => id
            .parse()
            .map_err(|_| Error::Validation(format!("Invalid sensor id '{}' in topic", id))),
        _ => Err(Error::Validation(format!("Unexpected topic '{}'", topic))),
    }
}

/// True when the message itself is at fault (topic, payload or validation)
fn is_rejected(error: &Error) -> bool {
    match error {
        Error::Validation(_) => true,

        // Storage failures are not the publisher's fault
        Error::Database(_)
        | Error::Migration(_)
        | Error::Document(_)
        | Error::Cache(_)
        | Error::Storage(_)
        | Error::Mqtt(_)
        | Error::NotFound(_)
        | Error::Conversion { .. } => false,
    }
}

/// Parses, validates and records a single telemetry message
async fn process_message(topic: &str, payload: &[u8], service: &SensorService) -> Result<()> {
    let sensor_id = sensor_id_from_topic(topic)?;

    let reading = serde_json::from_slice::<TelemetryReading>(payload)
        .map_err(|e| Error::Validation(format!("JSON parse error: {}", e)))?;

    validate_reading(&reading)?;

    service.record_telemetry(sensor_id, reading).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryDocumentStore, MemorySensorStore, MemoryTelemetryCache};
    use crate::store::TelemetryCache;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Arc;

    /// Key-value store that is always unreachable
    struct UnreachableCache;

    #[async_trait]
    impl TelemetryCache for UnreachableCache {
        async fn set_fields(&self, _key: &str, _fields: &[(&'static str, String)]) -> Result<()> {
            Err(Error::Storage("connection refused".to_string()))
        }

        async fn get_fields(&self, _key: &str) -> Result<HashMap<String, String>> {
            Err(Error::Storage("connection refused".to_string()))
        }
    }

    fn service() -> SensorService {
        SensorService::new(
            Arc::new(MemorySensorStore::new()),
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(MemoryTelemetryCache::new()),
        )
    }

    #[test]
    fn test_sensor_id_from_topic() {
        assert_eq!(sensor_id_from_topic("sensors/12/telemetry").unwrap(), 12);
        assert!(sensor_id_from_topic("sensors/abc/telemetry").is_err());
        assert!(sensor_id_from_topic("sensors/12").is_err());
        assert!(sensor_id_from_topic("sensors/12/telemetry/extra").is_err());
        assert!(sensor_id_from_topic("telemetry/12").is_err());
    }

    #[test]
    fn test_process_message_valid() {
        tokio_test::block_on(async {
            let service = service();
            let payload = br#"{"name":"S3","battery_level":55.5,"last_seen":"2024-01-01T00:00:00Z","velocity":12.0}"#;

            assert!(process_message("sensors/3/telemetry", payload, &service)
                .await
                .is_ok());

            let view = service.get_latest_telemetry(3).await.unwrap().unwrap();
            assert_eq!(view.name, "S3");
            assert_eq!(view.velocity, Some(12.0));
        });
    }

    #[test]
    fn test_process_message_invalid_json() {
        tokio_test::block_on(async {
            let service = service();
            assert!(process_message("sensors/3/telemetry", b"invalid json", &service)
                .await
                .is_err());
            assert!(service.get_latest_telemetry(3).await.unwrap().is_none());
        });
    }

    #[test]
    fn test_process_message_invalid_battery() {
        tokio_test::block_on(async {
            let service = service();
            let payload = br#"{"name":"S3","battery_level":999.0,"last_seen":"2024-01-01T00:00:00Z"}"#;
            assert!(process_message("sensors/3/telemetry", payload, &service)
                .await
                .is_err());
        });
    }

    #[test]
    fn test_rejected_errors() {
        assert!(is_rejected(&Error::Validation("test".to_string())));
        assert!(!is_rejected(&Error::Storage("down".to_string())));
        assert!(!is_rejected(&Error::NotFound(1)));
    }

    #[test]
    fn test_process_message_storage_failure_is_not_rejection() {
        tokio_test::block_on(async {
            let service = SensorService::new(
                Arc::new(MemorySensorStore::new()),
                Arc::new(MemoryDocumentStore::new()),
                Arc::new(UnreachableCache),
            );
            let payload = br#"{"name":"S3","battery_level":55.5,"last_seen":"2024-01-01T00:00:00Z"}"#;

            let err = process_message("sensors/3/telemetry", payload, &service)
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Storage(_)));
            assert!(!is_rejected(&err));
        });
    }

    #[test]
    fn test_process_message_bad_topic_is_rejection() {
        tokio_test::block_on(async {
            let service = service();
            let payload = br#"{"name":"S3","battery_level":55.5,"last_seen":"2024-01-01T00:00:00Z"}"#;

            let err = process_message("sensors/x/telemetry", payload, &service)
                .await
                .unwrap_err();
            assert!(is_rejected(&err));
        });
    }
}
