use chrono::Utc;
use rumqttc::{AsyncClient, MqttOptions, QoS};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::time::sleep;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Reading {
    name: String,
    battery_level: f64,
    last_seen: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    humidity: Option<f64>,
}

impl Reading {
    fn random(sensor_id: u64) -> Self {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        Self {
            name: format!("load-test-sensor-{}", sensor_id),
            battery_level: rng.gen_range(20.0..100.0),
            last_seen: Utc::now().to_rfc3339(),
            temperature: Some(rng.gen_range(15.0..35.0)),
            humidity: Some(rng.gen_range(30.0..80.0)),
        }
    }
}

/// Requires a broker on localhost:1883 and a running registry
#[tokio::test]
#[ignore]
async fn test_telemetry_intake_500_messages_per_second() {
    let test_duration_secs = 10;
    let target_rate = 500;
    let total_messages = test_duration_secs * target_rate;
    let sensors = 20;

    let mut mqtt_options = MqttOptions::new("registry-load-test", "localhost", 1883);
    mqtt_options.set_keep_alive(Duration::from_secs(30));

    let (client, mut eventloop) = AsyncClient::new(mqtt_options, 10000);

    tokio::spawn(async move {
        loop {
            if let Err(e) = eventloop.poll().await {
                eprintln!("MQTT error: {}", e);
                break;
            }
        }
    });

    println!(
        "Publishing {} readings for {} sensors at {} msg/s",
        total_messages, sensors, target_rate
    );

    sleep(Duration::from_millis(500)).await;

    let start = Instant::now();
    let mut sent_count = 0;
    let mut error_count = 0;

    let burst_size = 50;
    let delay_per_burst = Duration::from_micros((burst_size * 1_000_000) / target_rate as u64);

    for batch_start in (0..total_messages).step_by(burst_size as usize) {
        for i in batch_start..std::cmp::min(batch_start + burst_size, total_messages) {
            let sensor_id = (i % sensors) + 1;
            let payload = serde_json::to_string(&Reading::random(sensor_id)).unwrap();

            match client
                .publish(
                    format!("sensors/{}/telemetry", sensor_id),
                    QoS::AtLeastOnce,
                    false,
                    payload,
                )
                .await
            {
                Ok(_) => sent_count += 1,
                Err(e) => {
                    error_count += 1;
                    if error_count < 10 {
                        eprintln!("Send error: {}", e);
                    }
                }
            }
        }

        sleep(delay_per_burst).await;
    }

    let duration = start.elapsed();
    let actual_rate = sent_count as f64 / duration.as_secs_f64();

    println!("Sent {} in {:.2}s ({:.2} msg/s), {} errors", sent_count, duration.as_secs_f64(), actual_rate, error_count);

    assert!(
        actual_rate >= 450.0,
        "Throughput too low: {:.2} msg/s (expected >= 450)",
        actual_rate
    );
    assert_eq!(error_count, 0, "Publish errors: {}", error_count);
}
