mod telemetry;

use chrono::Utc;
use clap::Parser;
use rand::Rng;
use rumqttc::{AsyncClient, MqttOptions, QoS};
use std::time::Duration;
use telemetry::Reading;
use tracing::{error, info, warn};

const BURST_SIZE: u64 = 50;

/// Publishes random telemetry for registered sensors
#[derive(Debug, Parser)]
struct Args {
    #[arg(long, env = "MQTT_BROKER", default_value = "localhost")]
    broker: String,

    #[arg(long, env = "MQTT_PORT", default_value_t = 1883)]
    port: u16,

    /// Messages per second
    #[arg(long, env = "RATE", default_value_t = 100)]
    rate: u64,

    /// Sensor ids 1..=N receive readings
    #[arg(long, env = "SENSORS", default_value_t = 10)]
    sensors: u64,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt::init();

    info!("Starting sensor telemetry simulator");
    info!(
        "Broker: {}:{}, Rate: {} msg/s, Sensors: {}",
        args.broker, args.port, args.rate, args.sensors
    );

    let client_id = format!("sim-{}", uuid::Uuid::new_v4());

    let mut mqtt_options = MqttOptions::new(&client_id, &args.broker, args.port);
    mqtt_options.set_keep_alive(Duration::from_secs(30));
    mqtt_options.set_clean_session(true);

    let (client, mut eventloop) = AsyncClient::new(mqtt_options, 1000);

    tokio::spawn(async move {
        loop {
            if let Err(e) = eventloop.poll().await {
                error!("MQTT eventloop error: {}", e);
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    });

    tokio::time::sleep(Duration::from_secs(2)).await;

    info!("Connected to MQTT broker, starting to publish telemetry");

    let mut rng = rand::thread_rng();
    let mut counter = 0u64;
    let sensors = args.sensors.max(1);
    let burst_interval = Duration::from_millis((BURST_SIZE * 1000) / args.rate.max(1));

    loop {
        let burst_start = std::time::Instant::now();

        for _ in 0..BURST_SIZE {
            let sensor_id = counter % sensors + 1;
            let reading = generate_reading(&mut rng, sensor_id);

            let topic = format!("sensors/{}/telemetry", sensor_id);
            let payload = match serde_json::to_string(&reading) {
                Ok(p) => p,
                Err(e) => {
                    error!("Failed to serialize reading: {}", e);
                    continue;
                }
            };

            match client.publish(&topic, QoS::AtLeastOnce, false, payload).await {
                Ok(_) => {
                    counter += 1;
                }
                Err(e) => {
                    warn!("Failed to publish: {}", e);
                }
            }
        }

        if counter % 1000 < BURST_SIZE {
            info!("Published {} readings", counter);
        }

        let elapsed = burst_start.elapsed();
        if elapsed < burst_interval {
            tokio::time::sleep(burst_interval - elapsed).await;
        } else if elapsed > burst_interval * 2 {
            warn!("Burst took {:?}, target was {:?}", elapsed, burst_interval);
        }
    }
}

/// Each reading carries a random subset of the measurements
fn generate_reading(rng: &mut impl Rng, sensor_id: u64) -> Reading {
    let temperature = rng
        .gen_bool(0.6)
        .then(|| rng.gen_range(15.0..35.0));
    let velocity = rng.gen_bool(0.4).then(|| rng.gen_range(0.0..120.0));
    let humidity = rng.gen_bool(0.5).then(|| rng.gen_range(30.0..80.0));

    let battery_level = if rng.gen_bool(0.02) {
        rng.gen_range(0.0..20.0) // 2% low battery
    } else {
        rng.gen_range(20.0..100.0)
    };

    Reading {
        name: format!("sensor-{}", sensor_id),
        battery_level,
        last_seen: Utc::now().to_rfc3339(),
        temperature,
        velocity,
        humidity,
    }
}
