use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Histogram, HistogramOpts, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref SENSORS_CREATED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "registry_sensors_created_total",
        "Total sensors registered"
    ))
    .unwrap();
    pub static ref SENSORS_DELETED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "registry_sensors_deleted_total",
        "Total sensors deleted"
    ))
    .unwrap();
    pub static ref PROJECTIONS_SKIPPED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "registry_projections_skipped_total",
        "Sensors created with a type that has no document collection"
    ))
    .unwrap();
    pub static ref TELEMETRY_RECORDED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "registry_telemetry_recorded_total",
        "Total telemetry readings written to the key-value store"
    ))
    .unwrap();
    pub static ref MQTT_MESSAGES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "registry_mqtt_messages_total",
        "Total telemetry messages received from MQTT"
    ))
    .unwrap();
    pub static ref MQTT_INVALID_MESSAGES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "registry_mqtt_invalid_messages_total",
        "Total MQTT telemetry messages rejected"
    ))
    .unwrap();
    pub static ref MQTT_STORAGE_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "registry_mqtt_storage_failures_total",
        "Valid MQTT telemetry messages lost to a storage failure"
    ))
    .unwrap();
    pub static ref NEAR_QUERY_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "registry_near_query_seconds",
            "Time taken to resolve a find-near query across both stores"
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0
        ])
    )
    .unwrap();
}

pub fn init_metrics() {
    REGISTRY
        .register(Box::new(SENSORS_CREATED_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(SENSORS_DELETED_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(PROJECTIONS_SKIPPED_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(TELEMETRY_RECORDED_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(MQTT_MESSAGES_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(MQTT_INVALID_MESSAGES_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(MQTT_STORAGE_FAILURES_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(NEAR_QUERY_SECONDS.clone()))
        .unwrap();
}

pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}
