use axum::{routing::get, Router};
use registry::cache::RedisTelemetryCache;
use registry::config::{redact, Config, StorageMode};
use registry::db::{make_pool, PgSensorStore};
use registry::documents::MongoDocumentStore;
use registry::memory::{MemoryDocumentStore, MemorySensorStore, MemoryTelemetryCache};
use registry::{metrics, mqtt, rest, Result, SensorService};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();

    info!("Starting sensor registry");
    info!("HTTP server: {}", config.http_addr);

    metrics::init_metrics();

    let service = match build_service(&config).await {
        Ok(service) => service,
        Err(e) => {
            error!("Failed to connect to storage: {}", e);
            std::process::exit(1);
        }
    };

    let mqtt_handle = if config.mqtt_enabled {
        info!("MQTT broker: {}:{}", config.mqtt_broker, config.mqtt_port);
        let client_id = format!("registry-{}", uuid::Uuid::new_v4());
        let mqtt_service = service.clone();
        let (broker, port) = (config.mqtt_broker.clone(), config.mqtt_port);
        Some(tokio::spawn(async move {
            if let Err(e) = mqtt::run_mqtt(broker, port, client_id, mqtt_service).await {
                error!("MQTT task failed: {}", e);
            }
        }))
    } else {
        warn!("MQTT telemetry intake disabled");
        None
    };

    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .merge(rest::create_router(service));

    let listener = tokio::net::TcpListener::bind(&config.http_addr)
        .await
        .unwrap_or_else(|e| {
            error!("Failed to bind to {}: {}", config.http_addr, e);
            std::process::exit(1);
        });

    info!("HTTP server listening on {}", config.http_addr);

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap_or_else(|e| {
            error!("HTTP server error: {}", e);
        });
    });

    let mqtt_task = async {
        match mqtt_handle {
            Some(handle) => {
                let _ = handle.await;
            }
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = mqtt_task => {
            error!("MQTT task terminated");
        }
        _ = server_handle => {
            error!("HTTP server terminated");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Shutting down");
}

async fn build_service(config: &Config) -> Result<SensorService> {
    match config.storage {
        StorageMode::Memory => {
            warn!("Using in-memory storage, data is lost on restart");
            Ok(SensorService::new(
                Arc::new(MemorySensorStore::new()),
                Arc::new(MemoryDocumentStore::new()),
                Arc::new(MemoryTelemetryCache::new()),
            ))
        }
        StorageMode::External => {
            info!("Database: {}", redact(&config.database_url));
            let pool = make_pool(&config.database_url).await?;
            info!("Document store: {}", redact(&config.mongodb_url));
            let documents =
                MongoDocumentStore::connect(&config.mongodb_url, &config.mongodb_database).await?;
            info!("Key-value store: {}", redact(&config.redis_url));
            let telemetry = RedisTelemetryCache::connect(&config.redis_url).await?;

            Ok(SensorService::new(
                Arc::new(PgSensorStore::new(pool)),
                Arc::new(documents),
                Arc::new(telemetry),
            ))
        }
    }
}

async fn metrics_handler() -> String {
    metrics::gather_metrics()
}
