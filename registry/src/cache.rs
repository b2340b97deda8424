use crate::errors::Result;
use crate::store::TelemetryCache;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use tracing::info;

/// Telemetry records kept as one Redis hash per sensor
#[derive(Clone)]
pub struct RedisTelemetryCache {
    conn: ConnectionManager,
}

impl RedisTelemetryCache {
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to key-value store...");
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        info!("Key-value store connection established");
        Ok(Self { conn })
    }
}

#[async_trait]
impl TelemetryCache for RedisTelemetryCache {
    async fn set_fields(&self, key: &str, fields: &[(&'static str, String)]) -> Result<()> {
        // HMSET applies field/value pairs left to right in a single command
        let mut conn = self.conn.clone();
        let _: () = conn.hset_multiple(key, fields).await?;
        Ok(())
    }

    async fn get_fields(&self, key: &str) -> Result<HashMap<String, String>> {
        let mut conn = self.conn.clone();
        let fields: HashMap<String, String> = conn.hgetall(key).await?;
        Ok(fields)
    }
}
