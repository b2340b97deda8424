//! Storage seams used by the sensor service.
//!
//! Each backend owns its connection and query semantics. Implementations
//! live in `db` (Postgres), `documents` (MongoDB), `cache` (Redis) and
//! `memory` (in-process, for tests and local runs).

use crate::errors::Result;
use crate::model::{GeoFilter, Sensor, SensorCreate, SensorDocument};
use async_trait::async_trait;
use std::collections::HashMap;

/// Canonical sensor records
#[async_trait]
pub trait SensorStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Sensor>>;

    /// Lowest id wins if several rows share the name
    async fn find_by_name(&self, name: &str) -> Result<Option<Sensor>>;

    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<Sensor>>;

    async fn insert(&self, sensor: &SensorCreate) -> Result<Sensor>;

    async fn delete(&self, id: i64) -> Result<()>;
}

/// Per-type projection documents
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_one(&self, collection: &str, document: &SensorDocument) -> Result<()>;

    async fn find(&self, collection: &str, filter: &GeoFilter) -> Result<Vec<SensorDocument>>;
}

/// Latest-value telemetry records, one structured record per key
#[async_trait]
pub trait TelemetryCache: Send + Sync {
    /// Writes the fields in order; a field repeated in `fields` keeps its last value.
    /// Fields not mentioned keep whatever value they already had.
    async fn set_fields(&self, key: &str, fields: &[(&'static str, String)]) -> Result<()>;

    /// Empty map when the key holds nothing
    async fn get_fields(&self, key: &str) -> Result<HashMap<String, String>>;
}
