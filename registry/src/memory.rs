//! In-process stores for tests and local runs.
//!
//! The sensor store enforces the unique name and non-negative paging that the
//! Postgres table does; nothing is persisted.

use crate::errors::{Error, Result};
use crate::model::{GeoFilter, Sensor, SensorCreate, SensorDocument};
use crate::store::{DocumentStore, SensorStore, TelemetryCache};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|e| Error::Storage(format!("Lock error: {}", e)))
}

/// Sensor table with sequential ids starting at 1
#[derive(Debug, Default)]
pub struct MemorySensorStore {
    rows: Mutex<BTreeMap<i64, Sensor>>,
    last_id: Mutex<i64>,
}

impl MemorySensorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SensorStore for MemorySensorStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Sensor>> {
        Ok(lock(&self.rows)?.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Sensor>> {
        // BTreeMap iterates in id order
        Ok(lock(&self.rows)?
            .values()
            .find(|sensor| sensor.name == name)
            .cloned())
    }

    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<Sensor>> {
        let (Ok(skip), Ok(limit)) = (usize::try_from(skip), usize::try_from(limit)) else {
            return Err(Error::Storage(format!(
                "OFFSET {} / LIMIT {} must not be negative",
                skip, limit
            )));
        };
        Ok(lock(&self.rows)?
            .values()
            .skip(skip)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn insert(&self, sensor: &SensorCreate) -> Result<Sensor> {
        let mut rows = lock(&self.rows)?;
        if rows.values().any(|existing| existing.name == sensor.name) {
            return Err(Error::Storage(format!(
                "duplicate sensor name '{}' violates unique constraint",
                sensor.name
            )));
        }

        let mut last_id = lock(&self.last_id)?;
        *last_id += 1;
        let created = Sensor {
            id: *last_id,
            name: sensor.name.clone(),
            latitude: sensor.latitude,
            longitude: sensor.longitude,
            sensor_type: sensor.sensor_type.clone(),
            mac_address: sensor.mac_address.clone(),
            manufacturer: sensor.manufacturer.clone(),
            model: sensor.model.clone(),
            serie_number: sensor.serie_number.clone(),
            firmware_version: sensor.firmware_version.clone(),
        };
        rows.insert(created.id, created.clone());
        Ok(created)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        lock(&self.rows)?.remove(&id);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: Mutex<HashMap<String, Vec<SensorDocument>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents held in a collection
    pub fn count(&self, collection: &str) -> Result<usize> {
        Ok(lock(&self.collections)?
            .get(collection)
            .map_or(0, Vec::len))
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert_one(&self, collection: &str, document: &SensorDocument) -> Result<()> {
        lock(&self.collections)?
            .entry(collection.to_string())
            .or_default()
            .push(document.clone());
        Ok(())
    }

    async fn find(&self, collection: &str, filter: &GeoFilter) -> Result<Vec<SensorDocument>> {
        Ok(lock(&self.collections)?
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|d| d.latitude == filter.latitude && d.longitude == filter.longitude)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[derive(Debug, Default)]
pub struct MemoryTelemetryCache {
    records: Mutex<HashMap<String, HashMap<String, String>>>,
}

impl MemoryTelemetryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TelemetryCache for MemoryTelemetryCache {
    async fn set_fields(&self, key: &str, fields: &[(&'static str, String)]) -> Result<()> {
        let mut records = lock(&self.records)?;
        let record = records.entry(key.to_string()).or_default();
        for (field, value) in fields {
            record.insert((*field).to_string(), value.clone());
        }
        Ok(())
    }

    async fn get_fields(&self, key: &str) -> Result<HashMap<String, String>> {
        Ok(lock(&self.records)?.get(key).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sensor(name: &str) -> SensorCreate {
        SensorCreate {
            name: name.to_string(),
            latitude: 1.0,
            longitude: 2.0,
            sensor_type: "Temperature".to_string(),
            mac_address: "aa:bb".to_string(),
            manufacturer: "Acme".to_string(),
            model: "T1".to_string(),
            serie_number: "0001".to_string(),
            firmware_version: "1.0".to_string(),
        }
    }

    #[test]
    fn test_ids_are_sequential_and_not_reused() {
        tokio_test::block_on(async {
            let store = MemorySensorStore::new();
            let a = store.insert(&sensor("a")).await.unwrap();
            let b = store.insert(&sensor("b")).await.unwrap();
            assert_eq!((a.id, b.id), (1, 2));

            store.delete(b.id).await.unwrap();
            let c = store.insert(&sensor("c")).await.unwrap();
            assert_eq!(c.id, 3);
        });
    }

    #[test]
    fn test_list_skip_and_limit() {
        tokio_test::block_on(async {
            let store = MemorySensorStore::new();
            for name in ["a", "b", "c", "d"] {
                store.insert(&sensor(name)).await.unwrap();
            }
            let page = store.list(1, 2).await.unwrap();
            let names: Vec<_> = page.iter().map(|s| s.name.as_str()).collect();
            assert_eq!(names, vec!["b", "c"]);
            assert!(store.list(10, 5).await.unwrap().is_empty());
            assert!(matches!(store.list(-1, 5).await, Err(Error::Storage(_))));
            assert!(matches!(store.list(0, -5).await, Err(Error::Storage(_))));
        });
    }

    #[test]
    fn test_duplicate_name_violates_unique_constraint() {
        tokio_test::block_on(async {
            let store = MemorySensorStore::new();
            store.insert(&sensor("dup")).await.unwrap();
            assert!(matches!(
                store.insert(&sensor("dup")).await,
                Err(Error::Storage(_))
            ));

            let found = store.find_by_name("dup").await.unwrap().unwrap();
            assert_eq!(found.id, 1);
            assert_eq!(store.list(0, 10).await.unwrap().len(), 1);
            assert!(store.find_by_name("missing").await.unwrap().is_none());
        });
    }

    #[test]
    fn test_cache_last_write_wins_per_field() {
        tokio_test::block_on(async {
            let cache = MemoryTelemetryCache::new();
            cache
                .set_fields("k", &[("name", "a".to_string()), ("name", "b".to_string())])
                .await
                .unwrap();
            cache.set_fields("k", &[("id", "1".to_string())]).await.unwrap();

            let fields = cache.get_fields("k").await.unwrap();
            assert_eq!(fields.get("name").map(String::as_str), Some("b"));
            assert_eq!(fields.get("id").map(String::as_str), Some("1"));
            assert!(cache.get_fields("other").await.unwrap().is_empty());
        });
    }
}
