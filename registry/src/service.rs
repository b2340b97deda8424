//! Sensor service: orchestrates the relational, document and key-value stores.
//!
//! Writes to the three stores are independent. A failure after the relational
//! insert leaves the record without its projection; nothing is rolled back.

use crate::errors::{Error, Result};
use crate::metrics::{
    NEAR_QUERY_SECONDS, PROJECTIONS_SKIPPED_TOTAL, SENSORS_CREATED_TOTAL, SENSORS_DELETED_TOTAL,
    TELEMETRY_RECORDED_TOTAL,
};
use crate::model::{
    GeoFilter, Sensor, SensorCreate, SensorDocument, SensorKind, TelemetryReading, TelemetryView,
};
use crate::store::{DocumentStore, SensorStore, TelemetryCache};
use crate::telemetry::{decode_view, reading_fields, telemetry_key};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct SensorService {
    sensors: Arc<dyn SensorStore>,
    documents: Arc<dyn DocumentStore>,
    telemetry: Arc<dyn TelemetryCache>,
}

impl SensorService {
    pub fn new(
        sensors: Arc<dyn SensorStore>,
        documents: Arc<dyn DocumentStore>,
        telemetry: Arc<dyn TelemetryCache>,
    ) -> Self {
        Self {
            sensors,
            documents,
            telemetry,
        }
    }

    /// Stores the sensor, then projects it into the collection of its type.
    /// Types without a collection get no projection and no error.
    pub async fn create_sensor(&self, sensor: SensorCreate) -> Result<Sensor> {
        let created = self.sensors.insert(&sensor).await?;
        SENSORS_CREATED_TOTAL.inc();
        info!("Registered sensor {} ({})", created.id, created.name);

        match SensorKind::from_type(&sensor.sensor_type).collection() {
            Some(collection) => {
                let document = SensorDocument::new(created.id, &sensor);
                self.documents.insert_one(collection, &document).await?;
            }
            None => {
                PROJECTIONS_SKIPPED_TOTAL.inc();
                warn!(
                    "Sensor {} has unrecognized type '{}', no document projection written",
                    created.id, sensor.sensor_type
                );
            }
        }

        Ok(created)
    }

    pub async fn get_sensor(&self, id: i64) -> Result<Option<Sensor>> {
        self.sensors.find_by_id(id).await
    }

    pub async fn get_sensor_by_name(&self, name: &str) -> Result<Option<Sensor>> {
        self.sensors.find_by_name(name).await
    }

    pub async fn list_sensors(&self, skip: i64, limit: i64) -> Result<Vec<Sensor>> {
        self.sensors.list(skip, limit).await
    }

    /// Hard delete of the relational record. The projection document and any
    /// telemetry stay behind.
    pub async fn delete_sensor(&self, id: i64) -> Result<Sensor> {
        let sensor = self
            .sensors
            .find_by_id(id)
            .await?
            .ok_or(Error::NotFound(id))?;
        self.sensors.delete(id).await?;
        SENSORS_DELETED_TOTAL.inc();
        info!("Deleted sensor {} ({})", sensor.id, sensor.name);
        Ok(sensor)
    }

    pub async fn record_telemetry(
        &self,
        id: i64,
        reading: TelemetryReading,
    ) -> Result<TelemetryReading> {
        let fields = reading_fields(id, &reading);
        self.telemetry
            .set_fields(&telemetry_key(id), &fields)
            .await?;
        TELEMETRY_RECORDED_TOTAL.inc();
        debug!("Recorded {} telemetry fields for sensor {}", fields.len(), id);
        Ok(reading)
    }

    pub async fn get_latest_telemetry(&self, id: i64) -> Result<Option<TelemetryView>> {
        let fields = self.telemetry.get_fields(&telemetry_key(id)).await?;
        decode_view(&fields)
    }

    /// Exact match on both coordinates, temperature sensors first. Sensors
    /// that never reported show up as `None`.
    pub async fn find_sensors_near(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Vec<Option<TelemetryView>>> {
        let start = Instant::now();
        let filter = GeoFilter {
            latitude,
            longitude,
        };

        let mut views = Vec::new();
        for kind in SensorKind::PROJECTED {
            let Some(collection) = kind.collection() else {
                continue;
            };
            for document in self.documents.find(collection, &filter).await? {
                views.push(self.get_latest_telemetry(document.id).await?);
            }
        }

        NEAR_QUERY_SECONDS.observe(start.elapsed().as_secs_f64());
        debug!(
            "{} sensors at ({}, {})",
            views.len(),
            latitude,
            longitude
        );
        Ok(views)
    }
}
