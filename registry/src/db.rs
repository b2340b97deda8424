use crate::errors::Result;
use crate::model::{Sensor, SensorCreate};
use crate::store::SensorStore;
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, info};

const SENSOR_COLUMNS: &str = r#"id, name, latitude, longitude, "type", mac_address, manufacturer, model, serie_number, firmware_version"#;

pub async fn make_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await?;

    info!("Database connection established");
    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations completed");

    Ok(pool)
}

#[derive(Debug, Clone)]
pub struct PgSensorStore {
    pool: PgPool,
}

impl PgSensorStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SensorStore for PgSensorStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Sensor>> {
        let query = format!("SELECT {} FROM sensors WHERE id = $1", SENSOR_COLUMNS);
        let sensor = sqlx::query_as::<_, Sensor>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(sensor)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Sensor>> {
        let query = format!(
            "SELECT {} FROM sensors WHERE name = $1 ORDER BY id LIMIT 1",
            SENSOR_COLUMNS
        );
        let sensor = sqlx::query_as::<_, Sensor>(&query)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(sensor)
    }

    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<Sensor>> {
        let query = format!(
            "SELECT {} FROM sensors ORDER BY id LIMIT $1 OFFSET $2",
            SENSOR_COLUMNS
        );
        let sensors = sqlx::query_as::<_, Sensor>(&query)
            .bind(limit)
            .bind(skip)
            .fetch_all(&self.pool)
            .await?;
        Ok(sensors)
    }

    async fn insert(&self, sensor: &SensorCreate) -> Result<Sensor> {
        let query = format!(
            r#"
            INSERT INTO sensors (name, latitude, longitude, "type", mac_address, manufacturer, model, serie_number, firmware_version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            SENSOR_COLUMNS
        );
        let created = sqlx::query_as::<_, Sensor>(&query)
            .bind(&sensor.name)
            .bind(sensor.latitude)
            .bind(sensor.longitude)
            .bind(&sensor.sensor_type)
            .bind(&sensor.mac_address)
            .bind(&sensor.manufacturer)
            .bind(&sensor.model)
            .bind(&sensor.serie_number)
            .bind(&sensor.firmware_version)
            .fetch_one(&self.pool)
            .await?;

        debug!("Inserted sensor {} ({})", created.id, created.name);
        Ok(created)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM sensors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        debug!("Deleted sensor {}", id);
        Ok(())
    }
}
