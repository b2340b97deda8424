use crate::errors::Error;
use crate::model::{Sensor, SensorCreate, SensorListResponse, TelemetryReading, TelemetryView};
use crate::service::SensorService;
use crate::validate::{validate_reading, validate_sensor};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::error;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 1000;

#[derive(Clone)]
struct AppState {
    service: SensorService,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    skip: Option<i64>,
    limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct NearQuery {
    latitude: f64,
    longitude: f64,
}

pub fn create_router(service: SensorService) -> Router {
    let state = AppState { service };

    Router::new()
        .route("/sensors", get(list_sensors).post(create_sensor))
        .route("/sensors/near", get(find_sensors_near))
        .route("/sensors/:id", get(get_sensor).delete(delete_sensor))
        .route(
            "/sensors/:id/data",
            get(get_telemetry).post(record_telemetry),
        )
        .with_state(state)
}

async fn create_sensor(
    State(state): State<AppState>,
    Json(sensor): Json<SensorCreate>,
) -> Result<Json<Sensor>, AppError> {
    validate_sensor(&sensor)?;
    if state.service.get_sensor_by_name(&sensor.name).await?.is_some() {
        return Err(Error::Validation(format!(
            "Sensor with name '{}' already registered",
            sensor.name
        ))
        .into());
    }
    Ok(Json(state.service.create_sensor(sensor).await?))
}

async fn list_sensors(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> Result<Json<SensorListResponse>, AppError> {
    let skip = params.skip.unwrap_or(0).max(0);
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(0, MAX_LIMIT);

    let sensors = state.service.list_sensors(skip, limit).await?;

    Ok(Json(SensorListResponse {
        count: sensors.len(),
        data: sensors,
        skip,
        limit,
    }))
}

async fn get_sensor(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Sensor>, AppError> {
    let sensor = state
        .service
        .get_sensor(id)
        .await?
        .ok_or(Error::NotFound(id))?;
    Ok(Json(sensor))
}

async fn delete_sensor(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Sensor>, AppError> {
    Ok(Json(state.service.delete_sensor(id).await?))
}

async fn record_telemetry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(reading): Json<TelemetryReading>,
) -> Result<Json<TelemetryReading>, AppError> {
    validate_reading(&reading)?;
    Ok(Json(state.service.record_telemetry(id, reading).await?))
}

async fn get_telemetry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<TelemetryView>, AppError> {
    let view = state
        .service
        .get_latest_telemetry(id)
        .await?
        .ok_or(Error::NotFound(id))?;
    Ok(Json(view))
}

async fn find_sensors_near(
    State(state): State<AppState>,
    Query(params): Query<NearQuery>,
) -> Result<Json<Vec<Option<TelemetryView>>>, AppError> {
    let views = state
        .service
        .find_sensors_near(params.latitude, params.longitude)
        .await?;
    Ok(Json(views))
}

struct AppError(anyhow::Error);

impl AppError {
    fn status(&self) -> StatusCode {
        match self.0.downcast_ref::<Error>() {
            Some(Error::NotFound(_)) => StatusCode::NOT_FOUND,
            Some(Error::Validation(_)) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("API error: {}", self.0);
            (status, format!("Internal server error: {}", self.0)).into_response()
        } else {
            (status, self.0.to_string()).into_response()
        }
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
