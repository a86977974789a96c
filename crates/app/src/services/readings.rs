//! Reading ingest and time-series queries.

use std::sync::Arc;

use serde_json::json;
use tendril_domain::error::{AppError, ValidationError};
use tendril_domain::reading::{Bucket, Reading, SeriesQuery, aggregate};
use tendril_domain::time;

use crate::crud::body_items;
use crate::module::Module;
use crate::ports::Document;
use crate::route::{Method, RouteDescriptor, RouteRequest, RouteResponse, handler};

/// Batch ingest and bucketed series over the readings module.
pub struct ReadingsService {
    readings: Arc<Module<Reading>>,
}

impl ReadingsService {
    pub fn new(readings: Arc<Module<Reading>>) -> Self {
        Self { readings }
    }

    /// Readings matching `query`, oldest first.
    ///
    /// # Errors
    ///
    /// Storage errors from the readings module.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, query: &SeriesQuery) -> Result<Vec<Reading>, AppError> {
        let mut filter = Document::new();
        if let Some(device_id) = &query.device_id {
            filter.insert("deviceId".to_string(), json!(device_id));
        }
        let mut readings: Vec<Reading> = self
            .readings
            .find_many(filter)
            .await?
            .into_iter()
            .filter(|reading| query.matches(reading))
            .collect();
        readings.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(readings)
    }

    /// Ingest several readings at once; one `readings.created` event
    /// carries all of them.
    ///
    /// # Errors
    ///
    /// [`AppError::Validation`] when any item is invalid (nothing is
    /// stored), or a storage error.
    pub async fn ingest(&self, items: Vec<serde_json::Value>) -> Result<Vec<Reading>, AppError> {
        self.readings.create_many(items).await
    }

    /// `GET /readings/series` and `POST /readings/batch`.
    pub fn routes(self: &Arc<Self>) -> Vec<RouteDescriptor> {
        vec![
            RouteDescriptor::new(Method::Get, "/readings/series", {
                let this = Arc::clone(self);
                handler(move |req| {
                    let this = Arc::clone(&this);
                    async move {
                        let query = series_query(&req)?;
                        let readings = this.list(&query).await?;
                        match query.bucket {
                            Some(bucket) => RouteResponse::json(&aggregate(&readings, bucket)),
                            None => RouteResponse::json(&readings),
                        }
                    }
                })
            })
            .summary("Query readings as a series")
            .description("Filter readings by deviceId, start and end; group them by hour, day, week or month")
            .query_schema(Some(json!({
                "type": "object",
                "properties": {
                    "deviceId": { "type": "string" },
                    "start": { "type": "string", "format": "date-time" },
                    "end": { "type": "string", "format": "date-time" },
                    "bucket": { "type": "string", "enum": ["hour", "day", "week", "month"] }
                }
            }))),
            RouteDescriptor::new(Method::Post, "/readings/batch", {
                let this = Arc::clone(self);
                handler(move |req| {
                    let this = Arc::clone(&this);
                    async move {
                        let created = this.ingest(body_items(req.body)).await?;
                        RouteResponse::json(&created)
                    }
                })
            })
            .summary("Ingest a batch of readings")
            .description("Validate and store several readings, announced as one event")
            .body_schema(Some(json!({
                "type": "array",
                "items": { "type": "object" }
            }))),
        ]
    }
}

fn series_query(req: &RouteRequest) -> Result<SeriesQuery, AppError> {
    let timestamp = |field: &str| -> Result<_, AppError> {
        req.query_str(field)
            .map(|raw| {
                time::parse(&raw).map_err(|_| {
                    ValidationError::field(format!("/{field}"), "expected an RFC 3339 timestamp")
                })
            })
            .transpose()
            .map_err(AppError::from)
    };
    let bucket = req
        .query_str("bucket")
        .map(|raw| raw.parse::<Bucket>())
        .transpose()
        .map_err(|message| ValidationError::field("/bucket", message))?;
    Ok(SeriesQuery {
        device_id: req.query_str("deviceId"),
        start: timestamp("start")?,
        end: timestamp("end")?,
        bucket,
    })
}
