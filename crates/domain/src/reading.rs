//! Reading: a sensor value captured at a point in time, plus series
//! aggregation over stored readings.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Timelike};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::record::Record;
use crate::time::Timestamp;

/// Collection name of reading records.
pub const COLLECTION: &str = "readings";

/// A single sensor reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub id: String,
    pub device_id: String,
    pub value: f64,
    pub timestamp: Timestamp,
}

impl Reading {
    /// JSON schema of a persisted reading.
    #[must_use]
    pub fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": { "type": "string" },
                "deviceId": { "type": "string", "minLength": 1 },
                "value": { "type": "number" },
                "timestamp": { "type": "string", "format": "date-time" }
            },
            "required": ["id", "deviceId", "value", "timestamp"]
        })
    }
}

impl Record for Reading {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Width of an aggregation bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Hour,
    Day,
    Week,
    Month,
}

impl Bucket {
    /// Sortable key of the bucket containing `ts`.
    ///
    /// Weeks are ISO weeks (`2024-W09`), starting on Monday.
    #[must_use]
    pub fn key(self, ts: &Timestamp) -> String {
        match self {
            Self::Hour => format!(
                "{:04}-{:02}-{:02}T{:02}:00Z",
                ts.year(),
                ts.month(),
                ts.day(),
                ts.hour()
            ),
            Self::Day => format!("{:04}-{:02}-{:02}", ts.year(), ts.month(), ts.day()),
            Self::Week => {
                let week = ts.iso_week();
                format!("{:04}-W{:02}", week.year(), week.week())
            }
            Self::Month => format!("{:04}-{:02}", ts.year(), ts.month()),
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        })
    }
}

impl FromStr for Bucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hour" => Ok(Self::Hour),
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            other => Err(format!("unknown bucket {other:?}")),
        }
    }
}

/// Aggregate of the readings falling in one bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub t: String,
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub sum: f64,
}

/// Time-window filter over readings. Both bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesQuery {
    pub device_id: Option<String>,
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
    pub bucket: Option<Bucket>,
}

impl SeriesQuery {
    /// Whether `reading` passes the device and time filters.
    #[must_use]
    pub fn matches(&self, reading: &Reading) -> bool {
        if let Some(device_id) = &self.device_id
            && reading.device_id != *device_id
        {
            return false;
        }
        if let Some(start) = self.start
            && reading.timestamp < start
        {
            return false;
        }
        if let Some(end) = self.end
            && reading.timestamp > end
        {
            return false;
        }
        true
    }
}

/// Group readings into buckets, sorted by bucket key.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn aggregate<'a>(readings: impl IntoIterator<Item = &'a Reading>, bucket: Bucket) -> Vec<SeriesPoint> {
    let mut groups: BTreeMap<String, SeriesPoint> = BTreeMap::new();
    for reading in readings {
        let key = bucket.key(&reading.timestamp);
        let point = groups.entry(key.clone()).or_insert_with(|| SeriesPoint {
            t: key,
            count: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            avg: 0.0,
            sum: 0.0,
        });
        point.count += 1;
        point.sum += reading.value;
        point.min = point.min.min(reading.value);
        point.max = point.max.max(reading.value);
        point.avg = point.sum / point.count as f64;
    }
    groups.into_values().collect()
}
