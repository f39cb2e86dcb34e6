use chrono::{DateTime, TimeZone, Utc};
use serde::{ser::SerializeTuple, Serialize, Serializer};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    // Milliseconds since the Unix epoch.
    pub timestamp: i64,
    // None marks a gap (or a missing reading).
    pub value: Option<f64>,
}

impl Point {
    pub fn new(timestamp: i64, value: Option<f64>) -> Self {
        Self { timestamp, value }
    }

    pub fn gap(timestamp: i64) -> Self {
        Self {
            timestamp,
            value: None,
        }
    }

    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp).single()
    }
}

// Serialized as `[timestamp, value]`, the row shape line charts take.
impl Serialize for Point {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&self.timestamp)?;
        // serde_json writes NaN as null anyway, keep it explicit.
        tuple.serialize_element(&self.value.filter(|v| !v.is_nan()))?;
        tuple.end()
    }
}

/// One parsed input record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    // Raw timestamp, relative to the configured epoch.
    pub timestamp: Option<f64>,
    pub fields: HashMap<String, Option<f64>>,
}

impl Row {
    pub fn new(timestamp: Option<f64>) -> Self {
        Self {
            timestamp,
            fields: HashMap::new(),
        }
    }

    pub fn with_field(mut self, key: &str, value: Option<f64>) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    pub fn value(&self, key: &str) -> Option<f64> {
        self.fields.get(key).copied().flatten()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricSeries {
    pub name: String,
    pub source_key: String,
    pub points: Vec<Point>,
}

impl MetricSeries {
    pub fn new(name: &str, source_key: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            source_key: source_key.unwrap_or(name).to_string(),
            points: vec![],
        }
    }

    pub fn last(&self) -> Option<&Point> {
        self.points.last()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn push(&mut self, point: Point) {
        self.points.push(point)
    }

    pub fn min_timestamp(&self) -> Option<i64> {
        self.points.first().map(|p| p.timestamp)
    }

    pub fn max_timestamp(&self) -> Option<i64> {
        self.points.last().map(|p| p.timestamp)
    }

    /// Returns the points with `start <= timestamp <= end`.
    pub fn select(&self, start: i64, end: i64) -> Vec<Point> {
        let (min_timestamp, max_timestamp) = match (self.min_timestamp(), self.max_timestamp()) {
            (Some(min), Some(max)) => (min, max),
            _ => return vec![],
        };
        if start > end || min_timestamp > end || max_timestamp < start {
            // Out of range
            return vec![];
        }

        let start_idx = if start <= min_timestamp {
            0
        } else {
            self.points.partition_point(|p| p.timestamp < start)
        };
        let end_idx = if end >= max_timestamp {
            self.points.len()
        } else {
            self.points.partition_point(|p| p.timestamp <= end)
        };

        self.points[start_idx..end_idx].to_vec()
    }
}
