use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fs::File, io::BufReader, path::Path};
use thiserror::Error;

// 2000-01-01T00:00:00Z, the epoch the sensor firmware counts from.
pub const DEFAULT_EPOCH_OFFSET: i64 = 946_684_800;
pub const DEFAULT_GAP_THRESHOLD_MS: i64 = 60 * 1000;
pub const DEFAULT_TIMESTAMP_FIELD: &str = "timestamp";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub time: TimeConfig,
    pub timestamp_field: TimestampField,
    pub metrics: MetricList,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    #[default]
    Seconds,
    Milliseconds,
}

impl TimeUnit {
    pub fn millis(&self) -> f64 {
        match self {
            TimeUnit::Seconds => 1000.,
            TimeUnit::Milliseconds => 1.,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    // Added to every raw timestamp before scaling, expressed in `unit`.
    pub epoch_offset: i64,
    // Unit of the raw timestamps in the feed.
    pub unit: TimeUnit,
    // Largest gap between consecutive samples, in milliseconds, before
    // a gap marker is inserted.
    pub gap_threshold: i64,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            epoch_offset: DEFAULT_EPOCH_OFFSET,
            unit: TimeUnit::Seconds,
            gap_threshold: DEFAULT_GAP_THRESHOLD_MS,
        }
    }
}

impl TimeConfig {
    /// Converts a raw feed timestamp into milliseconds since the Unix epoch.
    /// Returns None when the result doesn't fit in an i64.
    pub fn to_millis(&self, raw: f64) -> Option<i64> {
        let millis = ((raw + self.epoch_offset as f64) * self.unit.millis()).trunc();
        // i64::MAX as f64 rounds up to 2^63, which is already out of range.
        if millis.is_finite() && millis >= i64::MIN as f64 && millis < i64::MAX as f64 {
            Some(millis as i64)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimestampField(pub String);

impl Default for TimestampField {
    fn default() -> Self {
        Self(DEFAULT_TIMESTAMP_FIELD.to_string())
    }
}

impl AsRef<str> for TimestampField {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricConfig {
    pub name: String,
    // Column to read from, when it differs from `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_key: Option<String>,
    // Display target the chart is drawn into. Defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub title: String,
    pub ylabel: String,
    pub color: String,
}

impl MetricConfig {
    pub fn new(name: &str, title: &str, ylabel: &str, color: &str) -> Self {
        Self {
            name: name.to_string(),
            source_key: None,
            target: None,
            title: title.to_string(),
            ylabel: ylabel.to_string(),
            color: color.to_string(),
        }
    }

    pub fn with_source_key(mut self, source_key: &str) -> Self {
        self.source_key = Some(source_key.to_string());
        self
    }

    pub fn source_key(&self) -> &str {
        self.source_key.as_deref().unwrap_or(&self.name)
    }

    pub fn target(&self) -> &str {
        self.target.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricList(pub Vec<MetricConfig>);

impl Default for MetricList {
    fn default() -> Self {
        Self(vec![
            MetricConfig::new("temperature", "Temperature", "Temperature (C)", "#FF0000"),
            MetricConfig::new("pressure", "Pressure", "Pressure (hPa)", "#0000FF"),
            MetricConfig::new(
                "humidity",
                "Relative Humidity",
                "Relative Humidity (%)",
                "#00FF00",
            )
            .with_source_key("relative_humidity"),
            MetricConfig::new("tvoc", "TVOC", "TVOC (ppb)", "#FF00FF"),
            MetricConfig::new("eco2", "eCO2", "eCO2 (ppm)", "#009999").with_source_key("eCO2"),
            MetricConfig::new("aqi", "AQI", "AQI", "#333300"),
        ])
    }
}

impl MetricList {
    pub fn iter(&self) -> std::slice::Iter<'_, MetricConfig> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("no metrics configured")]
    NoMetrics,
    #[error("metric {0} configured more than once")]
    DuplicateMetric(String),
    #[error("gap threshold must not be negative, got {0}")]
    NegativeGapThreshold(i64),
    #[error("timestamp field name is empty")]
    EmptyTimestampField,
    #[error("metric name is empty")]
    EmptyMetricName,
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("error opening config file")]
    File(#[from] std::io::Error),
    #[error("error unmarshaling config file")]
    Unmarshal(#[from] serde_json::Error),
    #[error("invalid config")]
    Invalid(#[from] ConfigError),
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.metrics.is_empty() {
            return Err(ConfigError::NoMetrics);
        }
        if self.time.gap_threshold < 0 {
            return Err(ConfigError::NegativeGapThreshold(self.time.gap_threshold));
        }
        if self.timestamp_field.as_ref().is_empty() {
            return Err(ConfigError::EmptyTimestampField);
        }
        let mut seen = HashSet::new();
        for metric in self.metrics.iter() {
            if metric.name.is_empty() {
                return Err(ConfigError::EmptyMetricName);
            }
            if !seen.insert(metric.name.as_str()) {
                return Err(ConfigError::DuplicateMetric(metric.name.clone()));
            }
        }
        Ok(())
    }

    /// Reads a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let file = File::open(path)?;
        let config: Config = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }
}
