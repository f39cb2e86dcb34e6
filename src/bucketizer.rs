use crate::{
    config::{Config, ConfigError, MetricConfig, TimeConfig},
    gap::GapPolicy,
    metric::{MetricSeries, Point, Row},
};
use log::{debug, warn};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub config: MetricConfig,
    pub series: MetricSeries,
    // Gap markers inserted so far.
    pub gaps: usize,
}

impl Track {
    fn new(config: MetricConfig) -> Self {
        let series = MetricSeries::new(&config.name, config.source_key.as_deref());
        Self {
            config,
            series,
            gaps: 0,
        }
    }

    fn append(&mut self, policy: &GapPolicy, timestamp: i64, value: Option<f64>) {
        if let Some(marker) = policy.marker(self.series.last(), timestamp) {
            debug!(
                "gap of {}ms in {} before {}",
                timestamp.saturating_sub(marker.timestamp),
                self.series.name,
                timestamp
            );
            self.series.push(marker);
            self.gaps += 1;
        }
        self.series.push(Point::new(timestamp, value));
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub rows: usize,
    pub skipped: usize,
}

/// Buckets incoming rows into one series per configured metric.
///
/// Rows are appended in arrival order and never sorted. Every row carrying
/// a timestamp adds exactly one point to every series, preceded by a gap
/// marker when the distance to the previous point exceeds the threshold.
pub struct Bucketizer {
    time: TimeConfig,
    policy: GapPolicy,
    tracks: HashMap<String, Track>,
    // Metric names in configuration order.
    order: Vec<String>,
    stats: IngestStats,
}

impl Bucketizer {
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut tracks = HashMap::with_capacity(config.metrics.len());
        let mut order = Vec::with_capacity(config.metrics.len());
        for metric in config.metrics.iter() {
            order.push(metric.name.clone());
            tracks.insert(metric.name.clone(), Track::new(metric.clone()));
        }

        Ok(Self {
            time: config.time,
            policy: GapPolicy::new(config.time.gap_threshold),
            tracks,
            order,
            stats: IngestStats::default(),
        })
    }

    /// Appends `row` to every series. Returns false, leaving all series
    /// untouched, when the row has no timestamp.
    pub fn ingest(&mut self, row: &Row) -> bool {
        self.stats.rows += 1;
        // Non-finite or out-of-range timestamps count as missing.
        let timestamp = match row.timestamp.and_then(|raw| self.time.to_millis(raw)) {
            Some(timestamp) => timestamp,
            None => {
                warn!("skipping row {} without timestamp", self.stats.rows);
                self.stats.skipped += 1;
                return false;
            }
        };

        for track in self.tracks.values_mut() {
            let value = row.value(&track.series.source_key);
            track.append(&self.policy, timestamp, value);
        }
        true
    }

    pub fn ingest_all<'a, I>(&mut self, rows: I) -> usize
    where
        I: IntoIterator<Item = &'a Row>,
    {
        rows.into_iter().filter(|row| self.ingest(row)).count()
    }

    pub fn get(&self, name: &str) -> Option<&MetricSeries> {
        self.tracks.get(name).map(|t| &t.series)
    }

    pub fn track(&self, name: &str) -> Option<&Track> {
        self.tracks.get(name)
    }

    /// Tracks in configuration order.
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.order.iter().filter_map(|name| self.tracks.get(name))
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    pub fn gap_threshold(&self) -> i64 {
        self.policy.threshold()
    }

    pub fn into_tracks(mut self) -> Vec<Track> {
        self.order
            .iter()
            .filter_map(|name| self.tracks.remove(name))
            .collect()
    }
}

#[cfg(test)]
pub mod tests {
    use crate::{
        config::{Config, ConfigError, MetricConfig, MetricList},
        metric::{Point, Row},
    };

    use super::Bucketizer;

    const T0: i64 = 946_684_800_000;

    fn single_metric_config(name: &str) -> Config {
        Config {
            metrics: MetricList(vec![MetricConfig::new(name, name, name, "#000000")]),
            ..Default::default()
        }
    }

    fn row(timestamp: f64, key: &str, value: f64) -> Row {
        Row::new(Some(timestamp)).with_field(key, Some(value))
    }

    #[test]
    fn test_gap_marker_inserted() {
        let mut bucketizer = Bucketizer::new(&Config::default()).unwrap();
        bucketizer.ingest(&row(0., "temperature", 10.));
        bucketizer.ingest(&row(61., "temperature", 12.));

        let series = bucketizer.get("temperature").unwrap();
        assert_eq!(
            series.points,
            vec![
                Point::new(T0, Some(10.)),
                Point::gap(T0),
                Point::new(T0 + 61_000, Some(12.)),
            ]
        );
        assert_eq!(bucketizer.track("temperature").unwrap().gaps, 1);
    }

    #[test]
    fn test_no_gap_under_threshold() {
        let mut bucketizer = Bucketizer::new(&single_metric_config("v")).unwrap();
        let rows = [row(0., "v", 1.), row(30., "v", 2.), row(59., "v", 3.)];
        assert_eq!(bucketizer.ingest_all(&rows), 3);

        let series = bucketizer.get("v").unwrap();
        assert_eq!(
            series.points,
            vec![
                Point::new(T0, Some(1.)),
                Point::new(T0 + 30_000, Some(2.)),
                Point::new(T0 + 59_000, Some(3.)),
            ]
        );
    }

    #[test]
    fn test_gap_equal_to_threshold() {
        let mut bucketizer = Bucketizer::new(&single_metric_config("v")).unwrap();
        bucketizer.ingest(&row(0., "v", 1.));
        bucketizer.ingest(&row(60., "v", 2.));
        assert_eq!(bucketizer.get("v").unwrap().len(), 2);
        assert_eq!(bucketizer.track("v").unwrap().gaps, 0);
    }

    #[test]
    fn test_same_timestamp() {
        let mut bucketizer = Bucketizer::new(&single_metric_config("v")).unwrap();
        bucketizer.ingest(&row(5., "v", 1.));
        bucketizer.ingest(&row(5., "v", 2.));
        assert_eq!(
            bucketizer.get("v").unwrap().points,
            vec![
                Point::new(T0 + 5000, Some(1.)),
                Point::new(T0 + 5000, Some(2.)),
            ]
        );
    }

    #[test]
    fn test_row_without_timestamp_is_skipped() {
        let mut bucketizer = Bucketizer::new(&Config::default()).unwrap();
        bucketizer.ingest(&row(0., "temperature", 10.));

        let skipped = Row::new(None).with_field("temperature", Some(11.));
        assert!(!bucketizer.ingest(&skipped));
        assert!(!bucketizer.ingest(&Row::new(Some(f64::NAN))));

        for track in bucketizer.tracks() {
            assert_eq!(track.series.len(), 1);
        }
        let stats = bucketizer.stats();
        assert_eq!(stats.rows, 3);
        assert_eq!(stats.skipped, 2);
    }

    #[test]
    fn test_out_of_range_timestamp_is_skipped() {
        let mut bucketizer = Bucketizer::new(&single_metric_config("v")).unwrap();
        assert!(bucketizer.ingest(&row(0., "v", 1.)));
        assert!(!bucketizer.ingest(&row(1e300, "v", 2.)));
        assert!(!bucketizer.ingest(&row(-1e300, "v", 3.)));
        assert!(bucketizer.ingest(&row(10., "v", 4.)));

        assert_eq!(
            bucketizer.get("v").unwrap().points,
            vec![Point::new(T0, Some(1.)), Point::new(T0 + 10_000, Some(4.))]
        );
        assert_eq!(bucketizer.stats().skipped, 2);
    }

    #[test]
    fn test_missing_field_yields_null_point() {
        let mut bucketizer = Bucketizer::new(&Config::default()).unwrap();
        let row = Row::new(Some(10.))
            .with_field("temperature", Some(20.))
            .with_field("eCO2", Some(400.));
        assert!(bucketizer.ingest(&row));

        assert_eq!(
            bucketizer.get("humidity").unwrap().points,
            vec![Point::new(T0 + 10_000, None)]
        );
        assert_eq!(
            bucketizer.get("eco2").unwrap().points,
            vec![Point::new(T0 + 10_000, Some(400.))]
        );
    }

    #[test]
    fn test_nan_value_passes_through() {
        let mut bucketizer = Bucketizer::new(&single_metric_config("v")).unwrap();
        bucketizer.ingest(&row(0., "v", f64::NAN));
        let value = bucketizer.get("v").unwrap().points[0].value;
        assert!(value.unwrap().is_nan());
    }

    #[test]
    fn test_ingest_is_deterministic() {
        let rows = [
            row(0., "temperature", 10.),
            Row::new(None),
            row(61., "temperature", 12.),
            row(500., "temperature", 13.),
            row(510., "temperature", 14.),
        ];

        let build = || {
            let mut bucketizer = Bucketizer::new(&Config::default()).unwrap();
            bucketizer.ingest_all(&rows);
            bucketizer.into_tracks()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_tracks_in_config_order() {
        let bucketizer = Bucketizer::new(&Config::default()).unwrap();
        let names: Vec<&str> = bucketizer
            .tracks()
            .map(|t| t.config.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["temperature", "pressure", "humidity", "tvoc", "eco2", "aqi"]
        );
    }

    #[test]
    fn test_invalid_config() {
        let config = Config {
            metrics: MetricList(vec![]),
            ..Default::default()
        };
        assert!(matches!(
            Bucketizer::new(&config).err(),
            Some(ConfigError::NoMetrics)
        ));
    }
}
