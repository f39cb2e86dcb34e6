use crate::{
    bucketizer::{Bucketizer, IngestStats},
    config::{Config, ConfigError},
    render::{Dashboard, TimeRange},
    source::{CsvRowReader, SourceError},
};
use log::info;
use std::io::Read;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("error validating config")]
    InvalidConfig(#[from] ConfigError),
    #[error("failed to read rows from source")]
    Source(#[from] SourceError),
}

pub struct Output {
    pub dashboard: Dashboard,
    pub stats: IngestStats,
}

/// Streams every row of a CSV document through a bucketizer and, once the
/// stream is exhausted, builds the dashboard handed to the chart widget.
pub fn run<R: Read>(
    readable: R,
    config: &Config,
    range: TimeRange,
) -> Result<Output, PipelineError> {
    let mut bucketizer = Bucketizer::new(config)?;
    let rows = CsvRowReader::with_timestamp_field(readable, config.timestamp_field.as_ref());
    for row in rows {
        bucketizer.ingest(&row?);
    }

    let stats = bucketizer.stats();
    for track in bucketizer.tracks() {
        info!(
            "{}: {} points, {} gaps",
            track.config.name,
            track.series.len(),
            track.gaps
        );
    }
    info!(
        "ingested {} rows, skipped {} without timestamp",
        stats.rows - stats.skipped,
        stats.skipped
    );

    let tracks = bucketizer.into_tracks();
    Ok(Output {
        dashboard: Dashboard::new(&tracks, range),
        stats,
    })
}

#[cfg(test)]
pub mod tests {
    use crate::{
        config::{Config, MetricList},
        metric::Point,
        render::TimeRange,
    };

    use super::{run, PipelineError};

    const T0: i64 = 946_684_800_000;

    #[test]
    fn test_run() {
        let data = "timestamp,temperature,pressure,relative_humidity,aqi,tvoc,eCO2\n\
                    0,10,1000,40,1,50,400\n\
                    ,11,1000,40,1,50,400\n\
                    61,12,1001,,1,51,410\n";
        let output = run(data.as_bytes(), &Config::default(), TimeRange::default()).unwrap();

        assert_eq!(output.stats.rows, 3);
        assert_eq!(output.stats.skipped, 1);
        assert_eq!(
            output.dashboard.chart("temperature").unwrap().data,
            vec![
                Point::new(T0, Some(10.)),
                Point::gap(T0),
                Point::new(T0 + 61_000, Some(12.)),
            ]
        );
        assert_eq!(
            output.dashboard.chart("humidity").unwrap().data,
            vec![
                Point::new(T0, Some(40.)),
                Point::gap(T0),
                Point::new(T0 + 61_000, None),
            ]
        );
        assert_eq!(
            output.dashboard.chart("eco2").unwrap().data[2],
            Point::new(T0 + 61_000, Some(410.))
        );
    }

    #[test]
    fn test_run_huge_timestamps() {
        let data = "timestamp,temperature\n1e300,1\n-1e300,2\n1e300,3\n61,4\n";
        let output = run(data.as_bytes(), &Config::default(), TimeRange::default()).unwrap();
        assert_eq!(output.stats.rows, 4);
        assert_eq!(output.stats.skipped, 3);
        assert_eq!(
            output.dashboard.chart("temperature").unwrap().data,
            vec![Point::new(T0 + 61_000, Some(4.))]
        );
    }

    #[test]
    fn test_run_invalid_config() {
        let config = Config {
            metrics: MetricList(vec![]),
            ..Default::default()
        };
        let result = run("timestamp\n1\n".as_bytes(), &config, TimeRange::default());
        assert!(matches!(result.err(), Some(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn test_run_source_error() {
        let data: &[u8] = b"timestamp,temperature\n1,\xff\n";
        let result = run(data, &Config::default(), TimeRange::default());
        assert!(matches!(result.err(), Some(PipelineError::Source(_))));
    }
}
