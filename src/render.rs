use crate::{bucketizer::Track, metric::Point};
use serde::Serialize;

pub const X_LABEL: &str = "Time";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightOptions {
    pub stroke_width: u32,
    pub stroke_border_width: u32,
    pub highlight_circle_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CrosshairDirection {
    Vertical,
    Horizontal,
    Both,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Crosshair {
    pub direction: CrosshairDirection,
}

/// Line rendering options shared by every chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartOptions {
    // Null points must break the line instead of being bridged.
    pub connect_separated_points: bool,
    pub gap_size: u32,
    pub draw_gap_edge_points: bool,
    pub highlight_circle_size: u32,
    pub stroke_width: u32,
    pub highlight_series_opts: HighlightOptions,
    // Cursor line drawn across the chart, in lockstep with synced charts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crosshair: Option<Crosshair>,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            connect_separated_points: false,
            gap_size: 1,
            draw_gap_edge_points: true,
            highlight_circle_size: 2,
            stroke_width: 1,
            highlight_series_opts: HighlightOptions {
                stroke_width: 2,
                stroke_border_width: 1,
                highlight_circle_size: 3,
            },
            crosshair: Some(Crosshair {
                direction: CrosshairDirection::Vertical,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub target: String,
    pub title: String,
    pub ylabel: String,
    pub xlabel: String,
    pub labels: [String; 2],
    pub colors: Vec<String>,
    #[serde(flatten)]
    pub options: ChartOptions,
    pub data: Vec<Point>,
}

impl ChartSpec {
    pub fn new(track: &Track, data: Vec<Point>) -> Self {
        let config = &track.config;
        Self {
            target: config.target().to_string(),
            title: config.title.clone(),
            ylabel: config.ylabel.clone(),
            xlabel: X_LABEL.to_string(),
            labels: [X_LABEL.to_string(), config.ylabel.clone()],
            colors: vec![config.color.clone()],
            options: ChartOptions::default(),
            data,
        }
    }
}

/// Charts panned and zoomed together along the time axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncGroup {
    pub targets: Vec<String>,
    // Whether the value axis is synchronized too.
    pub range: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub charts: Vec<ChartSpec>,
    pub sync: SyncGroup,
}

/// Optional inclusive time window, in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl TimeRange {
    fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

impl Dashboard {
    pub fn new(tracks: &[Track], range: TimeRange) -> Self {
        let charts: Vec<ChartSpec> = tracks
            .iter()
            .map(|track| {
                let data = match range.is_unbounded() {
                    true => track.series.points.clone(),
                    false => track.series.select(
                        range.start.unwrap_or(i64::MIN),
                        range.end.unwrap_or(i64::MAX),
                    ),
                };
                ChartSpec::new(track, data)
            })
            .collect();
        let sync = SyncGroup {
            targets: charts.iter().map(|c| c.target.clone()).collect(),
            range: false,
        };
        Self { charts, sync }
    }

    pub fn chart(&self, target: &str) -> Option<&ChartSpec> {
        self.charts.iter().find(|c| c.target == target)
    }

    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        match pretty {
            true => serde_json::to_string_pretty(self),
            false => serde_json::to_string(self),
        }
    }
}
