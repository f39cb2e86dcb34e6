pub mod bucketizer;
pub mod config;
pub mod pipeline;
pub mod render;
pub mod source;

pub use bucketizer::Bucketizer;
pub use config::{Config, MetricConfig, TimeConfig, TimeUnit};
pub use metric::{MetricSeries, Point, Row};
pub use render::{Dashboard, TimeRange};
pub use source::CsvRowReader;

mod gap;
mod metric;
