use sensorgraph::{Bucketizer, Config, Row};

fn main() -> Result<(), sensorgraph::config::ConfigError> {
    let mut bucketizer = Bucketizer::new(&Config::default())?;

    let ts = 782_000_000.;
    let offsets = [0., 10., 20., 300., 310.];
    for (i, offset) in offsets.iter().enumerate() {
        let row = Row::new(Some(ts + offset))
            .with_field("temperature", Some(20.0 + i as f64))
            .with_field("relative_humidity", Some(40.0));
        bucketizer.ingest(&row);
    }

    for track in bucketizer.tracks() {
        println!(
            "{}: {} points, {} gaps",
            track.config.name,
            track.series.len(),
            track.gaps
        );
    }
    if let Some(series) = bucketizer.get("temperature") {
        for point in &series.points {
            match (point.datetime(), point.value) {
                (Some(t), Some(v)) => println!("{} {}", t.to_rfc3339(), v),
                (Some(t), None) => println!("{} -", t.to_rfc3339()),
                _ => {}
            }
        }
    }
    Ok(())
}
