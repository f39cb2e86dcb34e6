use crate::metric::Point;

pub struct GapPolicy {
    // Given the last point at time t, a new point at t' gets a gap
    // marker in front of it when t' - t > threshold.
    // A threshold of 0 marks every strictly increasing step as a gap.
    threshold: i64,
}

impl GapPolicy {
    pub fn new(threshold: i64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    /// Returns the marker to append before a point at `timestamp`, if any.
    /// The marker sits at `timestamp - diff`, i.e. on the previous point.
    pub fn marker(&self, last: Option<&Point>, timestamp: i64) -> Option<Point> {
        let last = last?;
        let is_gap = match timestamp.checked_sub(last.timestamp) {
            Some(diff) => diff > self.threshold,
            // Overflowing forward is larger than any threshold.
            None => timestamp > last.timestamp,
        };
        match is_gap {
            // timestamp - diff == last.timestamp
            true => Some(Point::gap(last.timestamp)),
            false => None,
        }
    }
}
