//! Maps incident counts to circle-marker radii.

/// Linear mapping from a count range onto a pixel radius range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerScale {
    /// Radius for the smallest count.
    pub out_min: f64,
    /// Radius for the largest count.
    pub out_max: f64,
}

impl Default for MarkerScale {
    fn default() -> Self {
        Self {
            out_min: 5.0,
            out_max: 30.0,
        }
    }
}

impl MarkerScale {
    #[must_use]
    pub const fn new(out_min: f64, out_max: f64) -> Self {
        Self { out_min, out_max }
    }

    /// Radius for `count` given the observed `min` and `max` counts.
    #[must_use]
    pub fn scale(&self, count: u64, min: u64, max: u64) -> f64 {
        scale(count, min, max, self.out_min, self.out_max)
    }
}

/// Linearly maps `count` from `[min, max]` onto `[out_min, out_max]`.
///
/// A degenerate range (`min == max`) maps to the midpoint of the output
/// range. Counts outside `[min, max]` are clamped to it first.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::suboptimal_flops)]
pub fn scale(count: u64, min: u64, max: u64, out_min: f64, out_max: f64) -> f64 {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    if lo == hi {
        return (out_min + out_max) / 2.0;
    }
    let count = count.clamp(lo, hi);
    let normalized = (count - lo) as f64 / (hi - lo) as f64;
    out_min + normalized * (out_max - out_min)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_range_maps_to_midpoint() {
        assert!((MarkerScale::default().scale(10, 5, 5) - 17.5).abs() < f64::EPSILON);
        assert!((MarkerScale::default().scale(1, 1, 1) - 17.5).abs() < f64::EPSILON);
    }

    #[test]
    fn endpoints_map_to_bounds() {
        let scale = MarkerScale::default();
        assert!((scale.scale(5, 5, 30) - 5.0).abs() < f64::EPSILON);
        assert!((scale.scale(30, 5, 30) - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn interpolates_linearly() {
        let radius = scale(50, 0, 100, 0.0, 10.0);
        assert!((radius - 5.0).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_counts_are_clamped() {
        let scale = MarkerScale::default();
        assert!((scale.scale(1, 5, 30) - 5.0).abs() < f64::EPSILON);
        assert!((scale.scale(500, 5, 30) - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn custom_bounds() {
        let scale = MarkerScale::new(2.0, 4.0);
        assert!((scale.scale(7, 7, 7) - 3.0).abs() < f64::EPSILON);
        assert!((scale.scale(9, 7, 9) - 4.0).abs() < f64::EPSILON);
    }
}
