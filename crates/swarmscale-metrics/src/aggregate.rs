//! Window aggregation.

/// Statistic reported for a window that holds no samples.
///
/// It sits below any valid scale-down threshold, so an idle window drives
/// the fleet towards `min_instances`.
pub const EMPTY_WINDOW_MEAN: f64 = 0.0;

/// Arithmetic mean of the window, or [`EMPTY_WINDOW_MEAN`] if it is empty.
pub fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return EMPTY_WINDOW_MEAN;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}
