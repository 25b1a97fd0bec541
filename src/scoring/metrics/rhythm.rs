/// Ratio of the shorter to the longer duration, as a 0-100 score.
///
/// A zero or negative duration on either side scores 0.
pub fn compare_durations(a: f64, b: f64) -> f64 {
    let (shorter, longer) = if a <= b { (a, b) } else { (b, a) };
    if !(shorter > 0.0) || !longer.is_finite() {
        return 0.0;
    }
    (shorter / longer * 100.0).clamp(0.0, 100.0)
}
