mod dtw;

use ndarray::Array2;
use tracing::debug;

use crate::types::{AlignmentResult, FeatureSequence};

/// Dynamic time warping between two contours of the same kind.
#[derive(Debug, Default)]
pub struct SequenceAligner {}

impl SequenceAligner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulated |a - b| cost along the cheapest monotonic path.
    ///
    /// An empty side yields a distance of 0.
    pub fn align(&self, a: &FeatureSequence, b: &FeatureSequence) -> AlignmentResult {
        if a.is_empty() || b.is_empty() {
            return Self::degenerate(a, b);
        }
        let cost = dtw::cumulative_cost(a.values().view(), b.values().view());
        let result = Self::result(a, b, &cost);
        debug!(
            kind = %a.kind(),
            len_a = a.len(),
            len_b = b.len(),
            distance = result.distance,
            "aligned contours"
        );
        result
    }

    /// Same as [`SequenceAligner::align`], also returning the warping path as frame index pairs.
    pub fn align_with_path(
        &self,
        a: &FeatureSequence,
        b: &FeatureSequence,
    ) -> (AlignmentResult, Vec<(usize, usize)>) {
        if a.is_empty() || b.is_empty() {
            return (Self::degenerate(a, b), Vec::new());
        }
        let cost = dtw::cumulative_cost(a.values().view(), b.values().view());
        let result = Self::result(a, b, &cost);
        let path = dtw::backtrack(&cost);
        debug!(
            kind = %a.kind(),
            len_a = a.len(),
            len_b = b.len(),
            path = path.len(),
            distance = result.distance,
            "aligned contours"
        );
        (result, path)
    }

    fn degenerate(a: &FeatureSequence, b: &FeatureSequence) -> AlignmentResult {
        debug!(
            kind = %a.kind(),
            len_a = a.len(),
            len_b = b.len(),
            "empty contour, alignment distance is 0"
        );
        AlignmentResult::degenerate(a.len(), b.len())
    }

    fn result(a: &FeatureSequence, b: &FeatureSequence, cost: &Array2<f64>) -> AlignmentResult {
        AlignmentResult {
            distance: cost[[a.len(), b.len()]],
            len_a: a.len(),
            len_b: b.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FeatureKind;

    fn pitch(values: &[f64]) -> FeatureSequence {
        FeatureSequence::new(FeatureKind::Pitch, values.to_vec(), 100.0).unwrap()
    }

    #[test]
    fn time_stretch_costs_nothing() {
        let aligner = SequenceAligner::new();
        let result = aligner.align(&pitch(&[100.0, 200.0, 300.0]), &pitch(&[100.0, 100.0, 200.0, 300.0, 300.0]));
        assert_eq!(result.distance, 0.0);
        assert_eq!((result.len_a, result.len_b), (3, 5));
    }

    #[test]
    fn endpoints_are_fixed() {
        let aligner = SequenceAligner::new();
        let result = aligner.align(&pitch(&[0.0, 10.0]), &pitch(&[10.0]));
        assert_eq!(result.distance, 10.0);
    }

    #[test]
    fn distance_matches_path_variant() {
        let aligner = SequenceAligner::new();
        let a = pitch(&[100.0, 180.0, 150.0, 0.0, 120.0]);
        let b = pitch(&[110.0, 170.0, 0.0, 0.0, 125.0, 130.0]);
        let (with_path, path) = aligner.align_with_path(&a, &b);
        assert_eq!(aligner.align(&a, &b), with_path);
        assert_eq!(path.last(), Some(&(4, 5)));
    }

    #[test]
    fn empty_side_has_zero_distance() {
        let aligner = SequenceAligner::new();
        let (result, path) = aligner.align_with_path(&pitch(&[1.0, 2.0]), &pitch(&[]));
        assert_eq!(result, AlignmentResult::degenerate(2, 0));
        assert!(path.is_empty());
    }
}
