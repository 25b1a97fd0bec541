use crate::scoring::config::UnvoicedPolicy;

impl UnvoicedPolicy {
    /// Resolves undefined frames into the finite values placed in a contour.
    pub fn apply(self, frames: &[Option<f64>]) -> Vec<f64> {
        match self {
            UnvoicedPolicy::ZeroFill => frames.iter().map(|frame| frame.unwrap_or(0.0)).collect(),
            UnvoicedPolicy::Hold => hold(frames),
            UnvoicedPolicy::Skip => frames.iter().flatten().copied().collect(),
        }
    }
}

fn hold(frames: &[Option<f64>]) -> Vec<f64> {
    let mut filled = forward_fill(frames);
    backward_fill(&mut filled);
    filled
        .into_iter()
        .map(|value| value.unwrap_or(0.0))
        .collect()
}

fn forward_fill(frames: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut last = None;
    frames
        .iter()
        .map(|frame| {
            if frame.is_some() {
                last = *frame;
            }
            last
        })
        .collect()
}

// Only the leading gap is still empty after a forward fill.
fn backward_fill(values: &mut [Option<f64>]) {
    let mut next = None;
    for value in values.iter_mut().rev() {
        match value {
            Some(v) => next = Some(*v),
            None => *value = next,
        }
    }
}
