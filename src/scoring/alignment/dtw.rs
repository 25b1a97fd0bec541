use ndarray::{Array2, ArrayView1};

/// Cumulative cost matrix of shape `(n + 1, m + 1)`.
///
/// The border row and column are infinite except for the origin, so every
/// path starts at the first frame pair and finishes at the last one.
pub(super) fn cumulative_cost(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> Array2<f64> {
    let (n, m) = (a.len(), b.len());
    let mut cost = Array2::from_elem((n + 1, m + 1), f64::INFINITY);
    cost[[0, 0]] = 0.0;
    for i in 1..=n {
        for j in 1..=m {
            let local = (a[i - 1] - b[j - 1]).abs();
            let best = cost[[i - 1, j - 1]]
                .min(cost[[i - 1, j]])
                .min(cost[[i, j - 1]]);
            cost[[i, j]] = local + best;
        }
    }
    cost
}

/// Frame index pairs of the cheapest path, from `(0, 0)` to `(n - 1, m - 1)`.
///
/// Ties prefer the diagonal step.
pub(super) fn backtrack(cost: &Array2<f64>) -> Vec<(usize, usize)> {
    let (rows, cols) = cost.dim();
    if rows < 2 || cols < 2 {
        return Vec::new();
    }
    let (mut i, mut j) = (rows - 1, cols - 1);
    let mut path = Vec::with_capacity(rows + cols);
    loop {
        path.push((i - 1, j - 1));
        if i == 1 && j == 1 {
            break;
        }
        let diagonal = cost[[i - 1, j - 1]];
        let up = cost[[i - 1, j]];
        let left = cost[[i, j - 1]];
        if diagonal <= up && diagonal <= left {
            i -= 1;
            j -= 1;
        } else if up <= left {
            i -= 1;
        } else {
            j -= 1;
        }
    }
    path.reverse();
    path
}
