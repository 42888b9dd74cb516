//! 3×3 spatial energy attribution.

use mova_models::{round_dp, ZoneLabel, ZoneSnapshot};
use ndarray::{s, ArrayBase, Data, Ix2};

/// Share of energy in each ninth of `grid`, in percent to one decimal.
///
/// Rows and columns are split at `dim / 3` and `2 * dim / 3`; the last
/// third absorbs the remainder. Every share is exactly 0.0 when the grid
/// holds no energy.
pub fn zones<S, A>(grid: &ArrayBase<S, Ix2>) -> ZoneSnapshot
where
    S: Data<Elem = A>,
    A: Copy + Into<f64>,
{
    let (rows, cols) = grid.dim();
    let row_bounds = thirds(rows);
    let col_bounds = thirds(cols);

    let mut sums = [0.0f64; 9];
    for (r, &(r0, r1)) in row_bounds.iter().enumerate() {
        for (c, &(c0, c1)) in col_bounds.iter().enumerate() {
            sums[r * 3 + c] = grid
                .slice(s![r0..r1, c0..c1])
                .iter()
                .map(|&v| Into::<f64>::into(v))
                .sum();
        }
    }

    let total: f64 = sums.iter().sum();
    let mut snapshot = ZoneSnapshot::default();
    if total <= 0.0 {
        return snapshot;
    }

    for (i, sum) in sums.iter().enumerate() {
        if let Some(label) = ZoneLabel::from_grid(i / 3, i % 3) {
            snapshot.set(label, round_dp(sum / total * 100.0, 1));
        }
    }
    snapshot
}

/// `[0, d/3)`, `[d/3, 2d/3)`, `[2d/3, d)` with integer division.
fn thirds(dim: usize) -> [(usize, usize); 3] {
    let third = dim / 3;
    [(0, third), (third, 2 * third), (2 * third, dim)]
}
