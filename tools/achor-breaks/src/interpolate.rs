//! Midpoint interpolation of missing breaks
//!
//! Runs in passes. A pass sorts the current breaks descending, ranks the gaps
//! between neighbours by size and inserts one midpoint per gap, largest first,
//! until the target is reached. A list of `n` breaks grows to `2n - 1` per
//! full pass.

use crate::neighbors::{round_dp, VALUE_DECIMALS};

/// Gap between two consecutive sorted breaks
#[derive(Debug, Clone, Copy, PartialEq)]
struct Gap {
    width: f64,
    upper: f64,
    lower: f64,
}

fn ranked_gaps(sorted_desc: &[f64]) -> Vec<Gap> {
    let mut gaps: Vec<Gap> = sorted_desc
        .windows(2)
        .map(|w| Gap {
            width: w[0] - w[1],
            upper: w[0],
            lower: w[1],
        })
        .collect();
    // widest first, then by upper and lower bound
    gaps.sort_by(|a, b| {
        b.width
            .total_cmp(&a.width)
            .then(b.upper.total_cmp(&a.upper))
            .then(b.lower.total_cmp(&a.lower))
    });
    gaps
}

/// Extend `breaks` to `target` entries by midpoint insertion
///
/// Existing breaks keep their order; midpoints are appended. With fewer than
/// two breaks the `fences` (global value bounds) close the gap list but are
/// never emitted. Returns `breaks` unchanged when empty or already long
/// enough.
pub fn fill_breaks(breaks: &[f64], target: usize, fences: (f64, f64)) -> Vec<f64> {
    let mut out = breaks.to_vec();
    if out.is_empty() {
        return out;
    }

    while out.len() < target {
        let mut sorted = out.clone();
        if sorted.len() < 2 {
            sorted.push(fences.0);
            sorted.push(fences.1);
        }
        sorted.sort_by(|a, b| b.total_cmp(a));

        let gaps = ranked_gaps(&sorted);
        if gaps.is_empty() {
            break;
        }
        for gap in gaps {
            if out.len() >= target {
                break;
            }
            out.push(round_dp((gap.upper + gap.lower) / 2.0, VALUE_DECIMALS));
        }
    }
    out
}
