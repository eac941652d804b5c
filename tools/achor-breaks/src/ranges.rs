//! Class ranges for renderers

use serde::Serialize;

/// One contiguous value class
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassRange {
    pub lower: f64,
    pub upper: f64,
    /// `"{lower}_{upper}"`, the key graduated renderers use for a class
    pub label: String,
}

impl ClassRange {
    fn new(lower: f64, upper: f64) -> Self {
        Self {
            lower,
            upper,
            label: format!("{lower}_{upper}"),
        }
    }
}

/// Ranges from ascending breaks, bounded by the data range
///
/// `n` breaks give `n + 1` ranges. Breaks outside `bounds` are clamped so the
/// ranges stay contiguous.
pub fn class_ranges(sorted_breaks: &[f64], bounds: (f64, f64)) -> Vec<ClassRange> {
    let (min, max) = bounds;
    let mut ranges = Vec::with_capacity(sorted_breaks.len() + 1);
    let mut lower = min;
    for &b in sorted_breaks {
        let upper = b.clamp(min, max.max(min));
        ranges.push(ClassRange::new(lower, upper));
        lower = upper;
    }
    ranges.push(ClassRange::new(lower, max.max(lower)));
    ranges
}
