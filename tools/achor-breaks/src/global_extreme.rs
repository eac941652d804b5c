//! Global-extreme breaks
//!
//! Two breaks separate the global minimum and maximum from their closest
//! neighbouring values; the interior between them is cut by quantiles, equal
//! intervals or a line sweep over strong neighbour contrasts.

use achor_common::{Error, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::features::FeatureSet;
use crate::labels::Labels;
use crate::method::Method;
use crate::neighbors::{round_dp, NeighborGraph, NeighborPair, VALUE_DECIMALS};
use crate::selection::select;
use crate::sweep::{self, Segment, SweepBudget, SweepConfig};

/// How the interior breaks were produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InteriorSource {
    /// No interior breaks requested
    None,
    Quantile,
    EqualInterval,
    /// Line sweep over neighbour contrasts
    NeighborSweep,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalBreaks {
    pub break_min: f64,
    pub break_max: f64,
    /// Ascending for quantile and equal interval, discovery order for the sweep
    pub interior: Vec<f64>,
    pub source: InteriorSource,
}

impl GlobalBreaks {
    /// Break list in discovery order: both extremes first, then the interior
    pub fn breaks(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.interior.len() + 2);
        out.push(self.break_min);
        out.push(self.break_max);
        out.extend_from_slice(&self.interior);
        out
    }
}

/// Which extreme to separate
#[derive(Clone, Copy)]
enum Side {
    Min,
    Max,
}

/// Break next to one global extreme
fn extreme_break(graph: &NeighborGraph, distinct: &[f64], side: Side) -> f64 {
    let pairs = graph.pairs();
    let extreme = match side {
        Side::Min => distinct.first(),
        Side::Max => distinct.last(),
    };
    let Some(&extreme) = extreme else {
        return 0.0;
    };

    // first feature at the extreme, in feature order
    let center = pairs
        .iter()
        .find(|p| p.center_val == extreme)
        .map(|p| p.center);

    let closest = center.and_then(|c| {
        graph
            .pairs_of(c)
            .iter()
            .filter(|p| p.difference != 0.0)
            .fold(None::<&NeighborPair>, |best, p| match best {
                Some(b) if b.difference.abs() <= p.difference.abs() => Some(b),
                _ => Some(p),
            })
            .map(|p| p.neighbor_val)
    });

    let partner = closest.or_else(|| match side {
        Side::Min => distinct.get(1).copied(),
        Side::Max => distinct.len().checked_sub(2).and_then(|i| distinct.get(i)).copied(),
    });

    match partner {
        Some(value) => round_dp((extreme + value) / 2.0, VALUE_DECIMALS),
        None => extreme,
    }
}

/// Type-7 empirical quantile of ascending `sorted` at `q` in `[0, 1]`
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = (sorted.len() - 1) as f64 * q;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let (a, b) = (sorted[lo], sorted[hi.min(sorted.len() - 1)]);
    Some(a + (pos - lo as f64) * (b - a))
}

/// `parts - 1` cut points splitting `sorted` into equal-frequency parts
pub fn quantile_cuts(sorted: &[f64], parts: usize) -> Vec<f64> {
    (1..parts)
        .filter_map(|i| quantile(sorted, i as f64 / parts as f64))
        .map(|v| round_dp(v, VALUE_DECIMALS))
        .collect()
}

/// `parts - 1` equidistant cut points strictly between `lo` and `hi`
pub fn equal_interval_cuts(lo: f64, hi: f64, parts: usize) -> Vec<f64> {
    let width = (hi - lo) / parts as f64;
    (1..parts)
        .map(|i| round_dp(lo + i as f64 * width, VALUE_DECIMALS))
        .collect()
}

/// Compute the extreme breaks and their interior for one of the global methods
pub fn global_breaks(
    features: &FeatureSet,
    graph: &NeighborGraph,
    method: Method,
    classes: usize,
    sweep_interval: f64,
    budget: &SweepBudget,
) -> Result<GlobalBreaks> {
    if !method.is_global() {
        return Err(Error::InvalidInput(format!("{method} is not a global-extreme method")));
    }
    if classes < 3 {
        return Err(Error::InvalidInput(format!(
            "{method} needs at least 3 classes, got {classes}"
        )));
    }
    if graph.is_empty() {
        return Err(Error::InsufficientData("no neighbour pairs".into()));
    }

    let mut distinct: Vec<f64> = graph.pairs().iter().map(|p| p.center_val).collect();
    distinct.sort_by(f64::total_cmp);
    distinct.dedup();

    let break_min = extreme_break(graph, &distinct, Side::Min);
    let break_max = extreme_break(graph, &distinct, Side::Max);
    debug!(break_min, break_max, "extreme breaks");

    // classes - 2 sub-classes between the extreme breaks
    let parts = classes - 2;
    let wanted = parts - 1;

    let (interior, source) = if wanted == 0 {
        (Vec::new(), InteriorSource::None)
    } else {
        match method {
            Method::GlobalQuantile => {
                let inner: &[f64] = if distinct.len() > 2 {
                    &distinct[1..distinct.len() - 1]
                } else {
                    &[]
                };
                if inner.is_empty() {
                    (equal_interval_cuts(break_min, break_max, parts), InteriorSource::EqualInterval)
                } else {
                    (quantile_cuts(inner, parts), InteriorSource::Quantile)
                }
            }
            Method::GlobalNeighbor => {
                let labels = Labels::compute(graph, features, method, sweep_interval);
                let selected = select(graph, &labels, method, sweep_interval);
                let segments: Vec<Segment> = Segment::from_selection(&selected, graph)
                    .into_iter()
                    .filter(|s| s.lo >= break_min && s.hi <= break_max)
                    .collect();
                let config = SweepConfig {
                    sweep: sweep_interval,
                    target: wanted,
                    fences: (break_min, break_max),
                };
                let outcome = sweep::run(segments, &config, budget)?;
                if outcome.breaks.is_empty() {
                    (equal_interval_cuts(break_min, break_max, parts), InteriorSource::EqualInterval)
                } else {
                    (outcome.breaks, InteriorSource::NeighborSweep)
                }
            }
            _ => (equal_interval_cuts(break_min, break_max, parts), InteriorSource::EqualInterval),
        }
    };

    info!(
        method = %method,
        break_min,
        break_max,
        interior = interior.len(),
        "global extreme breaks computed"
    );

    Ok(GlobalBreaks {
        break_min,
        break_max,
        interior,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::Feature;
    use geo::{polygon, Polygon};

    fn square(x: f64, y: f64) -> Polygon<f64> {
        polygon![
            (x: x, y: y),
            (x: x + 1.0, y: y),
            (x: x + 1.0, y: y + 1.0),
            (x: x, y: y + 1.0),
        ]
    }

    /// Row of unit squares with the given values
    fn row(values: &[f64]) -> FeatureSet {
        FeatureSet::new(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| Feature::new(format!("f{i}"), Some(*v), square(i as f64, 0.0)))
                .collect(),
        )
        .unwrap()
    }

    fn breaks_for(values: &[f64], method: Method, classes: usize) -> GlobalBreaks {
        let set = row(values);
        let graph = NeighborGraph::build(&set);
        global_breaks(&set, &graph, method, classes, 1.0, &SweepBudget::default()).unwrap()
    }

    #[test]
    fn test_quantile_formula() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quantile(&sorted, 0.0), Some(1.0));
        assert_eq!(quantile(&sorted, 0.5), Some(3.0));
        let q30 = quantile(&sorted, 0.3).unwrap();
        assert!((q30 - 2.2).abs() < 1e-9, "{q30}");
        assert_eq!(quantile(&sorted, 1.0), Some(5.0));
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn test_equal_interval_cuts() {
        assert_eq!(equal_interval_cuts(0.0, 10.0, 4), vec![2.5, 5.0, 7.5]);
        assert!(equal_interval_cuts(0.0, 10.0, 1).is_empty());
    }

    #[test]
    fn test_extremes_use_closest_neighbour() {
        let result = breaks_for(&[1.0, 2.0, 5.0, 9.0, 10.0], Method::GlobalEqualInterval, 3);
        assert_eq!(result.break_min, 1.5);
        assert_eq!(result.break_max, 9.5);
        assert!(result.interior.is_empty());
        assert_eq!(result.source, InteriorSource::None);
        assert_eq!(result.breaks(), vec![1.5, 9.5]);
    }

    #[test]
    fn test_flat_neighbourhood_falls_back_to_next_value() {
        // the minimum only touches an equal value
        let result = breaks_for(&[1.0, 1.0, 4.0, 8.0], Method::GlobalEqualInterval, 3);
        assert_eq!(result.break_min, 2.5);
        assert_eq!(result.break_max, 6.0);
    }

    #[test]
    fn test_equal_interval_interior() {
        let result = breaks_for(&[0.0, 1.0, 5.0, 9.0, 10.0], Method::GlobalEqualInterval, 6);
        assert_eq!(result.break_min, 0.5);
        assert_eq!(result.break_max, 9.5);
        assert_eq!(result.interior, vec![2.75, 5.0, 7.25]);
        assert_eq!(result.breaks().len(), 5);
    }

    #[test]
    fn test_quantile_interior() {
        let values: Vec<f64> = (1..=11).map(f64::from).collect();
        let result = breaks_for(&values, Method::GlobalQuantile, 4);
        // interior values 2..=10, two sub-classes cut at the median
        assert_eq!(result.interior, vec![6.0]);
        assert_eq!(result.source, InteriorSource::Quantile);
    }

    #[test]
    fn test_quantile_without_interior_values() {
        let result = breaks_for(&[0.0, 10.0, 0.0, 10.0], Method::GlobalQuantile, 4);
        assert_eq!(result.source, InteriorSource::EqualInterval);
        assert_eq!(result.interior, vec![5.0]);
    }

    #[test]
    fn test_neighbour_sweep_interior() {
        let result = breaks_for(&[0.0, 1.0, 2.0, 8.0, 9.0, 10.0], Method::GlobalNeighbor, 4);
        assert_eq!(result.break_min, 0.5);
        assert_eq!(result.break_max, 9.5);
        assert_eq!(result.source, InteriorSource::NeighborSweep);
        assert_eq!(result.interior.len(), 1);
        assert!(result.interior[0] >= 2.0 && result.interior[0] <= 8.0);
    }

    #[test]
    fn test_requires_three_classes() {
        let set = row(&[1.0, 2.0]);
        let graph = NeighborGraph::build(&set);
        let err = global_breaks(&set, &graph, Method::GlobalQuantile, 2, 1.0, &SweepBudget::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
