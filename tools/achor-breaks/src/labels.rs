//! Per-feature spatial significance labels
//!
//! The local-extreme scan is a single pass over a feature's pairs in scan
//! order. It is order dependent: a later neighbour can reset a candidate that
//! an earlier neighbour raised.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::features::FeatureSet;
use crate::method::Method;
use crate::neighbors::{NeighborGraph, NeighborPair};

/// Most anchors kept for the neighbour-contrast methods
pub const NEIGHBOR_LABEL_LIMIT: usize = 500;

/// Getis-Ord bin marking a 99% confidence hot spot
pub const HOTSPOT_BIN: i32 = 3;

/// Getis-Ord bin marking a 99% confidence cold spot
pub const COLDSPOT_BIN: i32 = -3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Label {
    None,
    LocalMax,
    LocalMin,
    Hotspot,
    Coldspot,
    ClusterBoundary,
    NestedBoundary,
    NeighborContrast,
}

/// Outcome of the local-extreme scan for one center
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtremeScan {
    pub local_max: bool,
    pub local_min: bool,
}

/// Run the local-extreme scan over one center's pairs
pub fn scan_local_extreme(center_val: f64, pairs: &[NeighborPair]) -> ExtremeScan {
    let mut maxval = center_val;
    let mut minval = center_val;
    let mut max_hits = 0u32;
    let mut min_hits = 0u32;
    let mut candidate = false;

    for pair in pairs {
        let diff = pair.difference;
        let neighbor = pair.neighbor_val;

        if diff <= 0.0 && neighbor >= maxval {
            candidate = false;
            maxval = neighbor;
            max_hits = 0;
        }
        if diff >= 0.0 && neighbor <= minval {
            candidate = false;
            minval = neighbor;
            min_hits = 0;
        }
        if diff > 0.0 && center_val > neighbor && center_val >= maxval {
            candidate = true;
            maxval = center_val;
            max_hits += 1;
        }
        if diff < 0.0 && center_val < neighbor && center_val <= minval {
            candidate = true;
            minval = center_val;
            min_hits += 1;
        }
    }

    ExtremeScan {
        local_max: candidate && maxval >= center_val && min_hits == 0,
        local_min: candidate && minval <= center_val && max_hits == 0,
    }
}

/// Labels for every feature of one run
#[derive(Debug, Clone, Default)]
pub struct Labels {
    per_feature: Vec<Vec<Label>>,
    /// Labelled feature indices in insertion order
    order: Vec<usize>,
}

impl Labels {
    /// Compute the labels a method needs
    ///
    /// Cluster and nested methods get no per-feature labels; they are decided
    /// pairwise during selection.
    pub fn compute(
        graph: &NeighborGraph,
        features: &FeatureSet,
        method: Method,
        sweep: f64,
    ) -> Self {
        let mut labels = Self {
            per_feature: vec![Vec::new(); features.len()],
            order: Vec::new(),
        };

        match method {
            Method::LocalExtreme | Method::LocalMax | Method::LocalMin => {
                for center in 0..features.len() {
                    let pairs = graph.pairs_of(center);
                    let Some(first) = pairs.first() else {
                        continue;
                    };
                    let scan = scan_local_extreme(first.center_val, pairs);
                    if scan.local_max {
                        labels.push(center, Label::LocalMax);
                    }
                    if scan.local_min {
                        labels.push(center, Label::LocalMin);
                    }
                }
            }
            Method::Hotspot => {
                for (idx, feature) in features.features().iter().enumerate() {
                    // features left out of the graph cannot anchor a pair
                    if graph.pairs_of(idx).is_empty() {
                        continue;
                    }
                    match feature.hotspot_bin {
                        Some(HOTSPOT_BIN) => labels.push(idx, Label::Hotspot),
                        Some(COLDSPOT_BIN) => labels.push(idx, Label::Coldspot),
                        _ => {}
                    }
                }
            }
            Method::Neighbor | Method::GlobalNeighbor => {
                let mut contrasts: Vec<(usize, f64)> = (0..features.len())
                    .filter_map(|center| {
                        graph
                            .pairs_of(center)
                            .iter()
                            .map(|p| p.difference.abs())
                            .filter(|d| *d > sweep)
                            .reduce(f64::max)
                            .map(|strongest| (center, strongest))
                    })
                    .collect();
                contrasts.sort_by(|a, b| b.1.total_cmp(&a.1));
                contrasts.truncate(NEIGHBOR_LABEL_LIMIT);
                for (center, _) in contrasts {
                    labels.push(center, Label::NeighborContrast);
                }
            }
            Method::Cluster
            | Method::Nested
            | Method::GlobalQuantile
            | Method::GlobalEqualInterval => {}
        }

        info!(method = %method, labelled = labels.len(), "labels computed");
        labels
    }

    fn push(&mut self, idx: usize, label: Label) {
        let slot = &mut self.per_feature[idx];
        if slot.is_empty() {
            self.order.push(idx);
        }
        if !slot.contains(&label) {
            slot.push(label);
        }
    }

    /// Labels of a feature; empty means [`Label::None`]
    pub fn labels_of(&self, idx: usize) -> &[Label] {
        self.per_feature.get(idx).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, idx: usize, label: Label) -> bool {
        if label == Label::None {
            return self.labels_of(idx).is_empty();
        }
        self.labels_of(idx).contains(&label)
    }

    pub fn is_labelled(&self, idx: usize) -> bool {
        !self.labels_of(idx).is_empty()
    }

    pub fn labelled(&self) -> &[usize] {
        &self.order
    }

    /// Number of labelled features
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::Feature;
    use geo::{polygon, Polygon};

    fn pair(center_val: f64, neighbor_val: f64) -> NeighborPair {
        NeighborPair {
            center: 0,
            neighbor: 1,
            center_id: "c".into(),
            neighbor_id: "n".into(),
            center_val,
            neighbor_val,
            difference: center_val - neighbor_val,
            distance: 1.0,
            center_category: None,
            neighbor_category: None,
        }
    }

    fn square(x: f64, y: f64) -> Polygon<f64> {
        polygon![
            (x: x, y: y),
            (x: x + 1.0, y: y),
            (x: x + 1.0, y: y + 1.0),
            (x: x, y: y + 1.0),
        ]
    }

    /// Three mutually touching squares in an L around (1, 1)
    fn triangle_of_squares(values: [f64; 3]) -> FeatureSet {
        FeatureSet::new(vec![
            Feature::new("A", Some(values[0]), square(0.0, 0.0)),
            Feature::new("B", Some(values[1]), square(1.0, 0.0)),
            Feature::new("C", Some(values[2]), square(0.0, 1.0)),
        ])
        .unwrap()
    }

    #[test]
    fn test_strict_maximum_is_local_max() {
        let scan = scan_local_extreme(10.0, &[pair(10.0, 3.0), pair(10.0, 8.0), pair(10.0, 9.5)]);
        assert!(scan.local_max);
        assert!(!scan.local_min);
    }

    #[test]
    fn test_strict_minimum_is_local_min() {
        let scan = scan_local_extreme(1.0, &[pair(1.0, 3.0), pair(1.0, 2.0)]);
        assert!(scan.local_min);
        assert!(!scan.local_max);
    }

    #[test]
    fn test_higher_neighbour_resets_candidate() {
        let scan = scan_local_extreme(5.0, &[pair(5.0, 4.0), pair(5.0, 6.0)]);
        assert_eq!(scan, ExtremeScan::default());
    }

    #[test]
    fn test_mixed_neighbourhood_is_order_dependent() {
        // a reset by the last neighbour wins over earlier candidates
        let scan = scan_local_extreme(5.0, &[pair(5.0, 6.0), pair(5.0, 4.0)]);
        assert!(!scan.local_max);
        assert!(!scan.local_min);
        let scan = scan_local_extreme(5.0, &[pair(5.0, 4.0), pair(5.0, 6.0), pair(5.0, 3.0)]);
        assert!(!scan.local_max);
    }

    #[test]
    fn test_equal_neighbour_never_labels() {
        let scan = scan_local_extreme(5.0, &[pair(5.0, 5.0)]);
        assert_eq!(scan, ExtremeScan::default());
    }

    #[test]
    fn test_three_polygon_labels() {
        let set = triangle_of_squares([10.0, 7.0, 12.0]);
        let graph = NeighborGraph::build(&set);
        let labels = Labels::compute(&graph, &set, Method::LocalExtreme, 1.0);

        assert!(labels.has(0, Label::None));
        assert_eq!(labels.labels_of(1), &[Label::LocalMin]);
        assert_eq!(labels.labels_of(2), &[Label::LocalMax]);
        assert_eq!(labels.labelled(), &[1, 2]);
    }

    #[test]
    fn test_hotspot_bins() {
        let set = FeatureSet::new(vec![
            Feature::new("a", Some(1.0), square(0.0, 0.0)).with_hotspot_bin(3),
            Feature::new("b", Some(2.0), square(1.0, 0.0)).with_hotspot_bin(2),
            Feature::new("c", Some(3.0), square(2.0, 0.0)).with_hotspot_bin(-3),
        ])
        .unwrap();
        let graph = NeighborGraph::build(&set);
        let labels = Labels::compute(&graph, &set, Method::Hotspot, 0.5);
        assert!(labels.has(0, Label::Hotspot));
        assert!(!labels.is_labelled(1));
        assert!(labels.has(2, Label::Coldspot));
    }

    #[test]
    fn test_neighbor_contrast_ranked_by_strongest_pair() {
        let set = triangle_of_squares([10.0, 7.0, 12.0]);
        let graph = NeighborGraph::build(&set);
        let labels = Labels::compute(&graph, &set, Method::Neighbor, 2.5);
        // A: max |d| 3, B: 5, C: 5 ; all above 2.5
        assert_eq!(labels.labelled(), &[1, 2, 0]);
        assert!(labels.has(0, Label::NeighborContrast));

        let strict = Labels::compute(&graph, &set, Method::Neighbor, 4.0);
        assert_eq!(strict.labelled(), &[1, 2]);
    }

    #[test]
    fn test_cluster_methods_have_no_labels() {
        let set = triangle_of_squares([10.0, 7.0, 12.0]);
        let graph = NeighborGraph::build(&set);
        assert!(Labels::compute(&graph, &set, Method::Cluster, 1.0).is_empty());
        assert!(Labels::compute(&graph, &set, Method::Nested, 1.0).is_empty());
    }
}
