//! Neighbour-pair graph over intersecting polygons
//!
//! Candidates come from an R-tree over polygon bounding boxes; only candidates
//! passing the exact `Intersects` test become pairs. Both directions of an
//! adjacency are recorded as separate pairs.

use geo::{BoundingRect, Centroid, Coord, Intersects};
use rayon::prelude::*;
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};
use std::ops::Range;
use tracing::{debug, info, warn};

use crate::features::FeatureSet;

/// Fractional digits kept for attribute values and differences
pub const VALUE_DECIMALS: i32 = 4;

/// Fractional digits kept for centroid distances
pub const DISTANCE_DECIMALS: i32 = 3;

/// Round half away from zero to `decimals` fractional digits
pub fn round_dp(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Directed pair of adjacent polygons
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborPair {
    /// Feature index of the center polygon
    pub center: usize,
    /// Feature index of the neighbouring polygon
    pub neighbor: usize,
    pub center_id: String,
    pub neighbor_id: String,
    pub center_val: f64,
    pub neighbor_val: f64,
    /// `center_val - neighbor_val`, rounded
    pub difference: f64,
    /// Centroid-to-centroid distance, rounded
    pub distance: f64,
    pub center_category: Option<String>,
    pub neighbor_category: Option<String>,
}

impl NeighborPair {
    /// Value interval spanned by the pair as `(lo, hi)`
    pub fn interval(&self) -> (f64, f64) {
        if self.center_val <= self.neighbor_val {
            (self.center_val, self.neighbor_val)
        } else {
            (self.neighbor_val, self.center_val)
        }
    }
}

/// Feature prepared for the candidate search
struct Prepared {
    idx: usize,
    value: f64,
    centroid: Coord<f64>,
}

type IndexedBox = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// All neighbour pairs of one run, grouped by center in feature order
#[derive(Debug, Clone, Default)]
pub struct NeighborGraph {
    pairs: Vec<NeighborPair>,
    /// Slice of `pairs` per feature index
    ranges: Vec<Range<usize>>,
    /// Features left out (null value or degenerate geometry)
    skipped: usize,
}

impl NeighborGraph {
    /// Build the neighbour graph of a feature set
    ///
    /// Features are scanned in parallel; pairs are merged back in feature order
    /// and each feature's candidates are visited in feature order, so the graph
    /// does not depend on R-tree layout or thread count.
    pub fn build(features: &FeatureSet) -> Self {
        let mut prepared = Vec::with_capacity(features.len());
        let mut boxes = Vec::with_capacity(features.len());
        let mut skipped = 0;

        for (idx, feature) in features.features().iter().enumerate() {
            let Some(value) = feature.value else {
                debug!(id = %feature.id, "null attribute value, feature skipped");
                skipped += 1;
                continue;
            };
            if !value.is_finite() {
                warn!(id = %feature.id, value, "non-finite attribute value, feature skipped");
                skipped += 1;
                continue;
            }
            let (Some(rect), Some(centroid)) = (
                feature.geometry.bounding_rect(),
                feature.geometry.centroid(),
            ) else {
                warn!(id = %feature.id, "degenerate geometry, feature skipped");
                skipped += 1;
                continue;
            };
            let (min, max) = (rect.min(), rect.max());
            if ![min.x, min.y, max.x, max.y].iter().all(|c| c.is_finite()) {
                warn!(id = %feature.id, "non-finite coordinates, feature skipped");
                skipped += 1;
                continue;
            }

            boxes.push(GeomWithData::new(
                Rectangle::from_corners([min.x, min.y], [max.x, max.y]),
                prepared.len(),
            ));
            prepared.push(Prepared {
                idx,
                value: round_dp(value, VALUE_DECIMALS),
                centroid: centroid.0,
            });
        }

        let tree: RTree<IndexedBox> = RTree::bulk_load(boxes);

        let per_feature: Vec<Vec<NeighborPair>> = prepared
            .par_iter()
            .enumerate()
            .map(|(pos, center)| neighbors_of(pos, center, &prepared, &tree, features))
            .collect();

        let mut pairs = Vec::with_capacity(per_feature.iter().map(Vec::len).sum());
        let mut ranges = vec![0..0; features.len()];
        for (center, found) in prepared.iter().zip(per_feature) {
            let start = pairs.len();
            pairs.extend(found);
            ranges[center.idx] = start..pairs.len();
        }

        info!(
            features = features.len(),
            skipped,
            pairs = pairs.len(),
            "neighbour graph built"
        );

        Self {
            pairs,
            ranges,
            skipped,
        }
    }

    pub fn pairs(&self) -> &[NeighborPair] {
        &self.pairs
    }

    /// Pairs whose center is `center`, in scan order
    pub fn pairs_of(&self, center: usize) -> &[NeighborPair] {
        match self.ranges.get(center) {
            Some(range) => &self.pairs[range.clone()],
            None => &[],
        }
    }

    /// Index range of `center`'s pairs inside [`pairs`](Self::pairs)
    pub fn range_of(&self, center: usize) -> Range<usize> {
        self.ranges.get(center).cloned().unwrap_or(0..0)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Number of feature slots (including skipped features)
    pub fn feature_count(&self) -> usize {
        self.ranges.len()
    }
}

/// Exact-intersection neighbours of one prepared feature
fn neighbors_of(
    pos: usize,
    center: &Prepared,
    prepared: &[Prepared],
    tree: &RTree<IndexedBox>,
    features: &FeatureSet,
) -> Vec<NeighborPair> {
    let all = features.features();
    let feature = &all[center.idx];
    let Some(rect) = feature.geometry.bounding_rect() else {
        return Vec::new();
    };
    let envelope = AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]);

    let mut candidates: Vec<usize> = tree
        .locate_in_envelope_intersecting(&envelope)
        .map(|entry| entry.data)
        .filter(|&other| other != pos)
        .collect();
    candidates.sort_unstable();

    let mut found = Vec::new();
    for other_pos in candidates {
        let other = &prepared[other_pos];
        let other_feature = &all[other.idx];
        if !feature.geometry.intersects(&other_feature.geometry) {
            continue;
        }

        let dx = center.centroid.x - other.centroid.x;
        let dy = center.centroid.y - other.centroid.y;

        found.push(NeighborPair {
            center: center.idx,
            neighbor: other.idx,
            center_id: feature.id.clone(),
            neighbor_id: other_feature.id.clone(),
            center_val: center.value,
            neighbor_val: other.value,
            difference: round_dp(center.value - other.value, VALUE_DECIMALS),
            distance: round_dp(dx.hypot(dy), DISTANCE_DECIMALS),
            center_category: feature.category.clone(),
            neighbor_category: other_feature.category.clone(),
        });
    }
    found
}
