//! Significance-ranked pair selection
//!
//! Every method goes through the same steps: filter an anchor's pairs by the
//! method's predicate, keep the smallest qualifying contrast, order anchors,
//! cap. Only the predicate, the ordering sign and the cap differ.

use serde::Serialize;
use tracing::{debug, info};

use crate::labels::{Label, Labels};
use crate::method::Method;
use crate::neighbors::{NeighborGraph, NeighborPair};

/// Most pairs kept for the hotspot, neighbour, cluster and nested methods
pub const SELECTION_LIMIT: usize = 3000;

/// One anchor's representative contrast
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignificantPair {
    /// Feature index of the anchor
    pub anchor: usize,
    pub anchor_id: String,
    /// Minimal qualifying contrast; negative for the local-min method
    pub magnitude: f64,
    pub note: Label,
    /// Index of the underlying pair in [`NeighborGraph::pairs`]
    pub pair: usize,
}

impl SignificantPair {
    pub fn significance(&self) -> f64 {
        self.magnitude.abs()
    }
}

/// Which anchors a method considers and how it reads their pairs
struct Rule {
    method: Method,
    sweep: f64,
    limit: Option<usize>,
}

impl Rule {
    fn new(method: Method, sweep: f64) -> Self {
        let limit = match method {
            Method::LocalExtreme | Method::LocalMax | Method::LocalMin => None,
            _ => Some(SELECTION_LIMIT),
        };
        Self {
            method,
            sweep,
            limit,
        }
    }

    /// Label noted on the anchor's selected pair, `None` if not eligible
    fn note(&self, labels: &Labels, anchor: usize) -> Option<Label> {
        let held = labels.labels_of(anchor);
        match self.method {
            Method::LocalExtreme => held
                .iter()
                .copied()
                .find(|l| matches!(l, Label::LocalMax | Label::LocalMin)),
            Method::LocalMax => held.contains(&Label::LocalMax).then_some(Label::LocalMax),
            Method::LocalMin => held.contains(&Label::LocalMin).then_some(Label::LocalMin),
            Method::Hotspot => held
                .iter()
                .copied()
                .find(|l| matches!(l, Label::Hotspot | Label::Coldspot)),
            Method::Neighbor | Method::GlobalNeighbor => held
                .contains(&Label::NeighborContrast)
                .then_some(Label::NeighborContrast),
            Method::Cluster => Some(Label::ClusterBoundary),
            Method::Nested => Some(Label::NestedBoundary),
            Method::GlobalQuantile | Method::GlobalEqualInterval => None,
        }
    }

    fn accepts(&self, pair: &NeighborPair, labels: &Labels) -> bool {
        let d = pair.difference;
        match self.method {
            Method::LocalMax => d > self.sweep,
            // below the threshold, so weak negative contrasts still qualify
            Method::LocalMin => d < self.sweep,
            Method::Hotspot => d.abs() > self.sweep && !labels.is_labelled(pair.neighbor),
            Method::Cluster => {
                d.abs() > self.sweep
                    && matches!(
                        (&pair.center_category, &pair.neighbor_category),
                        (Some(a), Some(b)) if a != b
                    )
            }
            Method::Nested => {
                d.abs() > self.sweep
                    && matches!(
                        (&pair.center_category, &pair.neighbor_category),
                        (Some(a), Some(b)) if a == b
                    )
            }
            _ => d.abs() > self.sweep,
        }
    }

    fn signed(&self, min_abs: f64) -> f64 {
        match self.method {
            Method::LocalMin => -min_abs,
            _ => min_abs,
        }
    }

    /// Anchors in insertion order
    fn anchors(&self, graph: &NeighborGraph, labels: &Labels) -> Vec<usize> {
        match self.method {
            Method::Cluster | Method::Nested => (0..graph.feature_count()).collect(),
            _ => labels.labelled().to_vec(),
        }
    }
}

/// Select the significant pairs of a method
///
/// The result order defines segment lanes for the sweep.
pub fn select(
    graph: &NeighborGraph,
    labels: &Labels,
    method: Method,
    sweep: f64,
) -> Vec<SignificantPair> {
    let rule = Rule::new(method, sweep);
    let all = graph.pairs();
    let mut selected = Vec::new();

    for anchor in rule.anchors(graph, labels) {
        let Some(note) = rule.note(labels, anchor) else {
            continue;
        };

        // smallest qualifying |d|; strict `<` keeps the first pair among ties
        let mut best: Option<(usize, f64)> = None;
        for idx in graph.range_of(anchor) {
            let pair = &all[idx];
            if !rule.accepts(pair, labels) {
                continue;
            }
            let magnitude = pair.difference.abs();
            if best.map_or(true, |(_, m)| magnitude < m) {
                best = Some((idx, magnitude));
            }
        }

        if let Some((idx, min_abs)) = best {
            selected.push(SignificantPair {
                anchor,
                anchor_id: all[idx].center_id.clone(),
                magnitude: rule.signed(min_abs),
                note,
                pair: idx,
            });
        }
    }

    // stable: equal magnitudes keep anchor insertion order
    match method {
        Method::LocalMin => selected.sort_by(|a, b| a.magnitude.total_cmp(&b.magnitude)),
        _ => selected.sort_by(|a, b| b.magnitude.total_cmp(&a.magnitude)),
    }
    if let Some(limit) = rule.limit {
        selected.truncate(limit);
    }

    for pair in &selected {
        debug!(
            anchor = %pair.anchor_id,
            magnitude = pair.magnitude,
            note = ?pair.note,
            "significant pair"
        );
    }
    info!(method = %method, selected = selected.len(), "significant pairs selected");
    selected
}
