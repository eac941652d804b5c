//! End-to-end classification run
//!
//! validate → neighbour graph → labels → selection → line sweep, or the
//! global-extreme generator for methods 71–73.

use achor_common::{Error, Result};
use serde::Serialize;
use std::time::Instant;
use tracing::info;

use crate::config::ClassifyConfig;
use crate::features::FeatureSet;
use crate::global_extreme::global_breaks;
use crate::labels::Labels;
use crate::method::Method;
use crate::neighbors::{round_dp, NeighborGraph, VALUE_DECIMALS};
use crate::ranges::{class_ranges, ClassRange};
use crate::selection::select;
use crate::suggest::check_sweep;
use crate::sweep::{self, Segment, SweepConfig};

/// Why a run produced no breaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Shortfall {
    /// No two polygons with values intersect
    NoNeighborPairs,
    /// Pairs exist but none passed the method's selection
    NoSignificantPairs,
}

impl Shortfall {
    pub fn describe(self) -> &'static str {
        match self {
            Shortfall::NoNeighborPairs => "no intersecting polygons with values",
            Shortfall::NoSignificantPairs => {
                "no neighbour pair exceeds the sweep interval for this method"
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    Complete,
    /// Segments ran out; `filled` breaks were interpolated
    Interpolated { natural: usize, filled: usize },
    InsufficientData(Shortfall),
}

/// Counters collected along the run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStats {
    pub features: usize,
    pub skipped_features: usize,
    pub neighbor_pairs: usize,
    pub labelled: usize,
    pub significant_pairs: usize,
    pub segments: usize,
    pub natural_breaks: usize,
    pub residual_breaks: usize,
    pub interpolated_breaks: usize,
    pub sweep_passes: usize,
    pub elapsed_ms: u64,
}

/// Result of one classification run
#[derive(Debug, Clone, Serialize)]
pub struct Classification {
    pub method: Method,
    pub classes: usize,
    pub sweep: f64,
    /// Discovery order
    pub breaks: Vec<f64>,
    pub status: RunStatus,
    /// Global min and max of the attribute
    pub value_range: Option<(f64, f64)>,
    pub stats: RunStats,
}

impl Classification {
    fn insufficient(
        config: &ClassifyConfig,
        value_range: Option<(f64, f64)>,
        shortfall: Shortfall,
        stats: RunStats,
    ) -> Self {
        Self {
            method: config.method,
            classes: config.classes,
            sweep: config.sweep,
            breaks: Vec::new(),
            status: RunStatus::InsufficientData(shortfall),
            value_range,
            stats,
        }
    }

    /// Breaks in ascending order
    pub fn sorted_breaks(&self) -> Vec<f64> {
        let mut sorted = self.breaks.clone();
        sorted.sort_by(f64::total_cmp);
        sorted
    }

    /// Contiguous class ranges over the attribute's range
    pub fn ranges(&self) -> Vec<ClassRange> {
        match self.value_range {
            Some(bounds) => class_ranges(&self.sorted_breaks(), bounds),
            None => Vec::new(),
        }
    }

    pub fn is_insufficient(&self) -> bool {
        matches!(self.status, RunStatus::InsufficientData(_))
    }

    /// Turn an insufficient-data outcome into an error
    pub fn require_complete(self) -> Result<Self> {
        match self.status {
            RunStatus::InsufficientData(shortfall) => Err(Error::InsufficientData(format!(
                "{}: {}",
                self.method,
                shortfall.describe()
            ))),
            _ => Ok(self),
        }
    }
}

/// Classify a feature set
pub fn classify(features: &FeatureSet, config: &ClassifyConfig) -> Result<Classification> {
    let start = Instant::now();
    config.validate()?;

    let method = config.method;
    if method.requires_hotspot_bins() && !features.has_hotspot_bins() {
        return Err(Error::InvalidInput(format!(
            "{method} needs Getis-Ord bins but no feature carries one"
        )));
    }
    if method.requires_category() && !features.has_categories() {
        return Err(Error::InvalidInput(format!(
            "{method} needs a category field but no feature carries one"
        )));
    }

    let value_range = features
        .value_range()
        .map(|(lo, hi)| (round_dp(lo, VALUE_DECIMALS), round_dp(hi, VALUE_DECIMALS)));
    if let Some((lo, hi)) = value_range {
        check_sweep(hi - lo, config.sweep);
    }

    info!(
        method = %method,
        classes = config.classes,
        sweep = config.sweep,
        features = features.len(),
        "classification started"
    );

    let graph = NeighborGraph::build(features);
    let mut stats = RunStats {
        features: features.len(),
        skipped_features: graph.skipped(),
        neighbor_pairs: graph.len(),
        ..RunStats::default()
    };

    if graph.is_empty() {
        stats.elapsed_ms = start.elapsed().as_millis() as u64;
        let shortfall = Shortfall::NoNeighborPairs;
        return Ok(Classification::insufficient(config, value_range, shortfall, stats));
    }

    if method.is_global() {
        let global = global_breaks(
            features,
            &graph,
            method,
            config.classes,
            config.sweep,
            &config.budget,
        )?;
        let breaks = global.breaks();
        stats.natural_breaks = breaks.len();
        stats.elapsed_ms = start.elapsed().as_millis() as u64;
        info!(breaks = breaks.len(), elapsed_ms = stats.elapsed_ms, "classification finished");
        return Ok(Classification {
            method,
            classes: config.classes,
            sweep: config.sweep,
            breaks,
            status: RunStatus::Complete,
            value_range,
            stats,
        });
    }

    let labels = Labels::compute(&graph, features, method, config.sweep);
    let selected = select(&graph, &labels, method, config.sweep);
    stats.labelled = labels.len();
    stats.significant_pairs = selected.len();

    if selected.is_empty() {
        stats.elapsed_ms = start.elapsed().as_millis() as u64;
        let shortfall = Shortfall::NoSignificantPairs;
        return Ok(Classification::insufficient(config, value_range, shortfall, stats));
    }

    let segments = Segment::from_selection(&selected, &graph);
    stats.segments = segments.len();

    let fences = value_range.unwrap_or((0.0, 0.0));
    let sweep_config = SweepConfig {
        sweep: config.sweep,
        target: config.target_breaks(),
        fences,
    };
    let outcome = sweep::run(segments, &sweep_config, &config.budget)?;

    stats.natural_breaks = outcome.natural;
    stats.residual_breaks = outcome.residual;
    stats.interpolated_breaks = outcome.interpolated;
    stats.sweep_passes = outcome.passes;
    stats.elapsed_ms = start.elapsed().as_millis() as u64;

    let status = if outcome.breaks.is_empty() {
        RunStatus::InsufficientData(Shortfall::NoSignificantPairs)
    } else if outcome.interpolated > 0 {
        RunStatus::Interpolated {
            natural: outcome.natural + outcome.residual,
            filled: outcome.interpolated,
        }
    } else {
        RunStatus::Complete
    };

    info!(
        breaks = outcome.breaks.len(),
        status = ?status,
        elapsed_ms = stats.elapsed_ms,
        "classification finished"
    );

    Ok(Classification {
        method,
        classes: config.classes,
        sweep: config.sweep,
        breaks: outcome.breaks,
        status,
        value_range,
        stats,
    })
}
