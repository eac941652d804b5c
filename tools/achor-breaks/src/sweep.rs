//! Line-sweep break extraction
//!
//! Each selected pair becomes a closed value interval on its own lane. The
//! engine samples the value axis at the sweep interval, takes the position
//! stabbing the most intervals as a break, drops the intervals it consumed and
//! repeats until enough breaks exist or no intervals remain.

use achor_common::{Error, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

use crate::interpolate::fill_breaks;
use crate::neighbors::{round_dp, NeighborGraph, VALUE_DECIMALS};
use crate::selection::SignificantPair;

/// Default bound on sweep samples per pass
pub const DEFAULT_MAX_STEPS: u64 = 1_000_000;

/// Value interval of one significant pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub id: usize,
    /// Insertion order of the pair
    pub lane: usize,
    pub lo: f64,
    pub hi: f64,
    pub significance: f64,
}

impl Segment {
    /// Segments of a selection, one lane per pair in selection order
    pub fn from_selection(selected: &[SignificantPair], graph: &NeighborGraph) -> Vec<Segment> {
        selected
            .iter()
            .enumerate()
            .filter_map(|(lane, sp)| {
                let (lo, hi) = graph.pairs().get(sp.pair)?.interval();
                Some(Segment {
                    id: sp.pair,
                    lane,
                    lo,
                    hi,
                    significance: sp.significance(),
                })
            })
            .collect()
    }

    /// Closed containment `lo <= p <= hi`
    pub fn contains(&self, position: f64) -> bool {
        self.lo <= position && position <= self.hi
    }
}

/// Resource bounds of one sweep run
#[derive(Debug, Clone)]
pub struct SweepBudget {
    /// Most samples a single pass may take
    pub max_steps: u64,
    pub deadline: Option<Instant>,
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for SweepBudget {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            deadline: None,
            cancel: None,
        }
    }
}

impl SweepBudget {
    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Deadline measured from now
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Reject a pass that would need more samples than allowed
    pub fn check_steps(&self, steps: u64) -> Result<()> {
        if steps > self.max_steps {
            return Err(Error::ResourceExhaustion {
                steps,
                limit: self.max_steps,
            });
        }
        Ok(())
    }

    /// Checked between sweep iterations
    pub fn check_interrupt(&self, breaks: usize) -> Result<()> {
        if let Some(flag) = &self.cancel {
            if flag.load(Ordering::Relaxed) {
                return Err(Error::Cancelled);
            }
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(Error::DeadlineExceeded { breaks });
            }
        }
        Ok(())
    }
}

/// Sampling parameters for one run
#[derive(Debug, Clone, Copy)]
pub struct SweepConfig {
    /// Sample spacing along the value axis
    pub sweep: f64,
    /// Number of breaks wanted (`classes - 1`)
    pub target: usize,
    /// Outer bounds used as interpolation fence posts
    pub fences: (f64, f64),
}

/// Breaks of a run with their provenance counts
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SweepOutcome {
    /// Discovery order
    pub breaks: Vec<f64>,
    /// Breaks taken at a maximal overlap
    pub natural: usize,
    /// Breaks taken from a lone segment when nothing overlapped
    pub residual: usize,
    /// Breaks filled in by midpoint interpolation
    pub interpolated: usize,
    /// Sweep passes run
    pub passes: usize,
}

/// Number of samples from `min_lo` to `max_hi` at spacing `sweep`
pub fn step_count(min_lo: f64, max_hi: f64, sweep: f64) -> u64 {
    ((max_hi - min_lo) / sweep).floor() as u64 + 1
}

/// Sample positions of one pass
fn sample_positions(min_lo: f64, max_hi: f64, sweep: f64) -> Vec<f64> {
    let mut positions = Vec::new();
    let mut i = 0u64;
    loop {
        let p = round_dp(min_lo + i as f64 * sweep, VALUE_DECIMALS);
        if p > max_hi {
            break;
        }
        positions.push(p);
        i += 1;
    }
    positions
}

/// Winning run of samples as an index range `[start, end]`
fn winning_run(counts: &[usize], best: usize, positions: &[f64]) -> (usize, usize) {
    let mut winner: Option<(usize, usize, f64)> = None;
    let mut i = 0;
    while i < counts.len() {
        if counts[i] != best {
            i += 1;
            continue;
        }
        let start = i;
        while i + 1 < counts.len() && counts[i + 1] == best {
            i += 1;
        }
        let end = i;
        let mean = positions[start..=end].iter().sum::<f64>() / (end - start + 1) as f64;

        let better = match winner {
            None => true,
            Some((ws, we, wmean)) => {
                let (len, wlen) = (end - start, we - ws);
                len > wlen || (len == wlen && mean > wmean)
            }
        };
        if better {
            winner = Some((start, end, mean));
        }
        i += 1;
    }
    winner.map_or((0, 0), |(s, e, _)| (s, e))
}

/// Run the line sweep and interpolate any missing breaks
pub fn run(
    segments: Vec<Segment>,
    config: &SweepConfig,
    budget: &SweepBudget,
) -> Result<SweepOutcome> {
    let mut outcome = SweepOutcome::default();
    if config.target == 0 || segments.is_empty() {
        return Ok(outcome);
    }

    // every later pass covers a subset of the first one
    let min_lo = segments.iter().map(|s| s.lo).fold(f64::INFINITY, f64::min);
    let max_hi = segments.iter().map(|s| s.hi).fold(f64::NEG_INFINITY, f64::max);
    budget.check_steps(step_count(min_lo, max_hi, config.sweep))?;

    info!(
        segments = segments.len(),
        target = config.target,
        sweep = config.sweep,
        "line sweep started"
    );

    let mut remaining = segments;
    while outcome.breaks.len() < config.target && !remaining.is_empty() {
        budget.check_interrupt(outcome.breaks.len())?;
        outcome.passes += 1;

        let min_lo = remaining.iter().map(|s| s.lo).fold(f64::INFINITY, f64::min);
        let max_hi = remaining.iter().map(|s| s.hi).fold(f64::NEG_INFINITY, f64::max);
        let positions = sample_positions(min_lo, max_hi, config.sweep);

        let counts: Vec<usize> = positions
            .par_iter()
            .map(|&p| remaining.iter().filter(|s| s.contains(p)).count())
            .collect();
        for (p, c) in positions.iter().zip(&counts) {
            trace!(position = p, count = c, "sample");
        }

        let best = counts.iter().copied().max().unwrap_or(0);
        if best > 0 {
            let (start, end) = winning_run(&counts, best, &positions);
            let run = &positions[start..=end];
            let value = round_dp(run.iter().sum::<f64>() / run.len() as f64, VALUE_DECIMALS);

            let before = remaining.len();
            remaining.retain(|s| !run.iter().any(|&p| s.contains(p)));
            debug!(
                value,
                overlap = best,
                samples = run.len(),
                removed = before - remaining.len(),
                "break extracted"
            );
            outcome.breaks.push(value);
            outcome.natural += 1;
        } else {
            // unreachable while the first sample is round4(min_lo) and containment
            // is closed; kept as the fallback to the most significant segment
            let Some(top) = remaining.iter().map(|s| s.significance).reduce(f64::max) else {
                break;
            };
            let Some(pick) = remaining.iter().find(|s| s.significance == top) else {
                break;
            };
            let value = round_dp((pick.lo + pick.hi) / 2.0, VALUE_DECIMALS);
            remaining.retain(|s| s.significance != top);
            debug!(value, significance = top, "residual break");
            outcome.breaks.push(value);
            outcome.residual += 1;
        }
    }

    let found = outcome.breaks.len();
    if found > 0 && found < config.target {
        outcome.breaks = fill_breaks(&outcome.breaks, config.target, config.fences);
        outcome.interpolated = outcome.breaks.len() - found;
        info!(
            natural = found,
            filled = outcome.interpolated,
            "segments exhausted, missing breaks interpolated"
        );
    }

    info!(breaks = outcome.breaks.len(), passes = outcome.passes, "line sweep finished");
    Ok(outcome)
}
