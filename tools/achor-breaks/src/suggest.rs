//! Sweep interval suggestion

use tracing::warn;

use crate::neighbors::round_dp;

/// Fewest samples a sweep should take across the value range
pub const MIN_SAMPLES: f64 = 15.0;

/// Suggested sweep interval for a value range `max - min`
pub fn suggest_sweep(range: f64) -> f64 {
    if range > 0.0 && range < 1.0 {
        range / 100.0
    } else if range > 1.0 && range < 100.0 {
        round_dp(1.0 / 1.1, 2)
    } else if range > 100.0 && range < 1000.0 {
        round_dp(1.0 / 0.37, 2)
    } else if range > 1000.0 {
        2.0
    } else {
        1.0
    }
}

/// Whether `sweep` samples `range` at least [`MIN_SAMPLES`] times
pub fn sweep_is_reasonable(range: f64, sweep: f64) -> bool {
    sweep > 0.0 && range / sweep >= MIN_SAMPLES
}

/// Warn when `sweep` is too coarse for `range`; the sweep is kept as given
pub fn check_sweep(range: f64, sweep: f64) -> bool {
    let ok = sweep_is_reasonable(range, sweep);
    if !ok {
        warn!(
            range,
            sweep,
            suggested = suggest_sweep(range),
            "sweep interval is coarse for the value range"
        );
    }
    ok
}
