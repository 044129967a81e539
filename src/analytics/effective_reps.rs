// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Effective-rep estimation from inferred RPE

use crate::config::analytics_config::EffortConfig;
use crate::constants::rpe::{MULTIPLIER_FLOOR_RPE, MULTIPLIER_RPE_SPAN};

/// Infer RPE from load relative to e1RM, nudged upward for high rep counts
pub fn estimate_rpe(weight: f64, reps: i32, e1rm: f64, config: &EffortConfig) -> f64 {
    if e1rm <= 0.0 {
        return config.default_rpe;
    }

    let rep_correction =
        (f64::from(reps - config.rep_correction_pivot) * config.rep_correction_per_rep).max(0.0);
    let percentage = weight / e1rm + rep_correction;

    let mut table = config.rpe_table.iter();
    let Some(first) = table.next() else {
        return config.default_rpe;
    };

    let mut best = first;
    let mut best_diff = (first.percentage - percentage).abs();
    for entry in table {
        let diff = (entry.percentage - percentage).abs();
        // strict: equally near entries keep the earlier one
        if diff < best_diff {
            best = entry;
            best_diff = diff;
        }
    }
    best.rpe
}

/// Reps of this set that count as effective, weighted by inferred RPE
pub fn effective_reps(weight: f64, reps: i32, e1rm: f64, config: &EffortConfig) -> f64 {
    if weight <= 0.0 || reps <= 0 {
        return 0.0;
    }

    let rpe = estimate_rpe(weight, reps, e1rm, config);
    if rpe < config.effective_rpe_threshold {
        return 0.0;
    }

    let multiplier = ((rpe - MULTIPLIER_FLOOR_RPE) / MULTIPLIER_RPE_SPAN).min(config.multiplier_cap);
    f64::from(reps) * multiplier
}
