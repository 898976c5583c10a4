//! ---
//! ncs_section: "01-core-functionality"
//! ncs_subsection: "module"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Shared primitives and utilities for the console runtime."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
use std::time::Duration;

use chrono::{DateTime, Local};

/// Elapsed time in milliseconds rounded to three decimals, as printed by `time`.
pub fn elapsed_millis(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 1_000_000.0).round() / 1_000.0
}

/// Human-readable wall-clock stamp used in the command log.
pub fn wall_clock(at: DateTime<Local>) -> String {
    at.format("%a %b %e %H:%M:%S %Y").to_string()
}
