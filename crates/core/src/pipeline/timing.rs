//! Elapsed-time stamping for scrape records.

use std::time::{Duration, Instant};

/// Seconds elapsed since `started`, rounded to four decimal places.
pub fn elapsed_seconds(started: Instant) -> f64 {
    round_seconds(started.elapsed())
}

pub fn round_seconds(duration: Duration) -> f64 {
    (duration.as_secs_f64() * 10_000.0).round() / 10_000.0
}
