//! Pipeline metrics.

use std::time::Duration;

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Total runs by terminal outcome.
    pub const RUNS_TOTAL: &str = "pipeline_runs_total";

    /// Wall-clock run duration in seconds.
    pub const RUN_DURATION_SECONDS: &str = "pipeline_run_duration_seconds";
}

/// Record a terminal run outcome.
pub fn record_run(outcome: &str) {
    counter!(
        names::RUNS_TOTAL,
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a finished run's wall-clock duration.
pub fn record_run_duration(elapsed: Duration) {
    histogram!(names::RUN_DURATION_SECONDS).record(elapsed.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(names::RUNS_TOTAL.contains("runs"));
        assert!(names::RUN_DURATION_SECONDS.contains("duration"));
    }
}
