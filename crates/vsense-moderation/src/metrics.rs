//! Moderation client metrics.

use metrics::counter;

/// Metric name constants for consistency.
pub mod names {
    /// Total moderation jobs by terminal outcome.
    pub const JOBS_TOTAL: &str = "moderation_jobs_total";

    /// Total polling attempts issued.
    pub const POLLS_TOTAL: &str = "moderation_polls_total";
}

/// Record a terminal moderation job outcome.
pub fn record_job(outcome: &str) {
    counter!(
        names::JOBS_TOTAL,
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a polling attempt.
pub fn record_poll() {
    counter!(names::POLLS_TOTAL).increment(1);
}
