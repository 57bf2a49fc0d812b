//! Metric names and recording helpers.
//!
//! Recorded through the `metrics` facade; with no recorder installed the
//! calls are no-ops.

use metrics::describe_counter;

pub const HISTORY_WRITE_FAILURES: &str = "growth_assist_history_write_failures_total";
pub const TURNS: &str = "growth_assist_turns_total";
pub const CLASSIFIER_FALLBACKS: &str = "growth_assist_classifier_fallbacks_total";

/// Register metric descriptions. Call once after installing a recorder.
pub fn register_metrics() {
    describe_counter!(
        HISTORY_WRITE_FAILURES,
        "Conversation turns that could not be persisted"
    );
    describe_counter!(TURNS, "Processed turns by the path that answered them");
    describe_counter!(
        CLASSIFIER_FALLBACKS,
        "Classifier calls that fell back to UNKNOWN"
    );
}

pub fn record_history_write_failure(role: &'static str) {
    metrics::counter!(HISTORY_WRITE_FAILURES, "role" => role).increment(1);
}

pub fn record_turn(path: &'static str) {
    metrics::counter!(TURNS, "path" => path).increment(1);
}

pub fn record_classifier_fallback() {
    metrics::counter!(CLASSIFIER_FALLBACKS).increment(1);
}
