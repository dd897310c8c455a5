//! Job lifecycle metrics.
//!
//! Recorded through the `metrics` facade; they are no-ops unless the host
//! binary installs a recorder.

use metrics::{counter, gauge, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_STARTED_TOTAL: &str = "ytvault_jobs_started_total";
    pub const JOBS_FINISHED_TOTAL: &str = "ytvault_jobs_finished_total";
    pub const JOBS_RESUMED_TOTAL: &str = "ytvault_jobs_resumed_total";
    pub const WORKERS_ACTIVE: &str = "ytvault_workers_active";
    pub const PREVIEW_INDEX_DURATION_SECONDS: &str = "ytvault_preview_index_duration_seconds";
    pub const EVENTS_PUBLISHED_TOTAL: &str = "ytvault_events_published_total";
    pub const EVENT_PUSH_FAILURES_TOTAL: &str = "ytvault_event_push_failures_total";
}

pub fn record_job_started() {
    counter!(names::JOBS_STARTED_TOTAL).increment(1);
}

/// `outcome` is the worker's terminal state name.
pub fn record_job_finished(outcome: &'static str) {
    counter!(names::JOBS_FINISHED_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_jobs_resumed(count: usize) {
    counter!(names::JOBS_RESUMED_TOTAL).increment(count as u64);
}

pub fn set_active_workers(count: usize) {
    gauge!(names::WORKERS_ACTIVE).set(count as f64);
}

pub fn record_preview_index_duration(duration_secs: f64) {
    histogram!(names::PREVIEW_INDEX_DURATION_SECONDS).record(duration_secs);
}

pub fn record_event_published(event: &'static str) {
    counter!(names::EVENTS_PUBLISHED_TOTAL, "event" => event).increment(1);
}

pub fn record_push_failure() {
    counter!(names::EVENT_PUSH_FAILURES_TOTAL).increment(1);
}
