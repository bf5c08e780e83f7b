use once_cell::sync::Lazy;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
struct Counters {
    admitted: AtomicU64,
    dispatched: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
}

static COUNTERS: Lazy<Counters> = Lazy::new(Counters::default);

fn increment(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

pub fn record_admitted() {
    increment(&COUNTERS.admitted);
}

pub fn record_dispatched() {
    increment(&COUNTERS.dispatched);
}

pub fn record_completed() {
    increment(&COUNTERS.completed);
}

pub fn record_failed() {
    increment(&COUNTERS.failed);
}

/// Popped jobs dropped because the element left the page or its state moved on.
pub fn record_skipped() {
    increment(&COUNTERS.skipped);
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct SchedulerMetricsSnapshot {
    pub admitted: u64,
    pub dispatched: u64,
    pub completed: u64,
    pub failed: u64,
    pub skipped: u64,
}

/// Process-wide totals across every scheduler instance.
pub fn snapshot() -> SchedulerMetricsSnapshot {
    SchedulerMetricsSnapshot {
        admitted: COUNTERS.admitted.load(Ordering::Relaxed),
        dispatched: COUNTERS.dispatched.load(Ordering::Relaxed),
        completed: COUNTERS.completed.load(Ordering::Relaxed),
        failed: COUNTERS.failed.load(Ordering::Relaxed),
        skipped: COUNTERS.skipped.load(Ordering::Relaxed),
    }
}
