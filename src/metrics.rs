use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Counters for the consistency engine and resolver
#[derive(Clone)]
pub struct Metrics {
    pub groups_created: Arc<AtomicUsize>,
    pub groups_deleted: Arc<AtomicUsize>,
    pub references_removed: Arc<AtomicU64>,
    pub bulk_items_succeeded: Arc<AtomicU64>,
    pub bulk_items_failed: Arc<AtomicU64>,
    pub sets_copied: Arc<AtomicUsize>,
    pub authorized_lookups: Arc<AtomicU64>,
    pub write_conflicts: Arc<AtomicU64>,
    pub start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            groups_created: Arc::new(AtomicUsize::new(0)),
            groups_deleted: Arc::new(AtomicUsize::new(0)),
            references_removed: Arc::new(AtomicU64::new(0)),
            bulk_items_succeeded: Arc::new(AtomicU64::new(0)),
            bulk_items_failed: Arc::new(AtomicU64::new(0)),
            sets_copied: Arc::new(AtomicUsize::new(0)),
            authorized_lookups: Arc::new(AtomicU64::new(0)),
            write_conflicts: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn inc_groups_created(&self) {
        self.groups_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_groups_deleted(&self) {
        self.groups_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_references_removed(&self, count: u64) {
        self.references_removed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_bulk_items(&self, succeeded: u64, failed: u64) {
        self.bulk_items_succeeded.fetch_add(succeeded, Ordering::Relaxed);
        self.bulk_items_failed.fetch_add(failed, Ordering::Relaxed);
    }

    pub fn inc_sets_copied(&self) {
        self.sets_copied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_authorized_lookups(&self) {
        self.authorized_lookups.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_write_conflicts(&self) {
        self.write_conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            groups_created: self.groups_created.load(Ordering::Relaxed),
            groups_deleted: self.groups_deleted.load(Ordering::Relaxed),
            references_removed: self.references_removed.load(Ordering::Relaxed),
            bulk_items_succeeded: self.bulk_items_succeeded.load(Ordering::Relaxed),
            bulk_items_failed: self.bulk_items_failed.load(Ordering::Relaxed),
            sets_copied: self.sets_copied.load(Ordering::Relaxed),
            authorized_lookups: self.authorized_lookups.load(Ordering::Relaxed),
            write_conflicts: self.write_conflicts.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
pub struct MetricsSnapshot {
    pub groups_created: usize,
    pub groups_deleted: usize,
    pub references_removed: u64,
    pub bulk_items_succeeded: u64,
    pub bulk_items_failed: u64,
    pub sets_copied: usize,
    pub authorized_lookups: u64,
    pub write_conflicts: u64,
    pub uptime_seconds: u64,
}
