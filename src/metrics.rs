use std::sync::atomic::{AtomicU64, Ordering};

use crate::session::LockMode;

/// Atomic counters for lock-protocol telemetry.
#[derive(Debug)]
pub struct LockMetrics {
    /// Read locks granted, both blocking and non-blocking paths.
    pub read_grants: AtomicU64,
    /// Write locks granted, both paths.
    pub write_grants: AtomicU64,
    /// Requests rejected by the self-deadlock check.
    pub deadlocks_detected: AtomicU64,
    /// Non-blocking acquires that found the lock unavailable.
    pub busy_rejections: AtomicU64,
    /// Blocking acquires that returned before grant (cancel or shutdown).
    pub interrupted_waits: AtomicU64,
    /// Releases keyed to a session that held nothing.
    pub not_held_rejections: AtomicU64,
    /// Successful explicit releases.
    pub releases: AtomicU64,
    /// Held locks dropped by the disconnect hook.
    pub disconnect_releases: AtomicU64,
    /// Tickets abandoned by cancelled waiters.
    pub dead_tickets: AtomicU64,
    /// Wake broadcasts issued to the wait queue.
    pub broadcasts: AtomicU64,
}

impl LockMetrics {
    /// Create a zeroed metrics container.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            read_grants: AtomicU64::new(0),
            write_grants: AtomicU64::new(0),
            deadlocks_detected: AtomicU64::new(0),
            busy_rejections: AtomicU64::new(0),
            interrupted_waits: AtomicU64::new(0),
            not_held_rejections: AtomicU64::new(0),
            releases: AtomicU64::new(0),
            disconnect_releases: AtomicU64::new(0),
            dead_tickets: AtomicU64::new(0),
            broadcasts: AtomicU64::new(0),
        }
    }

    pub fn record_grant(&self, mode: LockMode) {
        match mode {
            LockMode::Read => {
                self.read_grants.fetch_add(1, Ordering::Relaxed);
            }
            LockMode::Write => {
                self.write_grants.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn record_deadlock(&self) {
        self.deadlocks_detected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_busy(&self) {
        self.busy_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_interrupted(&self) {
        self.interrupted_waits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_not_held(&self) {
        self.not_held_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_release(&self) {
        self.releases.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_disconnect_release(&self) {
        self.disconnect_releases.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dead_ticket(&self) {
        self.dead_tickets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_broadcast(&self) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
    }

    /// Capture a point-in-time snapshot of all counters.
    #[must_use]
    pub fn snapshot(&self) -> LockMetricsSnapshot {
        LockMetricsSnapshot {
            read_grants: self.read_grants.load(Ordering::Relaxed),
            write_grants: self.write_grants.load(Ordering::Relaxed),
            deadlocks_detected: self.deadlocks_detected.load(Ordering::Relaxed),
            busy_rejections: self.busy_rejections.load(Ordering::Relaxed),
            interrupted_waits: self.interrupted_waits.load(Ordering::Relaxed),
            not_held_rejections: self.not_held_rejections.load(Ordering::Relaxed),
            releases: self.releases.load(Ordering::Relaxed),
            disconnect_releases: self.disconnect_releases.load(Ordering::Relaxed),
            dead_tickets: self.dead_tickets.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
        }
    }
}

impl Default for LockMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable snapshot of lock-protocol counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockMetricsSnapshot {
    pub read_grants: u64,
    pub write_grants: u64,
    pub deadlocks_detected: u64,
    pub busy_rejections: u64,
    pub interrupted_waits: u64,
    pub not_held_rejections: u64,
    pub releases: u64,
    pub disconnect_releases: u64,
    pub dead_tickets: u64,
    pub broadcasts: u64,
}

impl LockMetricsSnapshot {
    /// Total grants across both modes.
    #[must_use]
    pub const fn total_grants(&self) -> u64 {
        self.read_grants + self.write_grants
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_events() {
        let metrics = LockMetrics::default();
        metrics.record_grant(LockMode::Read);
        metrics.record_grant(LockMode::Read);
        metrics.record_grant(LockMode::Write);
        metrics.record_deadlock();
        metrics.record_busy();
        metrics.record_interrupted();
        metrics.record_not_held();
        metrics.record_release();
        metrics.record_disconnect_release();
        metrics.record_dead_ticket();
        metrics.record_broadcast();
        metrics.record_broadcast();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.read_grants, 2);
        assert_eq!(snapshot.write_grants, 1);
        assert_eq!(snapshot.total_grants(), 3);
        assert_eq!(snapshot.deadlocks_detected, 1);
        assert_eq!(snapshot.busy_rejections, 1);
        assert_eq!(snapshot.interrupted_waits, 1);
        assert_eq!(snapshot.not_held_rejections, 1);
        assert_eq!(snapshot.releases, 1);
        assert_eq!(snapshot.disconnect_releases, 1);
        assert_eq!(snapshot.dead_tickets, 1);
        assert_eq!(snapshot.broadcasts, 2);
    }
}
