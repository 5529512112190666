use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Workflow outcome counters, one set per orchestrator.
#[derive(Debug, Default)]
pub struct WorkflowMetrics {
    pub submissions: AtomicU64,
    pub auto_approvals: AtomicU64,
    pub approvals: AtomicU64,
    pub rejections: AtomicU64,
    pub revision_requests: AtomicU64,
    pub reopens: AtomicU64,
    pub illegal_transitions: AtomicU64,
    pub conflicts: AtomicU64,
    pub notification_failures: AtomicU64,
}

impl WorkflowMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_submission(&self) {
        self.submissions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_auto_approval(&self) {
        self.auto_approvals.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_approval(&self) {
        self.approvals.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejection(&self) {
        self.rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_revision_request(&self) {
        self.revision_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reopen(&self) {
        self.reopens.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_illegal_transition(&self) {
        self.illegal_transitions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_conflict(&self) {
        self.conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_notification_failure(&self) {
        self.notification_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> WorkflowStats {
        WorkflowStats {
            submissions: self.submissions.load(Ordering::Relaxed),
            auto_approvals: self.auto_approvals.load(Ordering::Relaxed),
            approvals: self.approvals.load(Ordering::Relaxed),
            rejections: self.rejections.load(Ordering::Relaxed),
            revision_requests: self.revision_requests.load(Ordering::Relaxed),
            reopens: self.reopens.load(Ordering::Relaxed),
            illegal_transitions: self.illegal_transitions.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
            notification_failures: self.notification_failures.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.snapshot();
        info!(
            "Workflow metrics: submissions={}, auto_approvals={}, approvals={}, rejections={}, revisions={}, conflicts={}, notification_failures={}",
            stats.submissions,
            stats.auto_approvals,
            stats.approvals,
            stats.rejections,
            stats.revision_requests,
            stats.conflicts,
            stats.notification_failures
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct WorkflowStats {
    pub submissions: u64,
    pub auto_approvals: u64,
    pub approvals: u64,
    pub rejections: u64,
    pub revision_requests: u64,
    pub reopens: u64,
    pub illegal_transitions: u64,
    pub conflicts: u64,
    pub notification_failures: u64,
}

/// Logs the duration of an operation when dropped.
pub struct OperationTimer {
    operation: &'static str,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        info!(
            operation = %self.operation,
            duration_ms = self.start.elapsed().as_millis() as u64,
            "Operation completed"
        );
    }
}
