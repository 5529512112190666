//! Workflow notifications
//!
//! Notifications are best effort. The dispatcher hands each event to a
//! spawned task so a slow or failing sink never holds up, or fails, the
//! transition that produced it. Callers that are about to shut the runtime
//! down call [`NotificationDispatcher::flush`] first.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::{ActorId, ProcedureId, ValidationStatus};
use crate::money::Money;
use crate::observability::WorkflowMetrics;

#[cfg(test)]
use mockall::automock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    AutoApproved,
    SubmittedForReview,
    Approved,
    Rejected,
    RevisionRequested,
    Reopened,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::AutoApproved => "auto_approved",
            NotificationKind::SubmittedForReview => "submitted_for_review",
            NotificationKind::Approved => "approved",
            NotificationKind::Rejected => "rejected",
            NotificationKind::RevisionRequested => "revision_requested",
            NotificationKind::Reopened => "reopened",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub validation_status: ValidationStatus,
    pub actor: ActorId,
    pub reason: Option<String>,
    pub allocated_fee: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub kind: NotificationKind,
    pub procedure_id: ProcedureId,
    pub payload: NotificationPayload,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification channel closed")]
    ChannelClosed,
    #[error("delivery failed: {message}")]
    Delivery { message: String },
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn emit(&self, event: NotificationEvent) -> Result<(), NotifyError>;
}

/// Sink that only writes a structured log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[async_trait]
impl NotificationSink for TracingSink {
    async fn emit(&self, event: NotificationEvent) -> Result<(), NotifyError> {
        info!(
            notification.kind = %event.kind,
            procedure.id = %event.procedure_id,
            actor.id = %event.payload.actor,
            status = %event.payload.validation_status,
            "Workflow notification"
        );
        Ok(())
    }
}

/// Sink that drops everything; used when notifications are disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

#[async_trait]
impl NotificationSink for NoopSink {
    async fn emit(&self, _event: NotificationEvent) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Forwards events into an unbounded channel for an external consumer
/// (chat bridge, outbox writer, tests).
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<NotificationEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<NotificationEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl NotificationSink for ChannelSink {
    async fn emit(&self, event: NotificationEvent) -> Result<(), NotifyError> {
        self.sender.send(event).map_err(|_| NotifyError::ChannelClosed)
    }
}

/// Fire-and-forget delivery to a sink. Spawned deliveries are tracked until
/// they finish or are flushed.
#[derive(Clone)]
pub struct NotificationDispatcher {
    sink: Arc<dyn NotificationSink>,
    metrics: Arc<WorkflowMetrics>,
    pending: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl NotificationDispatcher {
    pub fn new(sink: Arc<dyn NotificationSink>, metrics: Arc<WorkflowMetrics>) -> Self {
        Self {
            sink,
            metrics,
            pending: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Spawn delivery and return immediately. Failures are logged and counted.
    pub fn dispatch(&self, event: NotificationEvent) {
        let sink = Arc::clone(&self.sink);
        let metrics = Arc::clone(&self.metrics);

        let handle = tokio::spawn(async move {
            let kind = event.kind;
            let procedure_id = event.procedure_id;
            if let Err(e) = sink.emit(event).await {
                metrics.record_notification_failure();
                warn!(
                    notification.kind = %kind,
                    procedure.id = %procedure_id,
                    error = %e,
                    "Notification delivery failed"
                );
            }
        });

        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    /// Wait for every delivery spawned so far.
    pub async fn flush(&self) {
        let handles = std::mem::take(&mut *self.pending.lock().unwrap_or_else(|e| e.into_inner()));
        let count = handles.len();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Notification task did not complete");
            }
        }
        debug!(count, "Flushed pending notifications");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn event(kind: NotificationKind) -> NotificationEvent {
        NotificationEvent {
            kind,
            procedure_id: ProcedureId::new(),
            payload: NotificationPayload {
                validation_status: ValidationStatus::Submitted,
                actor: ActorId::new("operator"),
                reason: None,
                allocated_fee: Money::from_major(40_000),
            },
        }
    }

    #[tokio::test]
    async fn test_channel_sink_delivers() {
        let (sink, mut rx) = ChannelSink::new();
        let dispatcher = NotificationDispatcher::new(Arc::new(sink), Arc::new(WorkflowMetrics::new()));

        dispatcher.dispatch(event(NotificationKind::SubmittedForReview));

        let received = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.kind, NotificationKind::SubmittedForReview);
    }

    #[tokio::test]
    async fn test_sink_failure_is_counted_not_raised() {
        let mut sink = MockNotificationSink::new();
        sink.expect_emit().times(1).returning(|_| {
            Err(NotifyError::Delivery {
                message: "bot token revoked".to_string(),
            })
        });
        let metrics = Arc::new(WorkflowMetrics::new());
        let dispatcher = NotificationDispatcher::new(Arc::new(sink), Arc::clone(&metrics));

        dispatcher.dispatch(event(NotificationKind::Rejected));
        dispatcher.flush().await;

        assert_eq!(metrics.snapshot().notification_failures, 1);
    }

    #[tokio::test]
    async fn test_flush_waits_for_slow_sink() {
        let (sink, mut rx) = ChannelSink::new();
        let slow = SlowSink {
            inner: sink,
            delay: Duration::from_millis(50),
        };
        let dispatcher = NotificationDispatcher::new(Arc::new(slow), Arc::new(WorkflowMetrics::new()));

        dispatcher.dispatch(event(NotificationKind::Approved));
        dispatcher.dispatch(event(NotificationKind::Reopened));
        dispatcher.flush().await;

        let mut kinds = vec![rx.try_recv().unwrap().kind, rx.try_recv().unwrap().kind];
        kinds.sort_by_key(|k| k.as_str());
        assert_eq!(kinds, vec![NotificationKind::Approved, NotificationKind::Reopened]);
        assert!(dispatcher.pending.lock().unwrap().is_empty());
    }

    struct SlowSink {
        inner: ChannelSink,
        delay: Duration,
    }

    #[async_trait]
    impl NotificationSink for SlowSink {
        async fn emit(&self, event: NotificationEvent) -> Result<(), NotifyError> {
            tokio::time::sleep(self.delay).await;
            self.inner.emit(event).await
        }
    }

    #[tokio::test]
    async fn test_closed_channel_reports_error() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        assert!(matches!(
            sink.emit(event(NotificationKind::Approved)).await,
            Err(NotifyError::ChannelClosed)
        ));
    }
}
