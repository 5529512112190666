// Validation status transitions for procedures
//
// Transitions are computed as a plan against an immutable procedure and only
// applied once the caller is ready to commit, so a rejected event never leaves
// a half-updated record behind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

use crate::domain::{DecisionAction, OperationalStatus, Procedure, ValidationStatus};

/// Events accepted by the validation workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ValidationEvent {
    Submit,
    AutoApprove,
    Approve { reason: String },
    Reject { reason: String },
    RequestRevision { reason: String },
    Resubmit,
    /// Privileged override; never produced by automatic logic.
    Reopen { reason: String },
}

/// Event names, including the draft operations that are not status
/// transitions but are still gated by the validation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Submit,
    AutoApprove,
    Approve,
    Reject,
    RequestRevision,
    Resubmit,
    Reopen,
    Edit,
    Cancel,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Submit => "submit",
            EventKind::AutoApprove => "auto_approve",
            EventKind::Approve => "approve",
            EventKind::Reject => "reject",
            EventKind::RequestRevision => "request_revision",
            EventKind::Resubmit => "resubmit",
            EventKind::Reopen => "reopen",
            EventKind::Edit => "edit",
            EventKind::Cancel => "cancel",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ValidationEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ValidationEvent::Submit => EventKind::Submit,
            ValidationEvent::AutoApprove => EventKind::AutoApprove,
            ValidationEvent::Approve { .. } => EventKind::Approve,
            ValidationEvent::Reject { .. } => EventKind::Reject,
            ValidationEvent::RequestRevision { .. } => EventKind::RequestRevision,
            ValidationEvent::Resubmit => EventKind::Resubmit,
            ValidationEvent::Reopen { .. } => EventKind::Reopen,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            ValidationEvent::Approve { reason }
            | ValidationEvent::Reject { reason }
            | ValidationEvent::RequestRevision { reason }
            | ValidationEvent::Reopen { reason } => Some(reason.as_str()),
            _ => None,
        }
    }

    fn requires_reason(&self) -> bool {
        matches!(
            self,
            ValidationEvent::Reject { .. } | ValidationEvent::RequestRevision { .. } | ValidationEvent::Reopen { .. }
        )
    }

    fn decision_action(&self) -> Option<DecisionAction> {
        match self {
            ValidationEvent::AutoApprove => Some(DecisionAction::AutoApprove),
            ValidationEvent::Approve { .. } => Some(DecisionAction::Approve),
            ValidationEvent::Reject { .. } => Some(DecisionAction::Reject),
            ValidationEvent::RequestRevision { .. } => Some(DecisionAction::RequestRevision),
            ValidationEvent::Reopen { .. } => Some(DecisionAction::Reopen),
            ValidationEvent::Submit | ValidationEvent::Resubmit => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("{event} is not allowed from {from}")]
    Illegal { event: EventKind, from: ValidationStatus },
    #[error("{event} requires a non-empty reason")]
    ReasonRequired { event: EventKind },
    #[error("no staff assigned")]
    MissingAssignment,
    #[error("tariff must be positive")]
    NonPositiveTariff,
}

/// Changes a legal transition makes to a procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPlan {
    pub event: EventKind,
    pub from: ValidationStatus,
    pub to: ValidationStatus,
    pub operational_status: OperationalStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    /// Audit action to record alongside the change, if any.
    pub decision: Option<DecisionAction>,
}

impl TransitionPlan {
    pub fn apply(&self, procedure: &mut Procedure) {
        procedure.validation_status = self.to;
        procedure.status = self.operational_status;
        procedure.submitted_at = self.submitted_at;
    }
}

/// Target state for a `(from, event)` pair, `None` when illegal.
pub fn target_state(from: ValidationStatus, event: EventKind) -> Option<ValidationStatus> {
    use ValidationStatus::*;

    match (from, event) {
        (Pending, EventKind::Submit) => Some(Submitted),
        (Submitted, EventKind::AutoApprove) => Some(Approved),
        (Submitted, EventKind::Approve) => Some(Approved),
        (Submitted, EventKind::Reject) => Some(Rejected),
        (Submitted, EventKind::RequestRevision) => Some(RevisionRequested),
        (RevisionRequested, EventKind::Resubmit) => Some(Submitted),
        (Approved, EventKind::Reopen) | (Rejected, EventKind::Reopen) => Some(Pending),
        _ => None,
    }
}

/// Validate `event` against `procedure` and describe the resulting change.
pub fn plan_transition(
    procedure: &Procedure,
    event: &ValidationEvent,
    now: DateTime<Utc>,
) -> Result<TransitionPlan, TransitionError> {
    let from = procedure.validation_status;
    let kind = event.kind();

    let to = target_state(from, kind).ok_or_else(|| {
        debug!(procedure.id = %procedure.id, from = %from, event = %kind, "Rejected illegal transition");
        TransitionError::Illegal { event: kind, from }
    })?;

    if event.requires_reason() && event.reason().map_or(true, |r| r.trim().is_empty()) {
        return Err(TransitionError::ReasonRequired { event: kind });
    }

    let mut operational_status = procedure.status;
    let mut submitted_at = procedure.submitted_at;

    match event {
        ValidationEvent::Submit | ValidationEvent::Resubmit => {
            if !procedure.has_staff() {
                return Err(TransitionError::MissingAssignment);
            }
            if !procedure.tariff.is_positive() {
                return Err(TransitionError::NonPositiveTariff);
            }
            submitted_at = Some(now);
        }
        ValidationEvent::Approve { .. } | ValidationEvent::AutoApprove => {
            if operational_status != OperationalStatus::Cancelled {
                operational_status = OperationalStatus::Completed;
            }
        }
        ValidationEvent::Reopen { .. } => {
            if operational_status == OperationalStatus::Completed {
                operational_status = OperationalStatus::Pending;
            }
            submitted_at = None;
        }
        ValidationEvent::Reject { .. } | ValidationEvent::RequestRevision { .. } => {}
    }

    Ok(TransitionPlan {
        event: kind,
        from,
        to,
        operational_status,
        submitted_at,
        decision: event.decision_action(),
    })
}

/// Staff and procedure type edits are only allowed in editable states.
pub fn ensure_editable(procedure: &Procedure) -> Result<(), TransitionError> {
    if procedure.validation_status.is_editable() {
        Ok(())
    } else {
        Err(TransitionError::Illegal {
            event: EventKind::Edit,
            from: procedure.validation_status,
        })
    }
}

/// Cancelling is refused once a procedure is approved.
pub fn ensure_cancellable(procedure: &Procedure) -> Result<(), TransitionError> {
    if procedure.validation_status == ValidationStatus::Approved {
        Err(TransitionError::Illegal {
            event: EventKind::Cancel,
            from: procedure.validation_status,
        })
    } else {
        Ok(())
    }
}
