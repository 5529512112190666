// Typed failures surfaced by the validation workflow
//
// Every variant names the procedure it concerns. Persistence detail stays in
// the logs; callers only see the generic classification.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::error;

use crate::domain::{ProcedureId, ValidationStatus};
use crate::fees::AllocationError;
use crate::store::StoreError;
use crate::validation::state_machine::{EventKind, TransitionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    IllegalTransition,
    MissingAssignment,
    ValidationFailed,
    ConcurrentModification,
    InvalidAssignment,
    Persistence,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::IllegalTransition => "illegal_transition",
            ErrorKind::MissingAssignment => "missing_assignment",
            ErrorKind::ValidationFailed => "validation_failed",
            ErrorKind::ConcurrentModification => "concurrent_modification",
            ErrorKind::InvalidAssignment => "invalid_assignment",
            ErrorKind::Persistence => "persistence",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("not_found: procedure {procedure_id} does not exist")]
    NotFound { procedure_id: ProcedureId },

    #[error("illegal_transition: procedure {procedure_id} cannot {event} from {from}")]
    IllegalTransition {
        procedure_id: ProcedureId,
        event: EventKind,
        from: ValidationStatus,
    },

    #[error("missing_assignment: procedure {procedure_id} has no staff assigned")]
    MissingAssignment { procedure_id: ProcedureId },

    #[error("validation_failed: procedure {procedure_id}: {reason}")]
    ValidationFailed { procedure_id: ProcedureId, reason: String },

    #[error("concurrent_modification: procedure {procedure_id} was changed by another caller")]
    ConcurrentModification { procedure_id: ProcedureId },

    #[error("invalid_assignment: procedure {procedure_id}: {detail}")]
    InvalidAssignment { procedure_id: ProcedureId, detail: String },

    #[error("persistence: persistence failure for procedure {procedure_id}")]
    Persistence { procedure_id: ProcedureId },
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::NotFound { .. } => ErrorKind::NotFound,
            WorkflowError::IllegalTransition { .. } => ErrorKind::IllegalTransition,
            WorkflowError::MissingAssignment { .. } => ErrorKind::MissingAssignment,
            WorkflowError::ValidationFailed { .. } => ErrorKind::ValidationFailed,
            WorkflowError::ConcurrentModification { .. } => ErrorKind::ConcurrentModification,
            WorkflowError::InvalidAssignment { .. } => ErrorKind::InvalidAssignment,
            WorkflowError::Persistence { .. } => ErrorKind::Persistence,
        }
    }

    pub fn procedure_id(&self) -> ProcedureId {
        match self {
            WorkflowError::NotFound { procedure_id }
            | WorkflowError::IllegalTransition { procedure_id, .. }
            | WorkflowError::MissingAssignment { procedure_id }
            | WorkflowError::ValidationFailed { procedure_id, .. }
            | WorkflowError::ConcurrentModification { procedure_id }
            | WorkflowError::InvalidAssignment { procedure_id, .. }
            | WorkflowError::Persistence { procedure_id } => *procedure_id,
        }
    }

    /// Only a lost compare-and-set is worth retrying unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WorkflowError::ConcurrentModification { .. })
    }

    pub(crate) fn from_transition(procedure_id: ProcedureId, err: TransitionError) -> Self {
        match err {
            TransitionError::Illegal { event, from } => WorkflowError::IllegalTransition {
                procedure_id,
                event,
                from,
            },
            TransitionError::ReasonRequired { .. } | TransitionError::NonPositiveTariff => {
                WorkflowError::ValidationFailed {
                    procedure_id,
                    reason: err.to_string(),
                }
            }
            TransitionError::MissingAssignment => WorkflowError::MissingAssignment { procedure_id },
        }
    }

    pub(crate) fn from_allocation(procedure_id: ProcedureId, err: AllocationError) -> Self {
        match err {
            AllocationError::InvalidAssignment { .. } => WorkflowError::InvalidAssignment {
                procedure_id,
                detail: err.to_string(),
            },
            AllocationError::NegativeAmount { .. } => WorkflowError::ValidationFailed {
                procedure_id,
                reason: err.to_string(),
            },
        }
    }

    pub(crate) fn from_store(procedure_id: ProcedureId, err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => WorkflowError::NotFound { procedure_id },
            StoreError::VersionConflict { .. } | StoreError::AlreadyExists { .. } => {
                WorkflowError::ConcurrentModification { procedure_id }
            }
            StoreError::ProcedureTypeNotFound { .. } | StoreError::CatalogImmutable { .. } => {
                WorkflowError::ValidationFailed {
                    procedure_id,
                    reason: err.to_string(),
                }
            }
            StoreError::Backend { .. } => {
                error!(procedure.id = %procedure_id, error = %err, "Persistence failure");
                WorkflowError::Persistence { procedure_id }
            }
        }
    }
}
