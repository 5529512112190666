use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{ActorId, DecisionId, ProcedureId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    Approve,
    AutoApprove,
    Reject,
    RequestRevision,
    /// Administrator override back to `pending`.
    Reopen,
}

impl DecisionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionAction::Approve => "approve",
            DecisionAction::AutoApprove => "auto_approve",
            DecisionAction::Reject => "reject",
            DecisionAction::RequestRevision => "request_revision",
            DecisionAction::Reopen => "reopen",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        [
            DecisionAction::Approve,
            DecisionAction::AutoApprove,
            DecisionAction::Reject,
            DecisionAction::RequestRevision,
            DecisionAction::Reopen,
        ]
        .into_iter()
        .find(|action| action.as_str() == s)
    }
}

impl fmt::Display for DecisionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only audit record of a validation decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationDecision {
    pub id: DecisionId,
    pub procedure_id: ProcedureId,
    pub actor: ActorId,
    pub action: DecisionAction,
    pub reason: String,
    pub decided_at: DateTime<Utc>,
}

impl ValidationDecision {
    pub fn new(procedure_id: ProcedureId, actor: ActorId, action: DecisionAction, reason: impl Into<String>) -> Self {
        Self {
            id: DecisionId::new(),
            procedure_id,
            actor,
            action,
            reason: reason.into(),
            decided_at: Utc::now(),
        }
    }
}
