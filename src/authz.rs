// Role checks consulted by callers before privileged workflow operations.
// The orchestrator itself only enforces workflow legality.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::domain::ActorId;

#[cfg(test)]
use mockall::automock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Operator,
    Validator,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Operator => "operator",
            Role::Validator => "validator",
            Role::Admin => "admin",
        })
    }
}

/// Workflow operations that callers gate by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatedOperation {
    Register,
    Edit,
    Submit,
    Approve,
    Reject,
    RequestRevision,
    Reopen,
    Cancel,
}

impl GatedOperation {
    /// Any one of these roles grants the operation.
    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            GatedOperation::Register | GatedOperation::Edit | GatedOperation::Submit | GatedOperation::Cancel => {
                &[Role::Operator, Role::Admin]
            }
            GatedOperation::Approve | GatedOperation::Reject | GatedOperation::RequestRevision => {
                &[Role::Validator, Role::Admin]
            }
            GatedOperation::Reopen => &[Role::Admin],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("actor {actor} lacks a role for {operation:?}")]
pub struct Forbidden {
    pub actor: ActorId,
    pub operation: GatedOperation,
}

#[cfg_attr(test, automock)]
pub trait RoleProvider: Send + Sync {
    fn current_actor(&self) -> ActorId;

    fn current_actor_has_role(&self, roles: &[Role]) -> bool;
}

/// Fixed actor and role set, e.g. from a CLI flag or a verified token.
#[derive(Debug, Clone)]
pub struct StaticRoleProvider {
    actor: ActorId,
    roles: HashSet<Role>,
}

impl StaticRoleProvider {
    pub fn new(actor: ActorId, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            actor,
            roles: roles.into_iter().collect(),
        }
    }
}

impl RoleProvider for StaticRoleProvider {
    fn current_actor(&self) -> ActorId {
        self.actor.clone()
    }

    fn current_actor_has_role(&self, roles: &[Role]) -> bool {
        roles.iter().any(|r| self.roles.contains(r))
    }
}

/// Check the current actor before invoking `operation`.
pub fn authorize(provider: &dyn RoleProvider, operation: GatedOperation) -> Result<ActorId, Forbidden> {
    let actor = provider.current_actor();
    if provider.current_actor_has_role(operation.allowed_roles()) {
        Ok(actor)
    } else {
        Err(Forbidden { actor, operation })
    }
}
