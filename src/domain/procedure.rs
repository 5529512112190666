use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{ActorId, PatientId, ProcedureId, ProcedureTypeId, ShiftId};
use super::staff::StaffAssignment;
use crate::fees::FeeSplit;
use crate::money::Money;

/// Approval workflow state, separate from the operational status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Pending,
    Submitted,
    Approved,
    Rejected,
    RevisionRequested,
}

impl ValidationStatus {
    pub const ALL: [ValidationStatus; 5] = [
        ValidationStatus::Pending,
        ValidationStatus::Submitted,
        ValidationStatus::Approved,
        ValidationStatus::Rejected,
        ValidationStatus::RevisionRequested,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Pending => "pending",
            ValidationStatus::Submitted => "submitted",
            ValidationStatus::Approved => "approved",
            ValidationStatus::Rejected => "rejected",
            ValidationStatus::RevisionRequested => "revision_requested",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ValidationStatus::Approved | ValidationStatus::Rejected)
    }

    /// Staff and procedure type may only change in these states.
    pub fn is_editable(&self) -> bool {
        matches!(self, ValidationStatus::Pending | ValidationStatus::RevisionRequested)
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationalStatus {
    Pending,
    Completed,
    Cancelled,
}

impl OperationalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationalStatus::Pending => "pending",
            OperationalStatus::Completed => "completed",
            OperationalStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OperationalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureType {
    pub id: ProcedureTypeId,
    pub name: String,
    pub tariff: Money,
    pub non_paramedic_fee: Money,
    pub active: bool,
}

impl ProcedureType {
    pub fn new(name: impl Into<String>, tariff: Money, non_paramedic_fee: Money) -> Self {
        Self {
            id: ProcedureTypeId::new(),
            name: name.into(),
            tariff,
            non_paramedic_fee,
            active: true,
        }
    }

    /// True when the amounts differ, which completed procedures forbid.
    pub fn pricing_differs(&self, other: &ProcedureType) -> bool {
        self.tariff != other.tariff || self.non_paramedic_fee != other.non_paramedic_fee
    }
}

/// One performed medical action.
///
/// `tariff` and `non_paramedic_flat_fee` are snapshots taken from the
/// catalog when the procedure (or its type) was set; later catalog edits do
/// not reach them. `version` increments on every committed change and backs
/// the store's compare-and-set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Procedure {
    pub id: ProcedureId,
    pub procedure_type_id: ProcedureTypeId,
    pub patient_id: PatientId,
    pub performed_at: DateTime<Utc>,
    pub shift_id: Option<ShiftId>,
    pub tariff: Money,
    pub non_paramedic_flat_fee: Money,
    pub staff: StaffAssignment,
    pub fees: FeeSplit,
    pub status: OperationalStatus,
    pub validation_status: ValidationStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_by: ActorId,
    pub version: u64,
}

impl Procedure {
    pub fn has_staff(&self) -> bool {
        !self.staff.is_empty()
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == OperationalStatus::Cancelled
    }
}
