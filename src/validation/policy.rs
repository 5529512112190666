// Auto-approval rules for freshly submitted procedures

use serde::{Deserialize, Serialize};

use crate::domain::{Procedure, StaffCategory};
use crate::money::{Money, Percentage};

/// Fee ceilings under which a submission is approved without review.
///
/// A category ceiling overrides the global one. With no ceiling at all the
/// policy never auto-approves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoApprovalConfig {
    pub fee_ceiling: Option<Money>,
    pub doctor_ceiling: Option<Money>,
    pub paramedic_ceiling: Option<Money>,
    pub non_paramedic_ceiling: Option<Money>,
}

impl AutoApprovalConfig {
    pub fn never() -> Self {
        Self::default()
    }

    pub fn below(ceiling: Money) -> Self {
        Self {
            fee_ceiling: Some(ceiling),
            ..Self::default()
        }
    }

    pub fn ceiling_for(&self, category: StaffCategory) -> Option<Money> {
        let specific = match category {
            StaffCategory::Doctor => self.doctor_ceiling,
            StaffCategory::Paramedic => self.paramedic_ceiling,
            StaffCategory::NonParamedic => self.non_paramedic_ceiling,
        };
        specific.or(self.fee_ceiling)
    }
}

/// Explicit inputs to fee allocation and auto-approval.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub fee_percentage: Percentage,
    pub auto_approval: AutoApprovalConfig,
}

impl PolicyConfig {
    pub fn with_percentage(mut self, percentage: Percentage) -> Self {
        self.fee_percentage = percentage;
        self
    }

    pub fn with_auto_approval(mut self, auto_approval: AutoApprovalConfig) -> Self {
        self.auto_approval = auto_approval;
        self
    }
}

/// Decides whether a submitted procedure skips human review.
///
/// Implementations must be pure: the same procedure and config always give
/// the same answer.
pub trait AutoApprovalPolicy: Send + Sync {
    fn should_auto_approve(&self, procedure: &Procedure, config: &PolicyConfig) -> bool;
}

/// Approves when the fee of the assigned recipient category is strictly below
/// that category's ceiling and the procedure is not cancelled. A zero fee
/// still counts.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeeCeilingPolicy;

impl AutoApprovalPolicy for FeeCeilingPolicy {
    fn should_auto_approve(&self, procedure: &Procedure, config: &PolicyConfig) -> bool {
        if procedure.is_cancelled() {
            return false;
        }
        let Some(category) = procedure.staff.fee_recipient().category() else {
            return false;
        };
        match config.auto_approval.ceiling_for(category) {
            Some(ceiling) => procedure.fees.fee_for(category) < ceiling,
            None => false,
        }
    }
}

/// Always defers to a human reviewer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverAutoApprove;

impl AutoApprovalPolicy for NeverAutoApprove {
    fn should_auto_approve(&self, _procedure: &Procedure, _config: &PolicyConfig) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ActorId, OperationalStatus, PatientId, ProcedureId, ProcedureTypeId, StaffAssignment, StaffId,
        ValidationStatus,
    };
    use crate::fees::allocate;
    use chrono::Utc;

    fn submitted(assignment: StaffAssignment) -> Procedure {
        submitted_with(assignment, Money::from_major(10_000), Percentage::default())
    }

    fn submitted_with(assignment: StaffAssignment, flat: Money, percentage: Percentage) -> Procedure {
        let tariff = Money::from_major(100_000);
        let fees = allocate(tariff, flat, &assignment, percentage).unwrap();
        Procedure {
            id: ProcedureId::new(),
            procedure_type_id: ProcedureTypeId::new(),
            patient_id: PatientId::new(),
            performed_at: Utc::now(),
            shift_id: None,
            tariff,
            non_paramedic_flat_fee: flat,
            staff: assignment,
            fees,
            status: OperationalStatus::Pending,
            validation_status: ValidationStatus::Submitted,
            submitted_at: Some(Utc::now()),
            created_by: ActorId::new("operator"),
            version: 1,
        }
    }

    #[test]
    fn test_no_ceiling_never_approves() {
        let p = submitted(StaffAssignment::none().with_doctor(StaffId::new()));
        assert!(!FeeCeilingPolicy.should_auto_approve(&p, &PolicyConfig::default()));
    }

    #[test]
    fn test_below_ceiling_approves() {
        let p = submitted(StaffAssignment::none().with_doctor(StaffId::new()));
        let config = PolicyConfig::default().with_auto_approval(AutoApprovalConfig::below(Money::from_major(50_000)));
        assert!(FeeCeilingPolicy.should_auto_approve(&p, &config));
    }

    #[test]
    fn test_ceiling_is_exclusive() {
        let p = submitted(StaffAssignment::none().with_doctor(StaffId::new()));
        let config = PolicyConfig::default().with_auto_approval(AutoApprovalConfig::below(Money::from_major(40_000)));
        assert!(!FeeCeilingPolicy.should_auto_approve(&p, &config));
    }

    #[test]
    fn test_category_ceiling_overrides_global() {
        let p = submitted(StaffAssignment::none().with_non_paramedic(StaffId::new()));
        let config = PolicyConfig::default().with_auto_approval(AutoApprovalConfig {
            fee_ceiling: Some(Money::from_major(50_000)),
            non_paramedic_ceiling: Some(Money::from_major(5_000)),
            ..AutoApprovalConfig::default()
        });
        assert!(!FeeCeilingPolicy.should_auto_approve(&p, &config));
    }

    #[test]
    fn test_cancelled_never_approves() {
        let mut p = submitted(StaffAssignment::none().with_doctor(StaffId::new()));
        p.status = OperationalStatus::Cancelled;
        let config = PolicyConfig::default().with_auto_approval(AutoApprovalConfig::below(Money::from_major(1_000_000)));
        assert!(!FeeCeilingPolicy.should_auto_approve(&p, &config));
    }

    #[test]
    fn test_zero_percent_doctor_fee_approves() {
        let p = submitted_with(
            StaffAssignment::none().with_doctor(StaffId::new()),
            Money::from_major(10_000),
            Percentage::new(0).unwrap(),
        );
        assert_eq!(p.fees.doctor_fee, Money::ZERO);
        let config = PolicyConfig::default()
            .with_percentage(Percentage::new(0).unwrap())
            .with_auto_approval(AutoApprovalConfig::below(Money::from_major(50_000)));
        assert!(FeeCeilingPolicy.should_auto_approve(&p, &config));
    }

    #[test]
    fn test_zero_flat_fee_non_paramedic_approves() {
        let p = submitted_with(
            StaffAssignment::none().with_non_paramedic(StaffId::new()),
            Money::ZERO,
            Percentage::default(),
        );
        let config = PolicyConfig::default().with_auto_approval(AutoApprovalConfig {
            non_paramedic_ceiling: Some(Money::from_major(1)),
            ..AutoApprovalConfig::default()
        });
        assert!(FeeCeilingPolicy.should_auto_approve(&p, &config));
    }

    #[test]
    fn test_no_staff_never_approves() {
        let p = submitted(StaffAssignment::none());
        let config = PolicyConfig::default().with_auto_approval(AutoApprovalConfig::below(Money::from_major(1)));
        assert!(!FeeCeilingPolicy.should_auto_approve(&p, &config));
        assert!(!NeverAutoApprove.should_auto_approve(&p, &config));
    }
}
