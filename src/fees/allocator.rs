// Jaspel allocation: exactly one staff category is paid per procedure.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{FeeRecipient, StaffAssignment, StaffCategory};
use crate::money::{Money, Percentage};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    #[error("more than one staff category holds a fee: {categories:?}")]
    InvalidAssignment { categories: Vec<StaffCategory> },
    #[error("{field} must not be negative, got {amount}")]
    NegativeAmount { field: &'static str, amount: Money },
}

/// Fee fields of a procedure. At most one of them is positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeeSplit {
    pub doctor_fee: Money,
    pub paramedic_fee: Money,
    pub non_paramedic_fee: Money,
}

impl FeeSplit {
    pub fn zero() -> Self {
        Self::default()
    }

    fn for_category(category: StaffCategory, amount: Money) -> Self {
        let mut split = Self::zero();
        match category {
            StaffCategory::Doctor => split.doctor_fee = amount,
            StaffCategory::Paramedic => split.paramedic_fee = amount,
            StaffCategory::NonParamedic => split.non_paramedic_fee = amount,
        }
        split
    }

    pub fn fee_for(&self, category: StaffCategory) -> Money {
        match category {
            StaffCategory::Doctor => self.doctor_fee,
            StaffCategory::Paramedic => self.paramedic_fee,
            StaffCategory::NonParamedic => self.non_paramedic_fee,
        }
    }

    pub fn positive_categories(&self) -> Vec<StaffCategory> {
        [StaffCategory::Doctor, StaffCategory::Paramedic, StaffCategory::NonParamedic]
            .into_iter()
            .filter(|c| self.fee_for(*c).is_positive())
            .collect()
    }

    /// Category holding the fee, `None` when every field is zero.
    pub fn recipient_category(&self) -> Option<StaffCategory> {
        self.positive_categories().first().copied()
    }

    /// The paid amount, or zero.
    pub fn allocated(&self) -> Money {
        self.recipient_category()
            .map(|c| self.fee_for(c))
            .unwrap_or(Money::ZERO)
    }

    pub fn ensure_exclusive(&self) -> Result<(), AllocationError> {
        let categories = self.positive_categories();
        if categories.len() > 1 {
            return Err(AllocationError::InvalidAssignment { categories });
        }
        for category in [StaffCategory::Doctor, StaffCategory::Paramedic, StaffCategory::NonParamedic] {
            let amount = self.fee_for(category);
            if amount.is_negative() {
                return Err(AllocationError::NegativeAmount { field: category.as_str(), amount });
            }
        }
        Ok(())
    }
}

/// Compute the jaspel split for a procedure.
///
/// Doctor and paramedic fees are `tariff * percentage / 100` (half-up to a
/// whole unit); a non-paramedic receives the flat fee instead. Only the
/// highest-precedence assigned category is paid.
pub fn allocate(
    tariff: Money,
    non_paramedic_flat_fee: Money,
    assignment: &StaffAssignment,
    percentage: Percentage,
) -> Result<FeeSplit, AllocationError> {
    if tariff.is_negative() {
        return Err(AllocationError::NegativeAmount { field: "tariff", amount: tariff });
    }
    if non_paramedic_flat_fee.is_negative() {
        return Err(AllocationError::NegativeAmount {
            field: "non_paramedic_flat_fee",
            amount: non_paramedic_flat_fee,
        });
    }

    let split = match assignment.fee_recipient() {
        FeeRecipient::Doctor(_) => FeeSplit::for_category(StaffCategory::Doctor, tariff.percentage_of(percentage)),
        FeeRecipient::Paramedic(_) => {
            FeeSplit::for_category(StaffCategory::Paramedic, tariff.percentage_of(percentage))
        }
        FeeRecipient::NonParamedic(_) => FeeSplit::for_category(StaffCategory::NonParamedic, non_paramedic_flat_fee),
        FeeRecipient::None => FeeSplit::zero(),
    };

    split.ensure_exclusive()?;
    Ok(split)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StaffId;

    fn pct(v: u32) -> Percentage {
        Percentage::new(v).unwrap()
    }

    #[test]
    fn test_doctor_takes_percentage_of_tariff() {
        let assignment = StaffAssignment::none().with_doctor(StaffId::new());
        let split = allocate(Money::from_major(100_000), Money::from_major(15_000), &assignment, pct(40)).unwrap();

        assert_eq!(split.doctor_fee, Money::from_major(40_000));
        assert_eq!(split.paramedic_fee, Money::ZERO);
        assert_eq!(split.non_paramedic_fee, Money::ZERO);
    }

    #[test]
    fn test_doctor_beats_paramedic() {
        let assignment = StaffAssignment::none()
            .with_doctor(StaffId::new())
            .with_paramedic(StaffId::new());
        let split = allocate(Money::from_major(100_000), Money::ZERO, &assignment, pct(40)).unwrap();

        assert_eq!(split.doctor_fee, Money::from_major(40_000));
        assert_eq!(split.paramedic_fee, Money::ZERO);
        assert_eq!(split.recipient_category(), Some(StaffCategory::Doctor));
    }

    #[test]
    fn test_paramedic_when_no_doctor() {
        let assignment = StaffAssignment::none()
            .with_paramedic(StaffId::new())
            .with_non_paramedic(StaffId::new());
        let split = allocate(Money::from_major(75_000), Money::from_major(10_000), &assignment, pct(40)).unwrap();

        assert_eq!(split.paramedic_fee, Money::from_major(30_000));
        assert_eq!(split.non_paramedic_fee, Money::ZERO);
    }

    #[test]
    fn test_non_paramedic_gets_flat_fee_not_percentage() {
        let assignment = StaffAssignment::none().with_non_paramedic(StaffId::new());
        let split = allocate(Money::from_major(100_000), Money::from_major(12_500), &assignment, pct(40)).unwrap();

        assert_eq!(split.non_paramedic_fee, Money::from_major(12_500));
        assert_eq!(split.allocated(), Money::from_major(12_500));
    }

    #[test]
    fn test_no_staff_all_zero() {
        let split = allocate(Money::from_major(100_000), Money::from_major(5_000), &StaffAssignment::none(), pct(40)).unwrap();
        assert_eq!(split, FeeSplit::zero());
        assert_eq!(split.recipient_category(), None);
    }

    #[test]
    fn test_rejects_negative_tariff() {
        let assignment = StaffAssignment::none().with_doctor(StaffId::new());
        let err = allocate(Money::from_minor(-1), Money::ZERO, &assignment, pct(40)).unwrap_err();
        assert!(matches!(err, AllocationError::NegativeAmount { field: "tariff", .. }));
    }

    #[test]
    fn test_ensure_exclusive_flags_two_positive_fees() {
        let corrupt = FeeSplit {
            doctor_fee: Money::from_major(1),
            paramedic_fee: Money::from_major(1),
            non_paramedic_fee: Money::ZERO,
        };
        assert_eq!(
            corrupt.ensure_exclusive(),
            Err(AllocationError::InvalidAssignment {
                categories: vec![StaffCategory::Doctor, StaffCategory::Paramedic]
            })
        );
    }
}
