use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::StaffId;

/// Mutually exclusive fee recipient categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffCategory {
    Doctor,
    Paramedic,
    NonParamedic,
}

impl StaffCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffCategory::Doctor => "doctor",
            StaffCategory::Paramedic => "paramedic",
            StaffCategory::NonParamedic => "non_paramedic",
        }
    }
}

impl fmt::Display for StaffCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Staff attached to a procedure, at most one per category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffAssignment {
    pub doctor: Option<StaffId>,
    pub paramedic: Option<StaffId>,
    pub non_paramedic: Option<StaffId>,
}

/// The single staff member who receives the fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeRecipient {
    None,
    Doctor(StaffId),
    Paramedic(StaffId),
    NonParamedic(StaffId),
}

impl FeeRecipient {
    pub fn category(&self) -> Option<StaffCategory> {
        match self {
            FeeRecipient::None => None,
            FeeRecipient::Doctor(_) => Some(StaffCategory::Doctor),
            FeeRecipient::Paramedic(_) => Some(StaffCategory::Paramedic),
            FeeRecipient::NonParamedic(_) => Some(StaffCategory::NonParamedic),
        }
    }
}

impl StaffAssignment {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_doctor(mut self, id: StaffId) -> Self {
        self.doctor = Some(id);
        self
    }

    pub fn with_paramedic(mut self, id: StaffId) -> Self {
        self.paramedic = Some(id);
        self
    }

    pub fn with_non_paramedic(mut self, id: StaffId) -> Self {
        self.non_paramedic = Some(id);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.doctor.is_none() && self.paramedic.is_none() && self.non_paramedic.is_none()
    }

    /// Doctor beats paramedic beats non-paramedic.
    pub fn fee_recipient(&self) -> FeeRecipient {
        match (self.doctor, self.paramedic, self.non_paramedic) {
            (Some(id), _, _) => FeeRecipient::Doctor(id),
            (None, Some(id), _) => FeeRecipient::Paramedic(id),
            (None, None, Some(id)) => FeeRecipient::NonParamedic(id),
            (None, None, None) => FeeRecipient::None,
        }
    }

    pub fn assigned_categories(&self) -> Vec<StaffCategory> {
        let mut categories = Vec::with_capacity(3);
        if self.doctor.is_some() {
            categories.push(StaffCategory::Doctor);
        }
        if self.paramedic.is_some() {
            categories.push(StaffCategory::Paramedic);
        }
        if self.non_paramedic.is_some() {
            categories.push(StaffCategory::NonParamedic);
        }
        categories
    }
}
