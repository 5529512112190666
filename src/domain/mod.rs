// Domain types for procedures, staff and validation decisions

pub mod decision;
pub mod ids;
pub mod procedure;
pub mod staff;

pub use decision::{DecisionAction, ValidationDecision};
pub use ids::{ActorId, DecisionId, PatientId, ProcedureId, ProcedureTypeId, ShiftId, StaffId};
pub use procedure::{OperationalStatus, Procedure, ProcedureType, ValidationStatus};
pub use staff::{FeeRecipient, StaffAssignment, StaffCategory};
