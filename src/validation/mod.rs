// Procedure validation workflow: state machine, auto-approval and the
// orchestrator that ties them to storage and notifications.

pub mod orchestrator;
pub mod policy;
pub mod state_machine;

pub use orchestrator::{DraftUpdate, NewProcedure, SubmissionOutcome, ValidationWorkflowOrchestrator};
pub use policy::{AutoApprovalConfig, AutoApprovalPolicy, FeeCeilingPolicy, NeverAutoApprove, PolicyConfig};
pub use state_machine::{EventKind, TransitionError, TransitionPlan, ValidationEvent};
