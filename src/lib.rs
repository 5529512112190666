// Jaspel Engine - procedure validation and fee allocation
// Exposes the workflow, its storage seam and the ambient plumbing for the CLI and tests

pub mod authz;
pub mod config;
pub mod domain;
pub mod error;
pub mod fees;
pub mod money;
pub mod notify;
pub mod observability;
pub mod store;
pub mod telemetry;
pub mod validation;

// Re-export key types for easy access
pub use authz::{authorize, Forbidden, GatedOperation, Role, RoleProvider, StaticRoleProvider};
pub use config::{ConfigError, EngineConfig};
pub use domain::{
    ActorId, DecisionAction, OperationalStatus, Procedure, ProcedureId, ProcedureType, StaffAssignment, StaffCategory,
    ValidationDecision, ValidationStatus,
};
pub use error::{ErrorKind, WorkflowError, WorkflowResult};
pub use fees::{allocate, AllocationError, FeeSplit};
pub use money::{Money, Percentage};
pub use notify::{ChannelSink, NoopSink, NotificationEvent, NotificationKind, NotificationSink, TracingSink};
pub use observability::{WorkflowMetrics, WorkflowStats};
pub use store::{InMemoryStore, ProcedureStore, StoreError};
#[cfg(feature = "database")]
pub use store::SqliteStore;
pub use telemetry::{generate_correlation_id, init_telemetry};
pub use validation::{
    AutoApprovalConfig, AutoApprovalPolicy, DraftUpdate, FeeCeilingPolicy, NewProcedure, PolicyConfig,
    SubmissionOutcome, ValidationEvent, ValidationWorkflowOrchestrator,
};
