//! Entry point of the validation workflow.
//!
//! Every operation is one atomic unit against the stored procedure: load,
//! plan the transition, recompute fees where needed, then a single
//! compare-and-set commit that also carries the audit record. Notifications
//! go out only after the commit has landed, and never affect the result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn, Instrument};

use crate::domain::{
    ActorId, DecisionAction, OperationalStatus, PatientId, Procedure, ProcedureId, ProcedureTypeId, ShiftId,
    StaffAssignment, ValidationDecision, ValidationStatus,
};
use crate::error::{WorkflowError, WorkflowResult};
use crate::fees::allocate;
use crate::notify::{
    NotificationDispatcher, NotificationEvent, NotificationKind, NotificationPayload, NotificationSink, TracingSink,
};
use crate::observability::{OperationTimer, WorkflowMetrics, WorkflowStats};
use crate::store::ProcedureStore;
use crate::telemetry::{create_workflow_span, generate_correlation_id};
use crate::validation::policy::{AutoApprovalPolicy, FeeCeilingPolicy, PolicyConfig};
use crate::validation::state_machine::{
    ensure_cancellable, ensure_editable, plan_transition, TransitionPlan, ValidationEvent,
};

const AUTO_APPROVAL_REASON: &str = "fee below auto-approval ceiling";

/// Input for recording a newly performed procedure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProcedure {
    pub procedure_type_id: ProcedureTypeId,
    pub patient_id: PatientId,
    pub performed_at: DateTime<Utc>,
    #[serde(default)]
    pub shift_id: Option<ShiftId>,
    #[serde(default)]
    pub staff: StaffAssignment,
    pub created_by: ActorId,
}

/// Edits allowed while a procedure is still editable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DraftUpdate {
    #[serde(default)]
    pub staff: Option<StaffAssignment>,
    #[serde(default)]
    pub procedure_type_id: Option<ProcedureTypeId>,
}

/// Result of `submit_for_validation` / `resubmit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionOutcome {
    /// `approved` when auto-approved, otherwise `submitted`.
    pub status: ValidationStatus,
    pub auto_approved: bool,
    pub procedure: Procedure,
    pub decision: Option<ValidationDecision>,
}

pub struct ValidationWorkflowOrchestrator {
    store: Arc<dyn ProcedureStore>,
    policy: Arc<dyn AutoApprovalPolicy>,
    config: PolicyConfig,
    notifier: NotificationDispatcher,
    metrics: Arc<WorkflowMetrics>,
}

impl std::fmt::Debug for ValidationWorkflowOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationWorkflowOrchestrator")
            .field("config", &self.config)
            .field("metrics", &self.metrics.snapshot())
            .finish()
    }
}

impl ValidationWorkflowOrchestrator {
    /// Orchestrator with the fee-ceiling policy and a log-only sink.
    pub fn new(store: Arc<dyn ProcedureStore>, config: PolicyConfig) -> Self {
        let metrics = Arc::new(WorkflowMetrics::new());
        Self {
            store,
            policy: Arc::new(FeeCeilingPolicy),
            config,
            notifier: NotificationDispatcher::new(Arc::new(TracingSink), Arc::clone(&metrics)),
            metrics,
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn AutoApprovalPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.notifier = NotificationDispatcher::new(sink, Arc::clone(&self.metrics));
        self
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn metrics(&self) -> WorkflowStats {
        self.metrics.snapshot()
    }

    pub fn log_metrics(&self) {
        self.metrics.log_stats();
    }

    /// Wait until every notification emitted so far has been delivered or
    /// has failed.
    pub async fn flush_notifications(&self) {
        self.notifier.flush().await;
    }

    pub async fn procedure(&self, id: ProcedureId) -> WorkflowResult<Procedure> {
        self.store
            .load(id)
            .await
            .map_err(|e| WorkflowError::from_store(id, e))
    }

    pub async fn decisions(&self, id: ProcedureId) -> WorkflowResult<Vec<ValidationDecision>> {
        // Distinguish "no decisions yet" from "no such procedure".
        self.procedure(id).await?;
        self.store
            .decisions(id)
            .await
            .map_err(|e| WorkflowError::from_store(id, e))
    }

    /// Record a performed procedure in `pending`/`pending`, snapshotting the
    /// catalog tariff and computing its fee split.
    pub async fn register_procedure(&self, input: NewProcedure) -> WorkflowResult<Procedure> {
        let id = ProcedureId::new();
        let span = create_workflow_span(
            "register",
            Some(id.to_string().as_str()),
            Some(input.created_by.as_str()),
            &generate_correlation_id(),
        );

        async move {
            let _timer = OperationTimer::new("register");
            let procedure_type = self
                .store
                .procedure_type(input.procedure_type_id)
                .await
                .map_err(|e| WorkflowError::from_store(id, e))?;

            if !procedure_type.active {
                return Err(WorkflowError::ValidationFailed {
                    procedure_id: id,
                    reason: format!("procedure type '{}' is inactive", procedure_type.name),
                });
            }

            let fees = allocate(
                procedure_type.tariff,
                procedure_type.non_paramedic_fee,
                &input.staff,
                self.config.fee_percentage,
            )
            .map_err(|e| WorkflowError::from_allocation(id, e))?;

            let procedure = Procedure {
                id,
                procedure_type_id: procedure_type.id,
                patient_id: input.patient_id,
                performed_at: input.performed_at,
                shift_id: input.shift_id,
                tariff: procedure_type.tariff,
                non_paramedic_flat_fee: procedure_type.non_paramedic_fee,
                staff: input.staff,
                fees,
                status: OperationalStatus::Pending,
                validation_status: ValidationStatus::Pending,
                submitted_at: None,
                created_by: input.created_by,
                version: 0,
            };

            self.store
                .insert(&procedure)
                .await
                .map_err(|e| WorkflowError::from_store(id, e))?;

            info!(
                procedure.id = %procedure.id,
                procedure_type = %procedure_type.name,
                tariff = %procedure.tariff,
                allocated_fee = %procedure.fees.allocated(),
                "Procedure registered"
            );
            Ok(procedure)
        }
        .instrument(span)
        .await
    }

    /// Change staff and/or procedure type while the procedure is editable.
    /// Fees are recomputed in the same commit.
    pub async fn update_draft(&self, id: ProcedureId, update: DraftUpdate) -> WorkflowResult<Procedure> {
        let span = create_workflow_span("edit", Some(id.to_string().as_str()), None, &generate_correlation_id());

        async move {
            let current = self.procedure(id).await?;
            ensure_editable(&current).map_err(|e| self.observe(WorkflowError::from_transition(id, e)))?;

            let mut next = current.clone();
            if let Some(staff) = update.staff {
                next.staff = staff;
            }
            if let Some(type_id) = update.procedure_type_id {
                if type_id != current.procedure_type_id {
                    let procedure_type = self
                        .store
                        .procedure_type(type_id)
                        .await
                        .map_err(|e| WorkflowError::from_store(id, e))?;
                    if !procedure_type.active {
                        return Err(WorkflowError::ValidationFailed {
                            procedure_id: id,
                            reason: format!("procedure type '{}' is inactive", procedure_type.name),
                        });
                    }
                    next.procedure_type_id = procedure_type.id;
                    next.tariff = procedure_type.tariff;
                    next.non_paramedic_flat_fee = procedure_type.non_paramedic_fee;
                }
            }

            next.fees = self.recompute(&next)?;
            next.version = current.version + 1;
            self.commit(&next, current.version, None).await?;

            info!(
                procedure.id = %id,
                allocated_fee = %next.fees.allocated(),
                recipient = ?next.fees.recipient_category(),
                "Draft updated and fees recomputed"
            );
            Ok(next)
        }
        .instrument(span)
        .await
    }

    /// `pending` → `submitted`, then `approved` when the auto-approval policy
    /// accepts.
    pub async fn submit_for_validation(&self, id: ProcedureId) -> WorkflowResult<SubmissionOutcome> {
        let span = create_workflow_span("submit", Some(id.to_string().as_str()), None, &generate_correlation_id());
        self.submit_with(id, ValidationEvent::Submit).instrument(span).await
    }

    /// `revision_requested` → `submitted`, with the same auto-approval pass
    /// as a first submission.
    pub async fn resubmit(&self, id: ProcedureId) -> WorkflowResult<SubmissionOutcome> {
        let span = create_workflow_span("resubmit", Some(id.to_string().as_str()), None, &generate_correlation_id());
        self.submit_with(id, ValidationEvent::Resubmit).instrument(span).await
    }

    pub async fn approve(&self, id: ProcedureId, actor: &ActorId, reason: &str) -> WorkflowResult<ValidationDecision> {
        let span = create_workflow_span("approve", Some(id.to_string().as_str()), Some(actor.as_str()), &generate_correlation_id());
        self.decide(
            id,
            actor,
            ValidationEvent::Approve {
                reason: reason.trim().to_string(),
            },
            DecisionAction::Approve,
        )
        .instrument(span)
        .await
    }

    pub async fn reject(&self, id: ProcedureId, actor: &ActorId, reason: &str) -> WorkflowResult<ValidationDecision> {
        let span = create_workflow_span("reject", Some(id.to_string().as_str()), Some(actor.as_str()), &generate_correlation_id());
        self.decide(
            id,
            actor,
            ValidationEvent::Reject {
                reason: reason.trim().to_string(),
            },
            DecisionAction::Reject,
        )
        .instrument(span)
        .await
    }

    pub async fn request_revision(
        &self,
        id: ProcedureId,
        actor: &ActorId,
        reason: &str,
    ) -> WorkflowResult<ValidationDecision> {
        let span = create_workflow_span(
            "request_revision",
            Some(id.to_string().as_str()),
            Some(actor.as_str()),
            &generate_correlation_id(),
        );
        self.decide(
            id,
            actor,
            ValidationEvent::RequestRevision {
                reason: reason.trim().to_string(),
            },
            DecisionAction::RequestRevision,
        )
        .instrument(span)
        .await
    }

    /// Administrator override from `approved`/`rejected` back to `pending`.
    /// Callers must check the admin role first.
    pub async fn reopen(&self, id: ProcedureId, actor: &ActorId, reason: &str) -> WorkflowResult<ValidationDecision> {
        let span = create_workflow_span("reopen", Some(id.to_string().as_str()), Some(actor.as_str()), &generate_correlation_id());
        self.decide(
            id,
            actor,
            ValidationEvent::Reopen {
                reason: reason.trim().to_string(),
            },
            DecisionAction::Reopen,
        )
        .instrument(span)
        .await
    }

    /// Mark the procedure cancelled. Already-cancelled procedures are
    /// returned unchanged.
    pub async fn cancel(&self, id: ProcedureId, actor: &ActorId) -> WorkflowResult<Procedure> {
        let span = create_workflow_span("cancel", Some(id.to_string().as_str()), Some(actor.as_str()), &generate_correlation_id());

        async {
            let current = self.procedure(id).await?;
            ensure_cancellable(&current).map_err(|e| self.observe(WorkflowError::from_transition(id, e)))?;

            if current.is_cancelled() {
                return Ok(current);
            }

            let mut next = current.clone();
            next.status = OperationalStatus::Cancelled;
            next.version = current.version + 1;
            self.commit(&next, current.version, None).await?;

            info!(procedure.id = %id, actor.id = %actor, "Procedure cancelled");
            Ok(next)
        }
        .instrument(span)
        .await
    }

    async fn submit_with(&self, id: ProcedureId, event: ValidationEvent) -> WorkflowResult<SubmissionOutcome> {
        let _timer = OperationTimer::new("submit");
        let current = self.procedure(id).await?;
        let now = Utc::now();

        let plan = plan_transition(&current, &event, now)
            .map_err(|e| self.observe(WorkflowError::from_transition(id, e)))?;

        let mut next = current.clone();
        next.fees = self.recompute(&next)?;
        plan.apply(&mut next);

        let auto_approved = self.policy.should_auto_approve(&next, &self.config);
        let auto_plan = if auto_approved {
            let auto_plan = plan_transition(&next, &ValidationEvent::AutoApprove, now)
                .map_err(|e| self.observe(WorkflowError::from_transition(id, e)))?;
            auto_plan.apply(&mut next);
            Some(auto_plan)
        } else {
            None
        };
        let decision = auto_plan.as_ref().map(|_| {
            ValidationDecision::new(id, ActorId::system(), DecisionAction::AutoApprove, AUTO_APPROVAL_REASON)
        });

        next.version = current.version + 1;
        self.commit(&next, current.version, decision.as_ref()).await?;
        self.log_transition(id, &plan);
        if let Some(auto_plan) = &auto_plan {
            self.log_transition(id, auto_plan);
        }

        self.metrics.record_submission();
        let kind = if auto_approved {
            self.metrics.record_auto_approval();
            NotificationKind::AutoApproved
        } else {
            NotificationKind::SubmittedForReview
        };
        self.notify(kind, &next, next.created_by.clone(), None);

        Ok(SubmissionOutcome {
            status: next.validation_status,
            auto_approved,
            procedure: next,
            decision,
        })
    }

    async fn decide(
        &self,
        id: ProcedureId,
        actor: &ActorId,
        event: ValidationEvent,
        action: DecisionAction,
    ) -> WorkflowResult<ValidationDecision> {
        let _timer = OperationTimer::new(action.as_str());
        let current = self.procedure(id).await?;

        let plan = plan_transition(&current, &event, Utc::now())
            .map_err(|e| self.observe(WorkflowError::from_transition(id, e)))?;
        current
            .fees
            .ensure_exclusive()
            .map_err(|e| self.observe(WorkflowError::from_allocation(id, e)))?;

        let mut next = current.clone();
        plan.apply(&mut next);
        next.version = current.version + 1;

        let reason = event.reason().unwrap_or_default().to_string();
        let decision = ValidationDecision::new(id, actor.clone(), action, reason.clone());
        self.commit(&next, current.version, Some(&decision)).await?;
        self.log_transition(id, &plan);

        let kind = match action {
            DecisionAction::Approve | DecisionAction::AutoApprove => {
                self.metrics.record_approval();
                NotificationKind::Approved
            }
            DecisionAction::Reject => {
                self.metrics.record_rejection();
                NotificationKind::Rejected
            }
            DecisionAction::RequestRevision => {
                self.metrics.record_revision_request();
                NotificationKind::RevisionRequested
            }
            DecisionAction::Reopen => {
                self.metrics.record_reopen();
                NotificationKind::Reopened
            }
        };
        let reason = if reason.is_empty() { None } else { Some(reason) };
        self.notify(kind, &next, actor.clone(), reason);

        Ok(decision)
    }

    fn recompute(&self, procedure: &Procedure) -> WorkflowResult<crate::fees::FeeSplit> {
        allocate(
            procedure.tariff,
            procedure.non_paramedic_flat_fee,
            &procedure.staff,
            self.config.fee_percentage,
        )
        .map_err(|e| self.observe(WorkflowError::from_allocation(procedure.id, e)))
    }

    async fn commit(
        &self,
        procedure: &Procedure,
        expected_version: u64,
        decision: Option<&ValidationDecision>,
    ) -> WorkflowResult<()> {
        self.store
            .commit(procedure, expected_version, decision)
            .await
            .map_err(|e| self.observe(WorkflowError::from_store(procedure.id, e)))
    }

    fn observe(&self, err: WorkflowError) -> WorkflowError {
        match &err {
            WorkflowError::IllegalTransition { .. } => self.metrics.record_illegal_transition(),
            WorkflowError::ConcurrentModification { .. } => self.metrics.record_conflict(),
            _ => {}
        }
        warn!(procedure.id = %err.procedure_id(), kind = %err.kind(), error = %err, "Workflow operation refused");
        err
    }

    fn log_transition(&self, id: ProcedureId, plan: &TransitionPlan) {
        info!(
            procedure.id = %id,
            from = %plan.from,
            to = %plan.to,
            event = %plan.event,
            "Validation status transition"
        );
    }

    fn notify(&self, kind: NotificationKind, procedure: &Procedure, actor: ActorId, reason: Option<String>) {
        self.notifier.dispatch(NotificationEvent {
            kind,
            procedure_id: procedure.id,
            payload: NotificationPayload {
                validation_status: procedure.validation_status,
                actor,
                reason,
                allocated_fee: procedure.fees.allocated(),
            },
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ProcedureType, StaffId};
    use crate::error::ErrorKind;
    use crate::money::Money;
    use crate::store::InMemoryStore;
    use crate::validation::policy::AutoApprovalConfig;

    async fn setup(config: PolicyConfig) -> (ValidationWorkflowOrchestrator, Arc<InMemoryStore>, ProcedureType) {
        let store = Arc::new(InMemoryStore::new());
        let procedure_type = ProcedureType::new("Minor surgery", Money::from_major(100_000), Money::from_major(15_000));
        store.save_procedure_type(&procedure_type).await.unwrap();
        let orchestrator = ValidationWorkflowOrchestrator::new(store.clone(), config);
        (orchestrator, store, procedure_type)
    }

    fn new_procedure(procedure_type: &ProcedureType, staff: StaffAssignment) -> NewProcedure {
        NewProcedure {
            procedure_type_id: procedure_type.id,
            patient_id: PatientId::new(),
            performed_at: Utc::now(),
            shift_id: None,
            staff,
            created_by: ActorId::new("operator.rina"),
        }
    }

    #[tokio::test]
    async fn test_register_snapshots_tariff_and_fees() {
        let (orchestrator, store, mut procedure_type) = setup(PolicyConfig::default()).await;
        let p = orchestrator
            .register_procedure(new_procedure(&procedure_type, StaffAssignment::none().with_doctor(StaffId::new())))
            .await
            .unwrap();

        assert_eq!(p.tariff, Money::from_major(100_000));
        assert_eq!(p.fees.doctor_fee, Money::from_major(40_000));
        assert_eq!(p.validation_status, ValidationStatus::Pending);

        // Catalog price change does not reach the existing procedure.
        procedure_type.tariff = Money::from_major(120_000);
        store.save_procedure_type(&procedure_type).await.unwrap();
        assert_eq!(orchestrator.procedure(p.id).await.unwrap().tariff, Money::from_major(100_000));
    }

    #[tokio::test]
    async fn test_register_rejects_inactive_type() {
        let (orchestrator, store, mut procedure_type) = setup(PolicyConfig::default()).await;
        procedure_type.active = false;
        store.save_procedure_type(&procedure_type).await.unwrap();

        let err = orchestrator
            .register_procedure(new_procedure(&procedure_type, StaffAssignment::none()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
        assert_eq!(store.procedure_count().await, 0);
    }

    #[tokio::test]
    async fn test_update_draft_recomputes_fees() {
        let (orchestrator, _store, procedure_type) = setup(PolicyConfig::default()).await;
        let p = orchestrator
            .register_procedure(new_procedure(&procedure_type, StaffAssignment::none()))
            .await
            .unwrap();
        assert_eq!(p.fees.allocated(), Money::ZERO);

        let updated = orchestrator
            .update_draft(
                p.id,
                DraftUpdate {
                    staff: Some(StaffAssignment::none().with_non_paramedic(StaffId::new())),
                    procedure_type_id: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.fees.non_paramedic_fee, Money::from_major(15_000));
        assert_eq!(updated.version, 1);
    }

    #[tokio::test]
    async fn test_update_draft_frozen_after_submit() {
        let (orchestrator, _store, procedure_type) = setup(PolicyConfig::default()).await;
        let p = orchestrator
            .register_procedure(new_procedure(&procedure_type, StaffAssignment::none().with_doctor(StaffId::new())))
            .await
            .unwrap();
        orchestrator.submit_for_validation(p.id).await.unwrap();

        let err = orchestrator.update_draft(p.id, DraftUpdate::default()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IllegalTransition);
        assert_eq!(orchestrator.metrics().illegal_transitions, 1);
    }

    #[tokio::test]
    async fn test_submit_without_ceiling_waits_for_review() {
        let (orchestrator, store, procedure_type) = setup(PolicyConfig::default()).await;
        let p = orchestrator
            .register_procedure(new_procedure(&procedure_type, StaffAssignment::none().with_paramedic(StaffId::new())))
            .await
            .unwrap();

        let outcome = orchestrator.submit_for_validation(p.id).await.unwrap();
        assert_eq!(outcome.status, ValidationStatus::Submitted);
        assert!(!outcome.auto_approved);
        assert!(outcome.procedure.submitted_at.is_some());
        assert_eq!(store.decision_count().await, 0);
    }

    #[tokio::test]
    async fn test_submit_uses_current_percentage() {
        let config = PolicyConfig::default().with_auto_approval(AutoApprovalConfig::below(Money::from_major(35_000)));
        let (orchestrator, _store, procedure_type) = setup(config).await;
        let p = orchestrator
            .register_procedure(new_procedure(&procedure_type, StaffAssignment::none().with_doctor(StaffId::new())))
            .await
            .unwrap();

        // 40% of 100,000 is not below 35,000.
        let outcome = orchestrator.submit_for_validation(p.id).await.unwrap();
        assert!(!outcome.auto_approved);
        assert_eq!(outcome.procedure.fees.doctor_fee, Money::from_major(40_000));
    }

    #[tokio::test]
    async fn test_cancel_then_approve_keeps_cancelled() {
        let (orchestrator, _store, procedure_type) = setup(PolicyConfig::default()).await;
        let actor = ActorId::new("validator.dewi");
        let p = orchestrator
            .register_procedure(new_procedure(&procedure_type, StaffAssignment::none().with_doctor(StaffId::new())))
            .await
            .unwrap();
        orchestrator.submit_for_validation(p.id).await.unwrap();
        orchestrator.cancel(p.id, &actor).await.unwrap();
        orchestrator.approve(p.id, &actor, "").await.unwrap();

        let stored = orchestrator.procedure(p.id).await.unwrap();
        assert_eq!(stored.validation_status, ValidationStatus::Approved);
        assert_eq!(stored.status, OperationalStatus::Cancelled);
        assert_eq!(orchestrator.cancel(p.id, &actor).await.unwrap_err().kind(), ErrorKind::IllegalTransition);
    }

    #[tokio::test]
    async fn test_reopen_requires_terminal_state_and_reason() {
        let (orchestrator, _store, procedure_type) = setup(PolicyConfig::default()).await;
        let admin = ActorId::new("admin");
        let p = orchestrator
            .register_procedure(new_procedure(&procedure_type, StaffAssignment::none().with_doctor(StaffId::new())))
            .await
            .unwrap();
        orchestrator.submit_for_validation(p.id).await.unwrap();

        assert_eq!(
            orchestrator.reopen(p.id, &admin, "typo").await.unwrap_err().kind(),
            ErrorKind::IllegalTransition
        );

        orchestrator.reject(p.id, &admin, "duplicate").await.unwrap();
        assert_eq!(
            orchestrator.reopen(p.id, &admin, " ").await.unwrap_err().kind(),
            ErrorKind::ValidationFailed
        );

        let decision = orchestrator.reopen(p.id, &admin, "entered against wrong patient").await.unwrap();
        assert_eq!(decision.action, DecisionAction::Reopen);
        assert_eq!(
            orchestrator.procedure(p.id).await.unwrap().validation_status,
            ValidationStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_corrupt_fee_split_blocks_decision() {
        let (orchestrator, store, procedure_type) = setup(PolicyConfig::default()).await;
        let p = orchestrator
            .register_procedure(new_procedure(&procedure_type, StaffAssignment::none().with_doctor(StaffId::new())))
            .await
            .unwrap();
        let submitted = orchestrator.submit_for_validation(p.id).await.unwrap().procedure;

        let mut corrupt = submitted.clone();
        corrupt.fees.paramedic_fee = Money::from_major(1);
        corrupt.version += 1;
        store.commit(&corrupt, submitted.version, None).await.unwrap();

        let err = orchestrator.approve(p.id, &ActorId::new("validator"), "").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAssignment);
        assert_eq!(
            orchestrator.procedure(p.id).await.unwrap().validation_status,
            ValidationStatus::Submitted
        );
    }

    #[tokio::test]
    async fn test_decisions_of_unknown_procedure() {
        let (orchestrator, _store, _procedure_type) = setup(PolicyConfig::default()).await;
        let err = orchestrator.decisions(ProcedureId::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
