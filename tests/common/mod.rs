// Shared fixtures for the workflow integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Barrier;

use jaspel_engine::domain::{
    ActorId, PatientId, Procedure, ProcedureId, ProcedureType, ProcedureTypeId, StaffAssignment, StaffId,
    ValidationDecision,
};
use jaspel_engine::store::{InMemoryStore, ProcedureStore, StoreError};
use jaspel_engine::validation::{NewProcedure, PolicyConfig, ValidationWorkflowOrchestrator};
use jaspel_engine::Money;

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub orchestrator: ValidationWorkflowOrchestrator,
    pub procedure_type: ProcedureType,
}

pub async fn harness(config: PolicyConfig) -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let procedure_type = minor_surgery();
    store.save_procedure_type(&procedure_type).await.unwrap();
    let orchestrator = ValidationWorkflowOrchestrator::new(store.clone(), config);
    Harness {
        store,
        orchestrator,
        procedure_type,
    }
}

pub fn minor_surgery() -> ProcedureType {
    ProcedureType::new("Minor surgery", Money::from_major(100_000), Money::from_major(15_000))
}

pub fn doctor_only() -> StaffAssignment {
    StaffAssignment::none().with_doctor(StaffId::new())
}

pub fn new_procedure(procedure_type_id: ProcedureTypeId, staff: StaffAssignment) -> NewProcedure {
    NewProcedure {
        procedure_type_id,
        patient_id: PatientId::new(),
        performed_at: Utc::now(),
        shift_id: None,
        staff,
        created_by: ActorId::new("operator.rina"),
    }
}

pub fn validator() -> ActorId {
    ActorId::new("validator.dewi")
}

impl Harness {
    pub async fn register(&self, staff: StaffAssignment) -> Procedure {
        self.orchestrator
            .register_procedure(new_procedure(self.procedure_type.id, staff))
            .await
            .unwrap()
    }

    pub async fn submitted(&self) -> Procedure {
        let procedure = self.register(doctor_only()).await;
        self.orchestrator
            .submit_for_validation(procedure.id)
            .await
            .unwrap()
            .procedure
    }
}

/// Store whose next `parties` loads wait for each other once armed, so
/// concurrent callers all read the same version before any of them commits.
pub struct RendezvousStore {
    inner: InMemoryStore,
    parties: usize,
    barrier: Barrier,
    waiting: AtomicUsize,
}

impl RendezvousStore {
    pub fn new(parties: usize) -> Self {
        Self {
            inner: InMemoryStore::new(),
            parties,
            barrier: Barrier::new(parties),
            waiting: AtomicUsize::new(0),
        }
    }

    pub fn arm(&self) {
        self.waiting.store(self.parties, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProcedureStore for RendezvousStore {
    async fn procedure_type(&self, id: ProcedureTypeId) -> Result<ProcedureType, StoreError> {
        self.inner.procedure_type(id).await
    }

    async fn save_procedure_type(&self, procedure_type: &ProcedureType) -> Result<(), StoreError> {
        self.inner.save_procedure_type(procedure_type).await
    }

    async fn load(&self, id: ProcedureId) -> Result<Procedure, StoreError> {
        let procedure = self.inner.load(id).await;
        let gated = self
            .waiting
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if gated {
            self.barrier.wait().await;
        }
        procedure
    }

    async fn insert(&self, procedure: &Procedure) -> Result<(), StoreError> {
        self.inner.insert(procedure).await
    }

    async fn commit(
        &self,
        procedure: &Procedure,
        expected_version: u64,
        decision: Option<&ValidationDecision>,
    ) -> Result<(), StoreError> {
        self.inner.commit(procedure, expected_version, decision).await
    }

    async fn decisions(&self, id: ProcedureId) -> Result<Vec<ValidationDecision>, StoreError> {
        self.inner.decisions(id).await
    }
}

/// Store whose every call fails with a backend error.
pub struct BrokenStore;

#[async_trait]
impl ProcedureStore for BrokenStore {
    async fn procedure_type(&self, _id: ProcedureTypeId) -> Result<ProcedureType, StoreError> {
        Err(backend())
    }

    async fn save_procedure_type(&self, _procedure_type: &ProcedureType) -> Result<(), StoreError> {
        Err(backend())
    }

    async fn load(&self, _id: ProcedureId) -> Result<Procedure, StoreError> {
        Err(backend())
    }

    async fn insert(&self, _procedure: &Procedure) -> Result<(), StoreError> {
        Err(backend())
    }

    async fn commit(
        &self,
        _procedure: &Procedure,
        _expected_version: u64,
        _decision: Option<&ValidationDecision>,
    ) -> Result<(), StoreError> {
        Err(backend())
    }

    async fn decisions(&self, _id: ProcedureId) -> Result<Vec<ValidationDecision>, StoreError> {
        Err(backend())
    }
}

/// Store that reads and inserts normally but rejects every commit.
#[derive(Default)]
pub struct CommitFailingStore {
    inner: InMemoryStore,
}

#[async_trait]
impl ProcedureStore for CommitFailingStore {
    async fn procedure_type(&self, id: ProcedureTypeId) -> Result<ProcedureType, StoreError> {
        self.inner.procedure_type(id).await
    }

    async fn save_procedure_type(&self, procedure_type: &ProcedureType) -> Result<(), StoreError> {
        self.inner.save_procedure_type(procedure_type).await
    }

    async fn load(&self, id: ProcedureId) -> Result<Procedure, StoreError> {
        self.inner.load(id).await
    }

    async fn insert(&self, procedure: &Procedure) -> Result<(), StoreError> {
        self.inner.insert(procedure).await
    }

    async fn commit(
        &self,
        _procedure: &Procedure,
        _expected_version: u64,
        _decision: Option<&ValidationDecision>,
    ) -> Result<(), StoreError> {
        Err(backend())
    }

    async fn decisions(&self, id: ProcedureId) -> Result<Vec<ValidationDecision>, StoreError> {
        self.inner.decisions(id).await
    }
}

/// Log lines written by a test-local `fmt` subscriber.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Route this thread's tracing output into `logs` until the guard drops.
pub fn capture_logs(logs: &CapturedLogs) -> tracing::subscriber::DefaultGuard {
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    tracing::subscriber::set_default(subscriber)
}

fn backend() -> StoreError {
    StoreError::Backend {
        message: "disk I/O error at /var/lib/jaspel/jaspel.db".to_string(),
    }
}
