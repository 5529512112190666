use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use super::{ProcedureStore, StoreError};
use crate::domain::{
    OperationalStatus, Procedure, ProcedureId, ProcedureType, ProcedureTypeId, ValidationDecision,
};

#[derive(Debug, Default)]
struct Tables {
    procedure_types: HashMap<ProcedureTypeId, ProcedureType>,
    procedures: HashMap<ProcedureId, Procedure>,
    decisions: Vec<ValidationDecision>,
}

/// Process-local store. A single write lock makes each commit atomic.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn procedure_count(&self) -> usize {
        self.tables.read().await.procedures.len()
    }

    pub async fn decision_count(&self) -> usize {
        self.tables.read().await.decisions.len()
    }
}

#[async_trait]
impl ProcedureStore for InMemoryStore {
    async fn procedure_type(&self, id: ProcedureTypeId) -> Result<ProcedureType, StoreError> {
        self.tables
            .read()
            .await
            .procedure_types
            .get(&id)
            .cloned()
            .ok_or(StoreError::ProcedureTypeNotFound { procedure_type_id: id })
    }

    async fn save_procedure_type(&self, procedure_type: &ProcedureType) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;

        if let Some(existing) = tables.procedure_types.get(&procedure_type.id) {
            let referenced_by_completed = tables.procedures.values().any(|p| {
                p.procedure_type_id == procedure_type.id && p.status == OperationalStatus::Completed
            });
            if referenced_by_completed && existing.pricing_differs(procedure_type) {
                return Err(StoreError::CatalogImmutable {
                    procedure_type_id: procedure_type.id,
                });
            }
        }

        tables
            .procedure_types
            .insert(procedure_type.id, procedure_type.clone());
        Ok(())
    }

    async fn load(&self, id: ProcedureId) -> Result<Procedure, StoreError> {
        self.tables
            .read()
            .await
            .procedures
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound { procedure_id: id })
    }

    async fn insert(&self, procedure: &Procedure) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.procedures.contains_key(&procedure.id) {
            return Err(StoreError::AlreadyExists {
                procedure_id: procedure.id,
            });
        }
        tables.procedures.insert(procedure.id, procedure.clone());
        Ok(())
    }

    async fn commit(
        &self,
        procedure: &Procedure,
        expected_version: u64,
        decision: Option<&ValidationDecision>,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;

        let stored = tables
            .procedures
            .get_mut(&procedure.id)
            .ok_or(StoreError::NotFound {
                procedure_id: procedure.id,
            })?;

        if stored.version != expected_version {
            debug!(
                procedure.id = %procedure.id,
                stored_version = stored.version,
                expected_version,
                "Compare-and-set lost"
            );
            return Err(StoreError::VersionConflict {
                procedure_id: procedure.id,
                expected: expected_version,
            });
        }

        *stored = procedure.clone();
        if let Some(decision) = decision {
            tables.decisions.push(decision.clone());
        }
        Ok(())
    }

    async fn decisions(&self, id: ProcedureId) -> Result<Vec<ValidationDecision>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .decisions
            .iter()
            .filter(|d| d.procedure_id == id)
            .cloned()
            .collect())
    }
}
