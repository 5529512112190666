//! Persistence for procedures, the procedure catalog and the decision audit
//! trail.
//!
//! Stores guard every write with a compare-and-set on the procedure's
//! `version`: a commit only lands when the stored version still equals the
//! version the caller loaded, and the optional audit record is written in the
//! same atomic unit.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Procedure, ProcedureId, ProcedureType, ProcedureTypeId, ValidationDecision};

pub mod memory;
#[cfg(feature = "database")]
pub mod sqlite;

pub use memory::InMemoryStore;
#[cfg(feature = "database")]
pub use sqlite::SqliteStore;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("procedure {procedure_id} not found")]
    NotFound { procedure_id: ProcedureId },

    #[error("procedure type {procedure_type_id} not found")]
    ProcedureTypeNotFound { procedure_type_id: ProcedureTypeId },

    #[error("procedure {procedure_id} already exists")]
    AlreadyExists { procedure_id: ProcedureId },

    #[error("procedure {procedure_id} is no longer at version {expected}")]
    VersionConflict { procedure_id: ProcedureId, expected: u64 },

    #[error("procedure type {procedure_type_id} is referenced by completed procedures; its pricing cannot change")]
    CatalogImmutable { procedure_type_id: ProcedureTypeId },

    #[error("storage backend error: {message}")]
    Backend { message: String },
}

#[async_trait]
pub trait ProcedureStore: Send + Sync {
    async fn procedure_type(&self, id: ProcedureTypeId) -> Result<ProcedureType, StoreError>;

    /// Create or edit a catalog entry.
    ///
    /// Pricing of a type referenced by a completed procedure is frozen.
    async fn save_procedure_type(&self, procedure_type: &ProcedureType) -> Result<(), StoreError>;

    async fn load(&self, id: ProcedureId) -> Result<Procedure, StoreError>;

    async fn insert(&self, procedure: &Procedure) -> Result<(), StoreError>;

    /// Replace the stored procedure if its version is still `expected_version`,
    /// appending `decision` in the same atomic unit.
    async fn commit(
        &self,
        procedure: &Procedure,
        expected_version: u64,
        decision: Option<&ValidationDecision>,
    ) -> Result<(), StoreError>;

    /// Audit trail in insertion order.
    async fn decisions(&self, id: ProcedureId) -> Result<Vec<ValidationDecision>, StoreError>;

    /// Release backend connections. Calls made after closing fail with
    /// `Backend`.
    async fn close(&self) {}
}
