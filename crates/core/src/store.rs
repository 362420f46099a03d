//! The checklist record store boundary.
//!
//! The store is the single source of truth for a visit's checklist fields, rendered note,
//! and lock flag — and the **single authoritative enforcement point** for "signed visits
//! are read-only". Capture surfaces may disable inputs as a courtesy, but correctness
//! never depends on it: every write path, autosave and explicit save alike, funnels
//! through [`VisitStore::set`] and is refused once the lock flag is set.

use crate::{VisitError, VisitResult};
use checklist::{ChecklistRecord, VisitType};
use hvn_uuid::VisitId;

/// One persisted visit, as returned by [`VisitStore::get`].
#[derive(Clone, Debug)]
pub struct StoredVisit {
    pub visit_id: VisitId,
    pub visit_type: VisitType,
    pub fields: ChecklistRecord,
    pub locked: bool,
    pub rendered_note: Option<String>,
}

/// Result of a [`VisitStore::set_lock`] call.
///
/// Locking is idempotent: both variants are successes. The distinction lets the signing
/// flow report a concurrent signer as "already done" rather than as a fresh signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockOutcome {
    NewlyLocked,
    AlreadyLocked,
}

/// Persistence boundary for visit documents.
///
/// Every mutation is a whole-record replace, never a field-level patch: two racing
/// writers can only produce one writer's complete snapshot, never a mixed record.
/// Implementations are free to choose their backing technology; the semantics below are
/// the contract the rest of the core relies on.
pub trait VisitStore: Send + Sync {
    /// Creates a new, unlocked visit of the given type with an empty checklist record.
    fn create(&self, visit_type: VisitType) -> VisitResult<VisitId>;

    /// Loads a visit.
    ///
    /// Declared checklist keys absent from the underlying record are supplied as empty
    /// strings, so callers always see the full declared key set.
    ///
    /// # Errors
    ///
    /// Returns [`VisitError::NotFound`] if the visit does not exist.
    fn get(&self, visit_id: &VisitId) -> VisitResult<StoredVisit>;

    /// Replaces the visit's checklist record with `fields`.
    ///
    /// Unknown keys are dropped with a warning; values are normalised for their declared
    /// kind before storage.
    ///
    /// # Errors
    ///
    /// Returns [`VisitError::Locked`] if the visit has been signed — forever, for every
    /// subsequent attempt. Returns [`VisitError::NotFound`] if the visit does not exist.
    fn set(&self, visit_id: &VisitId, fields: &ChecklistRecord) -> VisitResult<()>;

    /// Persists the rendered narrative note for the visit.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`VisitStore::set`]: refused once locked.
    fn set_rendered_note(&self, visit_id: &VisitId, note: &str) -> VisitResult<()>;

    /// Sets the visit's lock flag.
    ///
    /// Idempotent but irreversible: a second call is a no-op that reports
    /// [`LockOutcome::AlreadyLocked`] and must not alter the stored fields or rendered
    /// note. Once locked, [`VisitStore::set`] fails for this visit forever.
    fn set_lock(&self, visit_id: &VisitId) -> VisitResult<LockOutcome>;
}
