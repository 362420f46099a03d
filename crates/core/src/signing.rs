//! Sign & lock: the irreversible end of the documentation workflow.
//!
//! Signing is a three-step commit against the store:
//!
//! 1. force an immediate whole-record save of the caller's in-memory snapshot, so the
//!    signed record matches exactly what the clinician last saw — not a stale autosave;
//! 2. render the narrative note from that just-saved record and persist it;
//! 3. set the lock flag.
//!
//! A lock observed at *any* step means another signer got there first; that surfaces as
//! [`VisitError::AlreadyLocked`], distinct from a fresh success, so callers can report
//! "already done" instead of raising an error or sending duplicate notifications.

use crate::store::{LockOutcome, VisitStore};
use crate::{VisitError, VisitResult};
use checklist::{render, ChecklistRecord, VisitType};
use hvn_uuid::VisitId;

/// Signs and locks a visit, returning the rendered note that was frozen.
///
/// `snapshot` is the current in-memory checklist; it is saved verbatim (normalised at the
/// store boundary) before rendering, so un-autosaved edits are never lost.
///
/// # Errors
///
/// - [`VisitError::AlreadyLocked`] if a concurrent signer locked the visit first.
/// - [`VisitError::NotFound`] if the visit does not exist.
/// - Store I/O failures propagate unchanged; the visit is left unlocked in that case.
pub fn sign_and_lock<S: VisitStore>(
    store: &S,
    visit_id: &VisitId,
    visit_type: VisitType,
    snapshot: &ChecklistRecord,
) -> VisitResult<String> {
    already_locked_on_lock_failure(store.set(visit_id, snapshot), visit_id)?;

    // Render from the record as stored, not the raw snapshot, so the signed note and the
    // persisted fields can never disagree on normalisation.
    let stored = store.get(visit_id)?;
    let note = render(visit_type, &stored.fields);

    already_locked_on_lock_failure(store.set_rendered_note(visit_id, &note), visit_id)?;

    match store.set_lock(visit_id)? {
        LockOutcome::NewlyLocked => {
            tracing::info!(%visit_id, "visit signed and locked");
            Ok(note)
        }
        LockOutcome::AlreadyLocked => Err(VisitError::AlreadyLocked(visit_id.clone())),
    }
}

/// Maps a `Locked` failure during the signing sequence to `AlreadyLocked`: the only way
/// the record can be locked mid-sign is a concurrent signer.
fn already_locked_on_lock_failure(result: VisitResult<()>, visit_id: &VisitId) -> VisitResult<()> {
    match result {
        Err(VisitError::Locked(_)) => Err(VisitError::AlreadyLocked(visit_id.clone())),
        other => other,
    }
}
