//! The in-memory state of one open visit.
//!
//! `VisitSession` is an explicit context object passed to every operation that touches an
//! open visit. There is no ambient mutable state in this core: the only process-wide data
//! is the read-only checklist schema registry.
//!
//! Until a commit succeeds, the session's field values are the source of truth for what
//! the clinician has entered; a failed autosave loses nothing.

use crate::store::StoredVisit;
use crate::{VisitError, VisitResult};
use checklist::{schema, ChecklistRecord, VisitType};
use hvn_uuid::VisitId;

/// In-memory state for one open visit.
#[derive(Clone, Debug)]
pub struct VisitSession {
    visit_id: VisitId,
    visit_type: VisitType,
    fields: ChecklistRecord,
    locked: bool,
    rendered_note: Option<String>,
}

impl VisitSession {
    /// Builds a session from a freshly loaded visit.
    pub fn from_stored(stored: StoredVisit) -> Self {
        Self {
            visit_id: stored.visit_id,
            visit_type: stored.visit_type,
            fields: stored.fields,
            locked: stored.locked,
            rendered_note: stored.rendered_note,
        }
    }

    pub fn visit_id(&self) -> &VisitId {
        &self.visit_id
    }

    pub fn visit_type(&self) -> VisitType {
        self.visit_type
    }

    pub fn locked(&self) -> bool {
        self.locked
    }

    pub fn rendered_note(&self) -> Option<&str> {
        self.rendered_note.as_deref()
    }

    /// Returns the current in-memory value for `key`.
    pub fn value(&self, key: &str) -> &str {
        self.fields.value(key)
    }

    /// Clones the full current field mapping. Commits always write a whole snapshot,
    /// never a diff.
    pub fn snapshot(&self) -> ChecklistRecord {
        self.fields.clone()
    }

    /// Applies one field edit, normalising the value for its declared kind.
    ///
    /// # Errors
    ///
    /// Returns [`VisitError::Locked`] once the visit is signed and
    /// [`VisitError::InvalidInput`] for a key the visit type's schema does not declare.
    pub fn apply_edit(&mut self, key: &str, raw: &str) -> VisitResult<()> {
        if self.locked {
            return Err(VisitError::Locked(self.visit_id.clone()));
        }

        let descriptor = schema::descriptor(self.visit_type, key).ok_or_else(|| {
            VisitError::InvalidInput(format!(
                "'{key}' is not a checklist key for {} visits",
                self.visit_type
            ))
        })?;

        self.fields.set_value(&descriptor.kind, descriptor.key, raw);
        Ok(())
    }

    pub(crate) fn mark_locked(&mut self) {
        self.locked = true;
    }

    pub(crate) fn store_rendered_note(&mut self, note: &str) {
        self.rendered_note = Some(note.to_string());
    }
}
