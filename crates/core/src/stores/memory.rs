//! In-memory visit store.
//!
//! Used by tests and embedding harnesses that do not need durable storage. Semantics
//! match [`FileVisitStore`](super::FileVisitStore): whole-record replace, lock
//! enforcement at the store, conform-on-write.

use crate::store::{LockOutcome, StoredVisit, VisitStore};
use crate::{VisitError, VisitResult};
use checklist::{ChecklistRecord, VisitType};
use hvn_uuid::VisitId;
use std::collections::HashMap;
use std::sync::Mutex;

/// Visit store backed by a mutex-guarded map.
#[derive(Debug, Default)]
pub struct MemoryVisitStore {
    visits: Mutex<HashMap<VisitId, StoredVisit>>,
}

impl MemoryVisitStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_visits<R>(&self, f: impl FnOnce(&mut HashMap<VisitId, StoredVisit>) -> R) -> R {
        let mut visits = self.visits.lock().expect("visit map lock poisoned");
        f(&mut visits)
    }
}

impl VisitStore for MemoryVisitStore {
    fn create(&self, visit_type: VisitType) -> VisitResult<VisitId> {
        let visit_id = VisitId::new();
        let visit = StoredVisit {
            visit_id: visit_id.clone(),
            visit_type,
            fields: ChecklistRecord::conform(visit_type, Vec::<(&str, &str)>::new()),
            locked: false,
            rendered_note: None,
        };

        self.with_visits(|visits| visits.insert(visit_id.clone(), visit));
        Ok(visit_id)
    }

    fn get(&self, visit_id: &VisitId) -> VisitResult<StoredVisit> {
        self.with_visits(|visits| {
            visits
                .get(visit_id)
                .cloned()
                .ok_or_else(|| VisitError::NotFound(visit_id.clone()))
        })
    }

    fn set(&self, visit_id: &VisitId, fields: &ChecklistRecord) -> VisitResult<()> {
        self.with_visits(|visits| {
            let visit = visits
                .get_mut(visit_id)
                .ok_or_else(|| VisitError::NotFound(visit_id.clone()))?;
            if visit.locked {
                return Err(VisitError::Locked(visit_id.clone()));
            }

            visit.fields = ChecklistRecord::conform(visit.visit_type, fields.iter());
            Ok(())
        })
    }

    fn set_rendered_note(&self, visit_id: &VisitId, note: &str) -> VisitResult<()> {
        self.with_visits(|visits| {
            let visit = visits
                .get_mut(visit_id)
                .ok_or_else(|| VisitError::NotFound(visit_id.clone()))?;
            if visit.locked {
                return Err(VisitError::Locked(visit_id.clone()));
            }

            visit.rendered_note = Some(note.to_string());
            Ok(())
        })
    }

    fn set_lock(&self, visit_id: &VisitId) -> VisitResult<LockOutcome> {
        self.with_visits(|visits| {
            let visit = visits
                .get_mut(visit_id)
                .ok_or_else(|| VisitError::NotFound(visit_id.clone()))?;
            if visit.locked {
                return Ok(LockOutcome::AlreadyLocked);
            }

            visit.locked = true;
            Ok(LockOutcome::NewlyLocked)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirrors_file_store_lock_semantics() {
        let store = MemoryVisitStore::new();
        let visit_id = store.create(VisitType::InitialEval).expect("create");

        let fields = ChecklistRecord::conform(
            VisitType::InitialEval,
            vec![("ie_subjective", "reports dizziness")],
        );
        store.set(&visit_id, &fields).expect("save");

        assert_eq!(store.set_lock(&visit_id).unwrap(), LockOutcome::NewlyLocked);
        assert_eq!(
            store.set_lock(&visit_id).unwrap(),
            LockOutcome::AlreadyLocked
        );
        assert!(matches!(
            store.set(&visit_id, &fields),
            Err(VisitError::Locked(_))
        ));

        let stored = store.get(&visit_id).expect("get");
        assert_eq!(stored.fields.value("ie_subjective"), "reports dizziness");
    }

    #[test]
    fn unknown_visit_is_not_found() {
        let store = MemoryVisitStore::new();
        let missing = VisitId::new();

        assert!(matches!(store.get(&missing), Err(VisitError::NotFound(_))));
        assert!(matches!(
            store.set_lock(&missing),
            Err(VisitError::NotFound(_))
        ));
    }
}
