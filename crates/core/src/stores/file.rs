//! YAML-file visit store.
//!
//! One visit document lives at `<visits_dir>/<s1>/<s2>/<visit_id>/visit.yaml`, sharded by
//! the first hex characters of the identifier to bound directory fan-out. Every write
//! replaces the whole file, which is what makes concurrent writers last-write-wins rather
//! than field-interleaved.

use crate::constants::VISIT_FILE_NAME;
use crate::store::{LockOutcome, StoredVisit, VisitStore};
use crate::{VisitError, VisitResult};
use checklist::{document_parse, document_render, ChecklistRecord, VisitDocument, VisitType};
use hvn_uuid::VisitId;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Visit store backed by sharded YAML files.
#[derive(Clone, Debug)]
pub struct FileVisitStore {
    visits_dir: PathBuf,
}

impl FileVisitStore {
    /// Creates a store rooted at `visits_dir`. The directory is created lazily on first
    /// write.
    pub fn new(visits_dir: impl Into<PathBuf>) -> Self {
        Self {
            visits_dir: visits_dir.into(),
        }
    }

    fn visit_dir(&self, visit_id: &VisitId) -> PathBuf {
        visit_id.sharded_dir(&self.visits_dir)
    }

    fn visit_file(&self, visit_id: &VisitId) -> PathBuf {
        self.visit_dir(visit_id).join(VISIT_FILE_NAME)
    }

    fn load(&self, visit_id: &VisitId) -> VisitResult<VisitDocument> {
        let path = self.visit_file(visit_id);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(VisitError::NotFound(visit_id.clone()));
            }
            Err(e) => return Err(VisitError::FileRead(e)),
        };

        Ok(document_parse(&contents)?)
    }

    fn persist(&self, visit_id: &VisitId, document: &VisitDocument) -> VisitResult<()> {
        let yaml = document_render(document)?;
        fs::write(self.visit_file(visit_id), yaml).map_err(VisitError::FileWrite)
    }
}

/// Allocates a unique sharded visit directory, retrying on pathological UUID collisions
/// (or pre-existing directories from external interference).
fn allocate_unique_visit_dir(store: &FileVisitStore) -> VisitResult<(VisitId, PathBuf)> {
    for _attempt in 0..5 {
        let visit_id = VisitId::new();
        let candidate = store.visit_dir(&visit_id);

        if candidate.exists() {
            continue;
        }

        if let Some(parent) = candidate.parent() {
            fs::create_dir_all(parent).map_err(VisitError::DirCreation)?;
        }

        match fs::create_dir(&candidate) {
            Ok(()) => return Ok((visit_id, candidate)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(VisitError::DirCreation(e)),
        }
    }

    Err(VisitError::DirCreation(std::io::Error::new(
        ErrorKind::AlreadyExists,
        "failed to allocate a unique visit directory after 5 attempts",
    )))
}

impl VisitStore for FileVisitStore {
    fn create(&self, visit_type: VisitType) -> VisitResult<VisitId> {
        let (visit_id, visit_dir) = allocate_unique_visit_dir(self)?;

        let document = VisitDocument {
            visit_id: visit_id.to_string(),
            visit_type,
            locked: false,
            fields: ChecklistRecord::conform(visit_type, Vec::<(&str, &str)>::new()),
            rendered_note: None,
        };

        if let Err(e) = self.persist(&visit_id, &document) {
            // Avoid leaving a partially-created visit directory behind.
            let _ = fs::remove_dir_all(&visit_dir);
            return Err(e);
        }

        tracing::info!(%visit_id, %visit_type, "created visit");
        Ok(visit_id)
    }

    fn get(&self, visit_id: &VisitId) -> VisitResult<StoredVisit> {
        let document = self.load(visit_id)?;

        Ok(StoredVisit {
            visit_id: visit_id.clone(),
            visit_type: document.visit_type,
            fields: document.fields,
            locked: document.locked,
            rendered_note: document.rendered_note,
        })
    }

    fn set(&self, visit_id: &VisitId, fields: &ChecklistRecord) -> VisitResult<()> {
        let mut document = self.load(visit_id)?;
        if document.locked {
            return Err(VisitError::Locked(visit_id.clone()));
        }

        document.fields = ChecklistRecord::conform(document.visit_type, fields.iter());
        self.persist(visit_id, &document)
    }

    fn set_rendered_note(&self, visit_id: &VisitId, note: &str) -> VisitResult<()> {
        let mut document = self.load(visit_id)?;
        if document.locked {
            return Err(VisitError::Locked(visit_id.clone()));
        }

        document.rendered_note = Some(note.to_string());
        self.persist(visit_id, &document)
    }

    fn set_lock(&self, visit_id: &VisitId) -> VisitResult<LockOutcome> {
        let mut document = self.load(visit_id)?;
        if document.locked {
            return Ok(LockOutcome::AlreadyLocked);
        }

        document.locked = true;
        self.persist(visit_id, &document)?;
        tracing::info!(%visit_id, "visit locked");
        Ok(LockOutcome::NewlyLocked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    fn store_in(dir: &Path) -> FileVisitStore {
        FileVisitStore::new(dir.join("visits"))
    }

    fn record(pairs: Vec<(&str, &str)>) -> ChecklistRecord {
        ChecklistRecord::conform(VisitType::Soc, pairs)
    }

    #[test]
    fn create_then_get_returns_empty_declared_fields() {
        let dir = tempdir().expect("tempdir");
        let store = store_in(dir.path());

        let visit_id = store.create(VisitType::Soc).expect("create visit");
        let stored = store.get(&visit_id).expect("get visit");

        assert_eq!(stored.visit_type, VisitType::Soc);
        assert!(!stored.locked);
        assert!(stored.rendered_note.is_none());
        assert_eq!(stored.fields.value("insurance"), "");
        assert_eq!(stored.fields.value("goal_quote"), "");
    }

    #[test]
    fn visit_file_lands_in_sharded_directory() {
        let dir = tempdir().expect("tempdir");
        let store = store_in(dir.path());

        let visit_id = store.create(VisitType::Soc).expect("create visit");
        let expected = visit_id
            .sharded_dir(&dir.path().join("visits"))
            .join(VISIT_FILE_NAME);
        assert!(expected.is_file());
    }

    #[test]
    fn set_replaces_the_whole_record() {
        let dir = tempdir().expect("tempdir");
        let store = store_in(dir.path());
        let visit_id = store.create(VisitType::Soc).expect("create visit");

        store
            .set(
                &visit_id,
                &record(vec![("insurance", "Medicare A"), ("admit_date", "12/31/2024")]),
            )
            .expect("first save");
        store
            .set(&visit_id, &record(vec![("goal_quote", "ambulate 50ft")]))
            .expect("second save");

        let stored = store.get(&visit_id).expect("get visit");
        assert_eq!(stored.fields.value("goal_quote"), "ambulate 50ft");
        // Whole-record replace: the earlier value is gone, not merged.
        assert_eq!(stored.fields.value("insurance"), "");
    }

    #[test]
    fn date_values_are_stored_canonically() {
        let dir = tempdir().expect("tempdir");
        let store = store_in(dir.path());
        let visit_id = store.create(VisitType::Soc).expect("create visit");

        store
            .set(&visit_id, &record(vec![("admit_date", "12/31/2024")]))
            .expect("save");

        let stored = store.get(&visit_id).expect("get visit");
        assert_eq!(stored.fields.value("admit_date"), "2024-12-31");
    }

    #[test]
    fn get_unknown_visit_is_not_found() {
        let dir = tempdir().expect("tempdir");
        let store = store_in(dir.path());

        let missing = VisitId::new();
        assert!(matches!(
            store.get(&missing),
            Err(VisitError::NotFound(id)) if id == missing
        ));
    }

    #[test]
    fn locked_visit_refuses_every_subsequent_set() {
        let dir = tempdir().expect("tempdir");
        let store = store_in(dir.path());
        let visit_id = store.create(VisitType::Soc).expect("create visit");

        assert_eq!(
            store.set_lock(&visit_id).expect("lock"),
            LockOutcome::NewlyLocked
        );

        for _ in 0..3 {
            assert!(matches!(
                store.set(&visit_id, &record(vec![("insurance", "late edit")])),
                Err(VisitError::Locked(_))
            ));
        }
        assert!(matches!(
            store.set_rendered_note(&visit_id, "late note"),
            Err(VisitError::Locked(_))
        ));
    }

    #[test]
    fn set_lock_is_idempotent_and_preserves_content() {
        let dir = tempdir().expect("tempdir");
        let store = store_in(dir.path());
        let visit_id = store.create(VisitType::Soc).expect("create visit");

        store
            .set(&visit_id, &record(vec![("insurance", "Medicare A")]))
            .expect("save");
        store
            .set_rendered_note(&visit_id, "START OF CARE NOTE\n")
            .expect("note");

        assert_eq!(
            store.set_lock(&visit_id).expect("first lock"),
            LockOutcome::NewlyLocked
        );
        assert_eq!(
            store.set_lock(&visit_id).expect("second lock"),
            LockOutcome::AlreadyLocked
        );

        let stored = store.get(&visit_id).expect("get visit");
        assert!(stored.locked);
        assert_eq!(stored.fields.value("insurance"), "Medicare A");
        assert_eq!(stored.rendered_note.as_deref(), Some("START OF CARE NOTE\n"));
    }
}
