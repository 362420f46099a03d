//! The visit orchestrator.
//!
//! `VisitService` composes the store, the autosave controller, the renderer, and the
//! signing flow for one open visit at a time: load → edit → autosave → generate → sign.
//! It holds no state beyond the currently open session; everything durable lives at the
//! store.

use crate::autosave::{AutosaveController, AutosaveState};
use crate::session::VisitSession;
use crate::signing::sign_and_lock;
use crate::store::VisitStore;
use crate::{VisitError, VisitResult};
use checklist::render;
use hvn_uuid::VisitId;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Orchestrates the documentation workflow for one open visit.
pub struct VisitService<S: VisitStore + 'static> {
    store: Arc<S>,
    autosave_debounce: Duration,
    open: Option<AutosaveController<S>>,
}

impl<S: VisitStore + 'static> VisitService<S> {
    pub fn new(store: Arc<S>, autosave_debounce: Duration) -> Self {
        Self {
            store,
            autosave_debounce,
            open: None,
        }
    }

    /// Opens a visit, making it the active session.
    ///
    /// Any pending edits on the previously open visit are flushed first, so switching
    /// visits never drops the last edit burst. The autosave controller starts `Idle`, or
    /// `Suspended` when the visit is already signed.
    pub fn open_visit(&mut self, visit_id: &VisitId) -> VisitResult<()> {
        if let Some(previous) = self.open.take() {
            if let Err(err) = previous.flush() {
                // The new visit still opens; the previous session's data is already
                // either stored or unrecoverable through this controller.
                tracing::warn!(error = %err, "failed to flush previous visit before switching");
            }
        }

        let stored = self.store.get(visit_id)?;
        let session = Arc::new(Mutex::new(VisitSession::from_stored(stored)));
        self.open = Some(AutosaveController::new(
            Arc::clone(&self.store),
            session,
            self.autosave_debounce,
        ));

        Ok(())
    }

    fn controller(&self) -> VisitResult<&AutosaveController<S>> {
        self.open.as_ref().ok_or(VisitError::NoOpenVisit)
    }

    /// The session of the currently open visit.
    pub fn session(&self) -> VisitResult<Arc<Mutex<VisitSession>>> {
        Ok(self.controller()?.session())
    }

    /// The autosave state of the currently open visit.
    pub fn autosave_state(&self) -> VisitResult<AutosaveState> {
        Ok(self.controller()?.state())
    }

    /// Applies one field edit and (re)arms the autosave timer.
    pub fn record_edit(&self, key: &str, raw: &str) -> VisitResult<()> {
        self.controller()?.record_edit(key, raw)
    }

    /// Forces an immediate save of the current session, bypassing the debounce window.
    pub fn save_now(&self) -> VisitResult<()> {
        self.controller()?.commit_now()
    }

    /// Generates the narrative note for the open visit.
    ///
    /// For an editable visit this saves the current session, renders from the stored
    /// record, and persists the note. For a locked visit it re-renders from the frozen
    /// record without writing anything — the output is deterministic, so this always
    /// reproduces the signed note.
    pub fn generate(&self) -> VisitResult<String> {
        let controller = self.controller()?;
        let session = controller.session();

        let (visit_id, visit_type, locked) = {
            let session = session.lock().expect("session lock poisoned");
            (
                session.visit_id().clone(),
                session.visit_type(),
                session.locked(),
            )
        };

        if locked {
            let stored = self.store.get(&visit_id)?;
            return Ok(render(visit_type, &stored.fields));
        }

        controller.commit_now()?;
        let stored = self.store.get(&visit_id)?;
        let note = render(visit_type, &stored.fields);
        self.store.set_rendered_note(&visit_id, &note)?;

        session
            .lock()
            .expect("session lock poisoned")
            .store_rendered_note(&note);
        Ok(note)
    }

    /// Signs and locks the open visit, returning the frozen note.
    ///
    /// The signed record is the in-memory session snapshot — including edits the debounce
    /// window has not committed yet. On success (and on `AlreadyLocked`) the session is
    /// marked locked and autosave is suspended.
    pub fn sign(&self) -> VisitResult<String> {
        let controller = self.controller()?;
        let session = controller.session();

        let (visit_id, visit_type, snapshot) = {
            let session = session.lock().expect("session lock poisoned");
            if session.locked() {
                return Err(VisitError::AlreadyLocked(session.visit_id().clone()));
            }
            (
                session.visit_id().clone(),
                session.visit_type(),
                session.snapshot(),
            )
        };

        let result = sign_and_lock(self.store.as_ref(), &visit_id, visit_type, &snapshot);

        match &result {
            Ok(note) => {
                {
                    let mut session = session.lock().expect("session lock poisoned");
                    session.store_rendered_note(note);
                    session.mark_locked();
                }
                controller.suspend();
            }
            Err(VisitError::AlreadyLocked(_)) => {
                session.lock().expect("session lock poisoned").mark_locked();
                controller.suspend();
            }
            Err(_) => {}
        }

        result
    }
}
