//! Debounced autosave for an open visit.
//!
//! The controller coalesces a burst of field edits into a single whole-record commit: each
//! edit (re)arms a timer for the debounce window, and only the timer that survives the
//! burst writes. Delivery is at most once per window — a failed commit is not retried, the
//! next edit simply re-arms, and the in-memory session remains the source of truth so no
//! keystroke is lost.
//!
//! State machine, per open visit:
//!
//! ```text
//! Idle -> PendingCommit -> Committing -> Idle
//!                            |
//!                            v (store reports Locked)
//!                        Suspended (terminal until the visit is reopened)
//! ```
//!
//! Timers are cancellable and carry the visit identifier they were armed for plus a
//! generation number; a timer that has been superseded, flushed, or outlived its visit
//! discards its commit instead of writing against the wrong record.

use crate::session::VisitSession;
use crate::store::VisitStore;
use crate::{VisitError, VisitResult};
use hvn_uuid::VisitId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Autosave controller states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AutosaveState {
    /// No commit pending.
    Idle,
    /// Edits buffered; a debounce timer is armed.
    PendingCommit,
    /// A snapshot is being written to the store.
    Committing,
    /// The visit is locked; no further commits will be attempted.
    Suspended,
}

/// Debounced committer for one open visit.
///
/// Methods that arm timers must be called from within a tokio runtime.
pub struct AutosaveController<S: VisitStore + 'static> {
    store: Arc<S>,
    session: Arc<Mutex<VisitSession>>,
    debounce: Duration,
    inner: Arc<Inner>,
}

struct Inner {
    cell: Mutex<StateCell>,
    /// Bumped on every arm/flush; a timer only commits if its generation is still
    /// current, which is what cancels stale timers structurally.
    generation: AtomicU64,
    /// Serialises commits so a flush observes any in-flight write before returning.
    commit_gate: Mutex<()>,
}

struct StateCell {
    state: AutosaveState,
    timer: Option<JoinHandle<()>>,
}

impl<S: VisitStore + 'static> AutosaveController<S> {
    /// Creates a controller for an open session.
    ///
    /// A session loaded from an already-locked visit starts `Suspended`; everything else
    /// starts `Idle`.
    pub fn new(store: Arc<S>, session: Arc<Mutex<VisitSession>>, debounce: Duration) -> Self {
        let initial = if session.lock().expect("session lock poisoned").locked() {
            AutosaveState::Suspended
        } else {
            AutosaveState::Idle
        };

        Self {
            store,
            session,
            debounce,
            inner: Arc::new(Inner {
                cell: Mutex::new(StateCell {
                    state: initial,
                    timer: None,
                }),
                generation: AtomicU64::new(0),
                commit_gate: Mutex::new(()),
            }),
        }
    }

    /// Current controller state.
    pub fn state(&self) -> AutosaveState {
        self.inner.cell.lock().expect("autosave state lock poisoned").state
    }

    /// The session this controller persists.
    pub fn session(&self) -> Arc<Mutex<VisitSession>> {
        Arc::clone(&self.session)
    }

    /// Applies one field edit to the session and (re)arms the debounce timer.
    ///
    /// # Errors
    ///
    /// Returns [`VisitError::Locked`] once the visit is signed and
    /// [`VisitError::InvalidInput`] for keys the schema does not declare. Neither arms a
    /// timer.
    pub fn record_edit(&self, key: &str, raw: &str) -> VisitResult<()> {
        let visit_id = {
            let mut session = self.session.lock().expect("session lock poisoned");
            session.apply_edit(key, raw)?;
            session.visit_id().clone()
        };

        self.arm(visit_id);
        Ok(())
    }

    /// Forces an immediate commit of the current session snapshot, bypassing the
    /// debounce window and cancelling any armed timer.
    pub fn commit_now(&self) -> VisitResult<()> {
        let visit_id = {
            let session = self.session.lock().expect("session lock poisoned");
            if session.locked() {
                return Err(VisitError::Locked(session.visit_id().clone()));
            }
            session.visit_id().clone()
        };

        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        {
            let mut cell = self.inner.cell.lock().expect("autosave state lock poisoned");
            if let Some(timer) = cell.timer.take() {
                timer.abort();
            }
            cell.state = AutosaveState::PendingCommit;
        }

        commit(self.store.as_ref(), &self.session, &self.inner, None, &visit_id)
    }

    /// Commits any pending edit burst immediately.
    ///
    /// This is the flush-before-switch policy: callers detaching from a visit call this
    /// first so the last burst of edits is never lost. A controller with nothing pending
    /// waits out any in-flight commit and returns without writing.
    pub fn flush(&self) -> VisitResult<()> {
        let pending = {
            let cell = self.inner.cell.lock().expect("autosave state lock poisoned");
            cell.state == AutosaveState::PendingCommit
        };

        if !pending {
            // Nothing buffered; just let an in-flight commit drain.
            let _gate = self.inner.commit_gate.lock().expect("commit gate poisoned");
            return Ok(());
        }

        self.commit_now()
    }

    /// Moves the controller to `Suspended`, cancelling any armed timer. Called when the
    /// visit is signed through this process rather than observed locked at the store.
    pub(crate) fn suspend(&self) {
        let mut cell = self.inner.cell.lock().expect("autosave state lock poisoned");
        if let Some(timer) = cell.timer.take() {
            timer.abort();
        }
        cell.state = AutosaveState::Suspended;
    }

    fn arm(&self, visit_id: VisitId) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let mut cell = self.inner.cell.lock().expect("autosave state lock poisoned");
        if let Some(timer) = cell.timer.take() {
            timer.abort();
        }
        cell.state = AutosaveState::PendingCommit;

        let store = Arc::clone(&self.store);
        let session = Arc::clone(&self.session);
        let inner = Arc::clone(&self.inner);
        let debounce = self.debounce;
        cell.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            // Errors are logged inside commit; the timer has nobody to report to.
            let _ = commit(store.as_ref(), &session, &inner, Some(generation), &visit_id);
        }));
    }
}

/// Performs one whole-record commit.
///
/// With `expected_generation` set this is a timer firing: the commit is discarded when a
/// newer edit or a flush superseded it, or when the session no longer belongs to the
/// visit the timer was armed for.
fn commit<S: VisitStore>(
    store: &S,
    session: &Mutex<VisitSession>,
    inner: &Inner,
    expected_generation: Option<u64>,
    visit_id: &VisitId,
) -> VisitResult<()> {
    let _gate = inner.commit_gate.lock().expect("commit gate poisoned");

    let snapshot = {
        let mut cell = inner.cell.lock().expect("autosave state lock poisoned");

        if let Some(generation) = expected_generation {
            if inner.generation.load(Ordering::SeqCst) != generation
                || cell.state != AutosaveState::PendingCommit
            {
                return Ok(());
            }
        }

        let session = session.lock().expect("session lock poisoned");
        if session.visit_id() != visit_id {
            tracing::warn!(%visit_id, "discarding autosave armed for a visit that is no longer active");
            cell.state = AutosaveState::Idle;
            return Ok(());
        }

        cell.state = AutosaveState::Committing;
        session.snapshot()
    };

    match store.set(visit_id, &snapshot) {
        Ok(()) => {
            set_state(inner, AutosaveState::Idle);
            tracing::debug!(%visit_id, "autosaved checklist");
            Ok(())
        }
        Err(VisitError::Locked(id)) => {
            set_state(inner, AutosaveState::Suspended);
            session
                .lock()
                .expect("session lock poisoned")
                .mark_locked();
            tracing::warn!(%visit_id, "visit was signed elsewhere; checklist is now read-only");
            Err(VisitError::Locked(id))
        }
        Err(err) => {
            set_state(inner, AutosaveState::Idle);
            tracing::warn!(%visit_id, error = %err, "autosave failed; edits kept in memory until the next save");
            Err(err)
        }
    }
}

fn set_state(inner: &Inner, state: AutosaveState) {
    inner.cell.lock().expect("autosave state lock poisoned").state = state;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{LockOutcome, StoredVisit, VisitStore};
    use crate::stores::MemoryVisitStore;
    use checklist::{ChecklistRecord, VisitType};
    use std::sync::atomic::{AtomicBool, AtomicUsize};

    /// Store double that counts whole-record writes and can fail the next one.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryVisitStore,
        set_calls: AtomicUsize,
        fail_next_set: AtomicBool,
    }

    impl CountingStore {
        fn set_count(&self) -> usize {
            self.set_calls.load(Ordering::SeqCst)
        }
    }

    impl VisitStore for CountingStore {
        fn create(&self, visit_type: VisitType) -> VisitResult<VisitId> {
            self.inner.create(visit_type)
        }

        fn get(&self, visit_id: &VisitId) -> VisitResult<StoredVisit> {
            self.inner.get(visit_id)
        }

        fn set(&self, visit_id: &VisitId, fields: &ChecklistRecord) -> VisitResult<()> {
            self.set_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_next_set.swap(false, Ordering::SeqCst) {
                return Err(VisitError::FileWrite(std::io::Error::other(
                    "injected transient failure",
                )));
            }
            self.inner.set(visit_id, fields)
        }

        fn set_rendered_note(&self, visit_id: &VisitId, note: &str) -> VisitResult<()> {
            self.inner.set_rendered_note(visit_id, note)
        }

        fn set_lock(&self, visit_id: &VisitId) -> VisitResult<LockOutcome> {
            self.inner.set_lock(visit_id)
        }
    }

    const DEBOUNCE: Duration = Duration::from_millis(900);

    fn open_controller(
        store: &Arc<CountingStore>,
    ) -> (VisitId, Arc<Mutex<VisitSession>>, AutosaveController<CountingStore>) {
        let visit_id = store.create(VisitType::Soc).expect("create visit");
        let session = Arc::new(Mutex::new(VisitSession::from_stored(
            store.get(&visit_id).expect("get visit"),
        )));
        let controller = AutosaveController::new(Arc::clone(store), Arc::clone(&session), DEBOUNCE);
        (visit_id, session, controller)
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    /// Lets a freshly armed timer task run once so its sleep registers against the
    /// current (paused) clock before the test advances time.
    async fn register() {
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
    }

    #[tokio::test(start_paused = true)]
    async fn coalesces_an_edit_burst_into_one_commit() {
        let store = Arc::new(CountingStore::default());
        let (visit_id, _session, controller) = open_controller(&store);

        for (key, value) in [
            ("insurance", "Medicare A"),
            ("goal_quote", "ambulate 20ft"),
            ("goal_quote", "ambulate 50ft"),
            ("dx_htn", "yes"),
        ] {
            controller.record_edit(key, value).expect("edit");
            register().await;
            tokio::time::advance(Duration::from_millis(100)).await;
            assert_eq!(store.set_count(), 0, "committed inside the debounce window");
        }
        assert_eq!(controller.state(), AutosaveState::PendingCommit);

        tokio::time::advance(DEBOUNCE).await;
        settle().await;

        assert_eq!(store.set_count(), 1);
        assert_eq!(controller.state(), AutosaveState::Idle);

        let stored = store.get(&visit_id).expect("get visit");
        assert_eq!(stored.fields.value("insurance"), "Medicare A");
        assert_eq!(stored.fields.value("goal_quote"), "ambulate 50ft");
        assert_eq!(stored.fields.value("dx_htn"), "YES");
    }

    #[tokio::test(start_paused = true)]
    async fn each_edit_restarts_the_debounce_window() {
        let store = Arc::new(CountingStore::default());
        let (_visit_id, _session, controller) = open_controller(&store);

        controller.record_edit("insurance", "Medicare A").expect("edit");
        register().await;
        tokio::time::advance(Duration::from_millis(800)).await;
        controller.record_edit("insurance", "Medicare B").expect("edit");
        register().await;
        tokio::time::advance(Duration::from_millis(800)).await;
        settle().await;

        assert_eq!(store.set_count(), 0, "superseded timer must not fire");

        tokio::time::advance(Duration::from_millis(200)).await;
        settle().await;
        assert_eq!(store.set_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn locked_commit_suspends_and_stops_retrying() {
        let store = Arc::new(CountingStore::default());
        let (visit_id, session, controller) = open_controller(&store);

        controller.record_edit("insurance", "Medicare A").expect("edit");
        register().await;
        // A concurrent signer locks the visit while our edit is pending.
        store.set_lock(&visit_id).expect("lock");

        tokio::time::advance(DEBOUNCE).await;
        settle().await;

        assert_eq!(store.set_count(), 1);
        assert_eq!(controller.state(), AutosaveState::Suspended);
        assert!(session.lock().unwrap().locked());

        // Further edits are refused and arm nothing.
        assert!(matches!(
            controller.record_edit("insurance", "late"),
            Err(VisitError::Locked(_))
        ));
        tokio::time::advance(DEBOUNCE).await;
        settle().await;
        assert_eq!(store.set_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_returns_to_idle_and_keeps_edits_in_memory() {
        let store = Arc::new(CountingStore::default());
        let (visit_id, session, controller) = open_controller(&store);

        store.fail_next_set.store(true, Ordering::SeqCst);
        controller.record_edit("insurance", "Medicare A").expect("edit");
        register().await;
        tokio::time::advance(DEBOUNCE).await;
        settle().await;

        assert_eq!(store.set_count(), 1);
        assert_eq!(controller.state(), AutosaveState::Idle);
        // No automatic retry, and the value survives in memory.
        assert_eq!(session.lock().unwrap().value("insurance"), "Medicare A");

        controller.record_edit("goal_quote", "ambulate 50ft").expect("edit");
        register().await;
        tokio::time::advance(DEBOUNCE).await;
        settle().await;

        assert_eq!(store.set_count(), 2);
        let stored = store.get(&visit_id).expect("get visit");
        assert_eq!(stored.fields.value("insurance"), "Medicare A");
        assert_eq!(stored.fields.value("goal_quote"), "ambulate 50ft");
    }

    #[tokio::test(start_paused = true)]
    async fn flush_commits_the_pending_burst_without_waiting() {
        let store = Arc::new(CountingStore::default());
        let (visit_id, _session, controller) = open_controller(&store);

        controller.record_edit("goal_quote", "ambulate 50ft").expect("edit");
        controller.flush().expect("flush");

        assert_eq!(store.set_count(), 1);
        assert_eq!(
            store.get(&visit_id).unwrap().fields.value("goal_quote"),
            "ambulate 50ft"
        );

        // The cancelled timer never produces a second write.
        tokio::time::advance(DEBOUNCE).await;
        settle().await;
        assert_eq!(store.set_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_timer_discards_when_the_session_moved_on() {
        let store = Arc::new(CountingStore::default());
        let (_visit_a, session, controller) = open_controller(&store);

        controller.record_edit("insurance", "Medicare A").expect("edit");
        register().await;

        // The session is rebound to another visit before the timer fires.
        let visit_b = store.create(VisitType::Soc).expect("create second visit");
        *session.lock().unwrap() = VisitSession::from_stored(store.get(&visit_b).unwrap());

        tokio::time::advance(DEBOUNCE).await;
        settle().await;

        assert_eq!(store.set_count(), 0, "stale timer must discard, not write");
        assert_eq!(controller.state(), AutosaveState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn controller_for_a_locked_visit_starts_suspended() {
        let store = Arc::new(CountingStore::default());
        let visit_id = store.create(VisitType::Soc).expect("create visit");
        store.set_lock(&visit_id).expect("lock");

        let session = Arc::new(Mutex::new(VisitSession::from_stored(
            store.get(&visit_id).expect("get visit"),
        )));
        let controller = AutosaveController::new(Arc::clone(&store), session, DEBOUNCE);

        assert_eq!(controller.state(), AutosaveState::Suspended);
    }
}
