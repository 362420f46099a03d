//! # HVN Core
//!
//! Workflow logic for the HVN visit documentation system.
//!
//! This crate owns everything between the checklist schemas and the transport layer:
//! - The [`VisitStore`] boundary and its file/in-memory implementations
//! - Debounced autosave with cancellable, generation-checked timers
//! - The irreversible sign & lock flow
//! - The [`VisitService`] orchestrator and per-visit [`VisitSession`] context
//!
//! **No API concerns**: HTTP servers and CLI surfaces belong in `hvn-run` and `hvn-cli`.
//! Pure schema/rendering logic belongs in the `checklist` crate.

pub mod autosave;
pub mod config;
pub mod constants;
mod error;
pub mod session;
pub mod signing;
pub mod store;
pub mod stores;
pub mod visit;

pub use autosave::{AutosaveController, AutosaveState};
pub use config::{autosave_debounce_from_env_value, CoreConfig, DEFAULT_AUTOSAVE_DEBOUNCE};
pub use error::{VisitError, VisitResult};
pub use session::VisitSession;
pub use signing::sign_and_lock;
pub use store::{LockOutcome, StoredVisit, VisitStore};
pub use stores::{FileVisitStore, MemoryVisitStore};
pub use visit::VisitService;
