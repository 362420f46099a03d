//! Checklist schema, normalisation, and note-rendering support.
//!
//! This crate is responsible for the schema-driven side of HVN's documentation workflow:
//! the per-visit-type field schemas, the normalisation rules applied to captured values,
//! the fixed narrative templates, the deterministic note renderer, and the strict YAML
//! wire model for the on-disk visit document.
//!
//! Persistence and workflow state (stores, autosave, sign & lock) live in `hvn-core`.
//! This crate handles pure data and formats only: nothing here performs I/O beyond
//! emitting log events.

pub mod record;
pub mod render;
pub mod schema;
pub mod template;
pub mod wire;

use thiserror::Error;

/// Errors returned by the `checklist` boundary crate.
#[derive(Debug, Error)]
pub enum ChecklistError {
    #[error("unknown visit type: {0}")]
    UnknownVisitType(String),

    #[error("invalid YAML: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),

    #[error("translation error: {0}")]
    Translation(String),
}

pub use record::ChecklistRecord;
pub use render::render;
pub use schema::{FieldDescriptor, FieldKind, SchemaItem, VisitType};
pub use template::NOT_DOCUMENTED;
pub use wire::{document_parse, document_render, VisitDocument};
