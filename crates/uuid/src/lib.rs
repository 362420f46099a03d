//! Visit identifiers and sharded-path utilities.
//!
//! HVN stores visit documents under sharded directories derived from the visit identifier.
//!
//! To keep path derivation deterministic and consistent across the codebase, HVN uses a
//! *canonical* identifier representation for storage: **32 lowercase hexadecimal characters**
//! (no hyphens).
//!
//! This crate provides:
//! - A small wrapper type ([`VisitId`]) that *guarantees* the canonical format once
//!   constructed.
//! - Shared sharding logic to derive visit directory locations from an identifier.
//!
//! ## Canonical form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! Notes:
//! - This is the same value you would get from `Uuid::new_v4().simple().to_string()`.
//! - Canonical form is *required* for externally supplied identifiers (for example, from
//!   CLI/API inputs). Use [`VisitId::parse`] to validate an input string.
//! - Non-canonical values (uppercase, hyphenated, wrong length, non-hex) are rejected.
//!
//! ## Sharded directory layout
//! For a canonical identifier `v`, HVN stores data under:
//! `parent_dir/<v[0..2]>/<v[2..4]>/<v>/`
//!
//! This scheme prevents very large fan-out in a single directory once an agency has
//! accumulated years of visit records.

mod id;

pub use id::{Uuid, VisitId};

/// Error type for visit identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum VisitIdError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for visit identifier operations.
pub type VisitIdResult<T> = Result<T, VisitIdError>;
