//! Shared constants for visit storage.

/// Subdirectory of the data dir holding sharded visit documents.
pub const VISITS_DIR_NAME: &str = "visits";

/// File name of the visit document within its sharded directory.
pub const VISIT_FILE_NAME: &str = "visit.yaml";
