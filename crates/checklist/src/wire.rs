//! On-disk YAML wire model for a visit document.
//!
//! This module defines the strict YAML representation used to persist one visit: its
//! identifier, type, lock flag, checklist fields, and last rendered note.
//!
//! Responsibilities:
//! - Define a strict wire model (`VisitDocumentWire`) for serialisation/deserialisation.
//! - Translate between the wire shape and the domain-level [`VisitDocument`].
//!
//! Notes:
//! - Workflow meaning (lock enforcement, autosave, signing) lives in `hvn-core`; this
//!   module handles the file format only.

use crate::record::ChecklistRecord;
use crate::schema::VisitType;
use crate::ChecklistError;
use hvn_types::NonEmptyText;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Strict wire representation of a visit document for on-disk YAML.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct VisitDocumentWire {
    pub visit_id: NonEmptyText,
    pub visit_type: NonEmptyText,
    pub locked: bool,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendered_note: Option<String>,
}

/// Domain-level carrier for one persisted visit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisitDocument {
    pub visit_id: String,
    pub visit_type: VisitType,
    pub locked: bool,
    pub fields: ChecklistRecord,
    pub rendered_note: Option<String>,
}

/// Parse a visit document from YAML text.
///
/// This uses `serde_path_to_error` to surface a best-effort "path" (e.g. `fields.insurance`)
/// to the failing field when the YAML does not match the wire schema.
///
/// Checklist fields are conformed against the visit type's declared key set on the way in:
/// unknown keys are dropped with a warning and declared keys absent from the file read back
/// as empty strings.
///
/// # Errors
///
/// Returns [`ChecklistError`] if:
/// - the YAML does not represent a visit document mapping,
/// - any field has an unexpected type or any unknown top-level keys are present
///   (due to `#[serde(deny_unknown_fields)]`),
/// - the stored visit type has no registered schema.
pub fn document_parse(yaml_text: &str) -> Result<VisitDocument, ChecklistError> {
    let deserializer = serde_yaml::Deserializer::from_str(yaml_text);

    let wire = match serde_path_to_error::deserialize::<_, VisitDocumentWire>(deserializer) {
        Ok(parsed) => parsed,
        Err(err) => {
            let path = err.path().to_string();
            let source = err.into_inner();
            let path = if path.is_empty() {
                "<root>"
            } else {
                path.as_str()
            };
            return Err(ChecklistError::Translation(format!(
                "visit document schema mismatch at {path}: {source}"
            )));
        }
    };

    let visit_type: VisitType = wire.visit_type.as_str().parse()?;

    Ok(VisitDocument {
        visit_id: wire.visit_id.to_string(),
        visit_type,
        locked: wire.locked,
        fields: ChecklistRecord::conform(visit_type, wire.fields),
        rendered_note: wire.rendered_note,
    })
}

/// Render a visit document as YAML text.
///
/// # Errors
///
/// Returns [`ChecklistError::Translation`] if the visit identifier is empty or
/// serialisation fails.
pub fn document_render(document: &VisitDocument) -> Result<String, ChecklistError> {
    let wire = VisitDocumentWire {
        visit_id: NonEmptyText::new(&document.visit_id)
            .map_err(|_| ChecklistError::Translation("visit id cannot be empty".to_string()))?,
        visit_type: NonEmptyText::new(document.visit_type.as_str())
            .expect("visit type wire names are non-empty"),
        locked: document.locked,
        fields: document
            .fields
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect(),
        rendered_note: document.rendered_note.clone(),
    };

    serde_yaml::to_string(&wire)
        .map_err(|e| ChecklistError::Translation(format!("failed to serialize visit document: {e}")))
}
