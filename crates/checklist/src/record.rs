//! Checklist records and value normalisation.
//!
//! A [`ChecklistRecord`] is the field-key → string-value mapping captured during a visit.
//! Values are normalised *before* storage: trimmed, dates canonicalised to `YYYY-MM-DD`,
//! and choice answers folded to their canonical option casing. Normalisation is tolerant:
//! a value that does not parse is kept verbatim (trimmed) rather than rejected, because
//! requiredness is advisory and a save must never block on a half-typed entry.

use crate::schema::{self, FieldKind, VisitType};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Date input formats accepted from capture, first match wins.
const DATE_INPUT_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// The field-value mapping for one visit.
///
/// Keys are ordered (BTreeMap) so that serialised output and iteration order are
/// deterministic regardless of edit order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChecklistRecord {
    values: BTreeMap<String, String>,
}

impl ChecklistRecord {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a record conforming to a visit type's declared key set.
    ///
    /// - Declared keys absent from `pairs` default to the empty string.
    /// - Unknown keys are dropped with a warning; they are never persisted.
    /// - Every kept value is normalised for its declared kind.
    ///
    /// This is the single entry point stores and API handlers use to accept field data,
    /// so that the declared key set is an invariant of every stored record.
    pub fn conform<I, K, V>(visit_type: VisitType, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut record = Self::new();
        for descriptor in schema::fields_for(visit_type) {
            record.values.insert(descriptor.key.to_string(), String::new());
        }

        for (key, value) in pairs {
            let key = key.as_ref();
            match schema::descriptor(visit_type, key) {
                Some(descriptor) => {
                    record.values.insert(
                        descriptor.key.to_string(),
                        normalise_value(&descriptor.kind, value.as_ref()),
                    );
                }
                None => {
                    tracing::warn!(%visit_type, key, "dropping unknown checklist key");
                }
            }
        }

        record
    }

    /// Returns the value for `key`, or the empty string if absent.
    pub fn value(&self, key: &str) -> &str {
        self.values.get(key).map(String::as_str).unwrap_or("")
    }

    /// Sets `key` to the normalisation of `raw` for the given kind.
    pub fn set_value(&mut self, kind: &FieldKind, key: &str, raw: &str) {
        self.values
            .insert(key.to_string(), normalise_value(kind, raw));
    }

    /// Returns true if every value in the record is empty.
    pub fn is_blank(&self) -> bool {
        self.values.values().all(|value| value.is_empty())
    }

    /// Iterates over `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

impl FromIterator<(String, String)> for ChecklistRecord {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Normalises a raw captured value for storage and rendering.
///
/// All kinds trim surrounding whitespace. Dates are canonicalised to `YYYY-MM-DD` when the
/// input matches an accepted format. Choice answers are matched case-insensitively against
/// the option set and stored in the option's canonical casing.
pub fn normalise_value(kind: &FieldKind, raw: &str) -> String {
    let trimmed = raw.trim();
    match kind {
        FieldKind::Text | FieldKind::Multiline => trimmed.to_string(),
        FieldKind::Date => normalise_date(trimmed),
        FieldKind::Choice { options } => normalise_choice(options, trimmed),
    }
}

fn normalise_date(trimmed: &str) -> String {
    for format in DATE_INPUT_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return date.format("%Y-%m-%d").to_string();
        }
    }
    trimmed.to_string()
}

fn normalise_choice(options: &[&str], trimmed: &str) -> String {
    options
        .iter()
        .find(|option| option.eq_ignore_ascii_case(trimmed))
        .map(|option| option.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::YES_NO;

    #[test]
    fn conform_supplies_empty_defaults_for_declared_keys() {
        let record = ChecklistRecord::conform(VisitType::Soc, Vec::<(&str, &str)>::new());

        for descriptor in schema::fields_for(VisitType::Soc) {
            assert_eq!(record.value(descriptor.key), "");
        }
    }

    #[test]
    fn conform_drops_unknown_keys() {
        let record = ChecklistRecord::conform(
            VisitType::Soc,
            vec![("insurance", "Medicare A"), ("made_up_key", "anything")],
        );

        assert_eq!(record.value("insurance"), "Medicare A");
        assert_eq!(record.value("made_up_key"), "");
        assert!(record.iter().all(|(key, _)| key != "made_up_key"));
    }

    #[test]
    fn values_are_trimmed_before_storage() {
        let record =
            ChecklistRecord::conform(VisitType::Soc, vec![("goal_quote", "  ambulate 50ft  ")]);
        assert_eq!(record.value("goal_quote"), "ambulate 50ft");
    }

    #[test]
    fn us_dates_are_canonicalised() {
        assert_eq!(normalise_value(&FieldKind::Date, "12/31/2024"), "2024-12-31");
        assert_eq!(normalise_value(&FieldKind::Date, "2024-12-31"), "2024-12-31");
    }

    #[test]
    fn unparseable_dates_are_kept_verbatim() {
        assert_eq!(normalise_value(&FieldKind::Date, " next week "), "next week");
    }

    #[test]
    fn choice_answers_fold_to_canonical_casing() {
        let kind = FieldKind::Choice { options: YES_NO };
        assert_eq!(normalise_value(&kind, "yes"), "YES");
        assert_eq!(normalise_value(&kind, " No "), "NO");
        assert_eq!(normalise_value(&kind, "maybe"), "maybe");
    }

    #[test]
    fn blank_record_detection() {
        let empty = ChecklistRecord::conform(VisitType::InitialEval, Vec::<(&str, &str)>::new());
        assert!(empty.is_blank());

        let filled =
            ChecklistRecord::conform(VisitType::InitialEval, vec![("ie_subjective", "reports pain")]);
        assert!(!filled.is_blank());
    }
}
