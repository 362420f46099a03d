//! Deterministic note rendering.
//!
//! Rendering is a pure function of the visit type's template and the checklist record:
//! no storage, clock, or network access. Repeated calls with the same record produce
//! byte-identical output, so a note regenerated from a locked record always matches the
//! note that was signed.

use crate::record::{normalise_value, ChecklistRecord};
use crate::schema::{self, VisitType};
use crate::template::{placeholders, template_for, Segment, NOT_DOCUMENTED};

/// Renders the narrative note for a visit from its checklist record.
///
/// Substitution rules, per placeholder:
/// - A required field with a missing or empty value renders as [`NOT_DOCUMENTED`], so
///   documentation gaps are visible in the note rather than silently dropped.
/// - Choice values are re-normalised at render time, so canonical casing holds even for
///   records written before a capture surface normalised its input.
/// - A sentence whose placeholders are all advisory and all empty is omitted whole;
///   sentences containing any required placeholder are always emitted.
pub fn render(visit_type: VisitType, record: &ChecklistRecord) -> String {
    let mut note = String::new();

    for segment in template_for(visit_type) {
        match segment {
            Segment::Heading(text) => {
                if !note.is_empty() {
                    note.push('\n');
                }
                note.push_str(text);
                note.push('\n');
            }
            Segment::Sentence(sentence) => {
                if let Some(line) = substitute(visit_type, sentence, record) {
                    note.push_str(&line);
                    note.push('\n');
                }
            }
        }
    }

    note
}

/// Substitutes one sentence, returning `None` when the sentence should be omitted.
fn substitute(
    visit_type: VisitType,
    sentence: &str,
    record: &ChecklistRecord,
) -> Option<String> {
    let mut out = String::with_capacity(sentence.len());
    let mut any_placeholder = false;
    let mut any_required = false;
    let mut any_value = false;

    let mut rest = sentence;
    while let Some(open) = rest.find('{') {
        let after_open = &rest[open + 1..];
        let Some(close) = after_open.find('}') else {
            break;
        };
        let key = &after_open[..close];

        out.push_str(&rest[..open]);
        any_placeholder = true;

        let descriptor = schema::descriptor(visit_type, key);
        let required = descriptor.is_some_and(|d| d.required);
        if required {
            any_required = true;
        }

        let value = match descriptor {
            Some(descriptor) => normalise_value(&descriptor.kind, record.value(key)),
            // Guarded against by the template tests; kept total for safety.
            None => record.value(key).trim().to_string(),
        };

        if value.is_empty() {
            if required {
                out.push_str(NOT_DOCUMENTED);
            }
        } else {
            any_value = true;
            out.push_str(&value);
        }

        rest = &after_open[close + 1..];
    }
    out.push_str(rest);

    if any_placeholder && !any_required && !any_value {
        return None;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::fields_for;

    fn empty_record(visit_type: VisitType) -> ChecklistRecord {
        ChecklistRecord::conform(visit_type, Vec::<(&str, &str)>::new())
    }

    #[test]
    fn empty_record_flags_every_required_field() {
        for visit_type in VisitType::ALL {
            let note = render(*visit_type, &empty_record(*visit_type));

            let required = fields_for(*visit_type).filter(|d| d.required).count();
            let sentinels = note.matches(NOT_DOCUMENTED).count();
            assert!(
                sentinels >= required,
                "{visit_type}: expected at least {required} sentinels, found {sentinels}"
            );
        }
    }

    #[test]
    fn no_raw_placeholder_tokens_survive_rendering() {
        for visit_type in VisitType::ALL {
            let note = render(*visit_type, &empty_record(*visit_type));
            assert!(!note.contains('{'), "{visit_type} note leaked a placeholder");
            assert!(!note.contains('}'), "{visit_type} note leaked a placeholder");
        }
    }

    #[test]
    fn rendering_is_deterministic() {
        let record = ChecklistRecord::conform(
            VisitType::Soc,
            vec![
                ("insurance", "Medicare A"),
                ("goal_quote", "ambulate 50ft with rolling walker"),
                ("dx_htn", "yes"),
            ],
        );

        let first = render(VisitType::Soc, &record);
        let second = render(VisitType::Soc, &record);
        assert_eq!(first, second);
    }

    #[test]
    fn values_substitute_into_their_template_slots() {
        let record = ChecklistRecord::conform(
            VisitType::Soc,
            vec![("goal_quote", "ambulate 50ft with rolling walker")],
        );

        let note = render(VisitType::Soc, &record);
        assert!(note.contains("GOAL: \"ambulate 50ft with rolling walker\"."));
    }

    #[test]
    fn choice_casing_is_canonical_regardless_of_capture() {
        // Bypass conform's normalisation to mimic a record written by an older capture
        // surface that stored the raw answer.
        let record: ChecklistRecord =
            vec![("dx_htn".to_string(), "yes".to_string())].into_iter().collect();

        let note = render(VisitType::Soc, &record);
        assert!(note.contains("HTN YES"));
        assert!(!note.contains("HTN yes"));
    }

    #[test]
    fn advisory_only_sentences_are_omitted_when_blank() {
        let note = render(VisitType::Soc, &empty_record(VisitType::Soc));
        // plan_sentence and the clinical-quick block are advisory; their sentences drop.
        assert!(!note.contains("PLAN:"));
        assert!(!note.contains("TINETTI:"));

        let filled = ChecklistRecord::conform(
            VisitType::Soc,
            vec![("plan_sentence", "Continue POC as written.")],
        );
        let note = render(VisitType::Soc, &filled);
        assert!(note.contains("PLAN: Continue POC as written."));
    }

    #[test]
    fn required_sentences_are_never_omitted() {
        let note = render(VisitType::Soc, &empty_record(VisitType::Soc));
        assert!(note.contains(&format!("Insurance: {NOT_DOCUMENTED}.")));
        assert!(note.contains(&format!("GOAL: \"{NOT_DOCUMENTED}\".")));
    }

    #[test]
    fn initial_eval_renders_section_headings() {
        let record = ChecklistRecord::conform(
            VisitType::InitialEval,
            vec![("ie_subjective", "Patient reports knee pain 6/10.")],
        );

        let note = render(VisitType::InitialEval, &record);
        assert!(note.starts_with("INITIAL EVALUATION\n"));
        assert!(note.contains("SUBJECTIVE: Patient reports knee pain 6/10."));
        assert!(note.contains("\nOBJECTIVE\n"));
    }
}
