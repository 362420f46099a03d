//! Per-visit-type narrative templates.
//!
//! A template is a fixed, ordered sequence of segments: headings and sentences. Sentences
//! may embed `{key}` placeholders bound to checklist field keys. The skeleton never varies
//! at runtime; only the substituted values do, which is what makes note generation
//! deterministic and reviewable.

use crate::schema::VisitType;

/// Fallback sentinel substituted for a required field with no documented value.
///
/// A generated note must always be syntactically complete: a gap in required
/// documentation is flagged in the note body, never silently omitted.
pub const NOT_DOCUMENTED: &str = "[not documented]";

/// One template segment.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Segment {
    /// A section heading, emitted verbatim.
    Heading(&'static str),
    /// A narrative sentence, possibly containing `{key}` placeholders.
    Sentence(&'static str),
}

use Segment::{Heading, Sentence};

/// Start-of-care narrative. Section order follows the SOC schema layout.
static SOC_TEMPLATE: &[Segment] = &[
    Heading("START OF CARE NOTE"),
    Sentence("Insurance: {insurance}. Admit date: {admit_date}."),
    Sentence("Recent hospitalization related to {recent_hosp_related_to}."),
    Sentence("Patient is homebound due to {homebound_due_to_phrase}."),
    Sentence("Referred by Dr. {referred_by_dr}. Caregiver to assist with ADLs: {assist_with_adls}."),
    Heading("GOAL / PLAN"),
    Sentence("GOAL: \"{goal_quote}\"."),
    Sentence("ADDITIONAL COMMENTS: {additional_comments}"),
    Sentence("PLAN: {plan_sentence}"),
    Heading("ADVANCE DIRECTIVE / POA"),
    Sentence("Patient/caregiver instructed and educated regarding advance directives: {ad_poa_educated}. Forms provided and reviewed: {ad_poa_reviewed}. Forms left in home: {ad_poa_left}."),
    Heading("MEDICATION SAFETY"),
    Sentence("Changed/updated medications: {med_changed_updated}."),
    Sentence("Performed medication reconciliation this date: {med_reconciliation}."),
    Sentence("All medications present in home: {meds_present}."),
    Heading("SKILLED OBSERVATION"),
    Sentence("Teaching and training provided for {teaching_training_for}."),
    Sentence("Vitals within parameters: {vitals_within_params}. Notified: {who_notified}."),
    Sentence("Diagnosis flags: HTN {dx_htn}; COPD {dx_copd}; DEPRESSION {dx_depression}; DMII {dx_dmii}; CHF {dx_chf}."),
    Heading("CARDIOVASCULAR"),
    Sentence("Edema: {cv_edema}. Palpitations: {cv_palpitations}. Endurance: {cv_endurance}."),
    Sentence("Unable to weigh due to {cv_unable_weigh}. Circumference RIGHT (ankle/calf): {cv_right_cm} cm; LEFT (ankle/calf): {cv_left_cm} cm."),
    Heading("RESPIRATORY / GI / WOUND / INFECTION"),
    Sentence("Uses supplemental oxygen: {resp_uses_o2}."),
    Sentence("Oxygen at {resp_o2_lpm} L/min via {resp_o2_route}."),
    Sentence("Nebulizer: {resp_nebulizer}. Short of breath: {resp_sob}."),
    Sentence("Last bowel movement: {gi_last_bm}. Appetite: {gi_appetite}."),
    Sentence("WOUND: {wound_statement}"),
    Sentence("Covid symptoms reported: {covid_symptoms_reported}."),
    Sentence("Covid symptom detail/actions: {covid_symptoms_detail}"),
    Heading("HOME SAFETY / EMERGENCY PREPAREDNESS / PHQ-2"),
    Sentence("Home safety teaching: {home_safety_teaching}"),
    Sentence("Emergency preparedness: FAMILY {emerg_family} with {emerg_with}, aware of special needs of {emerg_special_needs}."),
    Sentence("PHQ-2: little interest or pleasure {phq2_interest}; feeling down or depressed {phq2_depressed}."),
    Heading("INTERVENTIONS / HEP"),
    Sentence("GAIT/BALANCE TRAINING: {gait_balance_training}"),
    Sentence("TRANSFER TRAINING: {transfer_training}"),
    Sentence("THER EX: {ther_ex}"),
    Sentence("HEP: {hep_details}"),
    Heading("MD / RISKS / GOALS"),
    Sentence("Attending MD: {attending_md}. Primary Dx / focus of care: {primary_dx_focus}."),
    Sentence("Re-hospitalization risks: {rehosp_risks}"),
    Sentence("Anticipated needs/education for future visits: {anticipated_needs_future}"),
    Sentence("Short term goals to be met in {short_term_weeks} weeks. Long term goals to be met in {long_term_weeks} weeks."),
    Sentence("Patient identified goal: {patient_identified_goal}"),
    Heading("CLINICAL FINDINGS"),
    Sentence("HISTORY: {history}"),
    Sentence("ROM: {rom}"),
    Sentence("STRENGTH: {strength}"),
    Sentence("ENDURANCE: {endurance_obj}"),
    Sentence("SENSATION: {sensation}"),
    Sentence("TRANSFERS: {transfers}"),
    Sentence("GAIT: {gait}"),
    Sentence("TINETTI: {tinetti}"),
    Sentence("BALANCE (STATIC STANDING): {balance_static}"),
    Sentence("DISEASE MGMT: {disease_mgmt}"),
    Sentence("SPECIAL INSTRUCTIONS/PRECAUTIONS: {special_instructions_precautions}"),
];

/// Initial-evaluation narrative.
static INITIAL_EVAL_TEMPLATE: &[Segment] = &[
    Heading("INITIAL EVALUATION"),
    Sentence("SUBJECTIVE: {ie_subjective}"),
    Sentence("HOMEBOUND: {ie_homebound}"),
    Sentence("REFERRED BY: {ie_referred_by}"),
    Sentence("LIVING ARRANGEMENTS: {ie_living}"),
    Sentence("HISTORY: {ie_history}"),
    Sentence("PRIOR LEVEL OF FUNCTION: {ie_plof}"),
    Sentence("FALL HISTORY: {ie_falls}"),
    Heading("OBJECTIVE"),
    Sentence("ROM: {ie_rom}"),
    Sentence("STRENGTH: {ie_strength}"),
    Sentence("ENDURANCE: {ie_endurance}"),
    Sentence("SENSATION: {ie_sensation}"),
    Sentence("TRANSFERS: {ie_transfers}"),
    Sentence("GAIT: {ie_gait}"),
    Sentence("BALANCE: {ie_balance}"),
    Sentence("TINETTI: {ie_tinetti}"),
    Heading("SKILLED"),
    Sentence("VITALS: {ie_vitals}"),
    Sentence("DISEASE MGMT: {ie_disease_mgmt}"),
    Sentence("SPECIAL INSTRUCTIONS/PRECAUTIONS: {ie_precautions}"),
    Sentence("HOME SAFETY: {ie_home_safety}"),
    Sentence("PHQ-2: {ie_phq2}"),
    Heading("INTERVENTIONS"),
    Sentence("GAIT/BALANCE TRAINING: {ie_gait_training}"),
    Sentence("TRANSFER TRAINING: {ie_transfer_training}"),
    Sentence("THER EX: {ie_therex}"),
    Heading("GOALS / PROGRESS"),
    Sentence("{ie_goals_progress}"),
];

/// Returns the narrative template for a visit type.
pub(crate) fn template_for(visit_type: VisitType) -> &'static [Segment] {
    match visit_type {
        VisitType::Soc => SOC_TEMPLATE,
        VisitType::InitialEval => INITIAL_EVAL_TEMPLATE,
    }
}

/// Iterates over the `{key}` placeholder names embedded in a sentence.
pub(crate) fn placeholders(sentence: &str) -> impl Iterator<Item = &str> {
    let mut rest = sentence;
    std::iter::from_fn(move || {
        let open = rest.find('{')?;
        let after_open = &rest[open + 1..];
        let close = after_open.find('}')?;
        let key = &after_open[..close];
        rest = &after_open[close + 1..];
        Some(key)
    })
}
