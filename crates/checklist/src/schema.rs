//! Per-visit-type checklist schemas.
//!
//! Schemas are process-wide static configuration: declared once here, never mutated at
//! runtime, and safe for unsynchronised concurrent reads. Field keys are the join surface
//! between the capture UI, the store, and the note renderer, and must never be renamed
//! without a data migration.

use crate::ChecklistError;
use std::fmt;
use std::str::FromStr;

/// The closed set of visit types HVN documents.
///
/// The visit type is fixed when a visit is created and selects both the checklist schema
/// and the narrative template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisitType {
    /// Start of care.
    Soc,
    /// Initial evaluation.
    InitialEval,
}

impl VisitType {
    /// All registered visit types.
    pub const ALL: &'static [VisitType] = &[VisitType::Soc, VisitType::InitialEval];

    /// The wire name of this visit type, as stored on disk and accepted from callers.
    pub fn as_str(&self) -> &'static str {
        match self {
            VisitType::Soc => "SOC",
            VisitType::InitialEval => "InitialEval",
        }
    }
}

impl fmt::Display for VisitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisitType {
    type Err = ChecklistError;

    /// Parses a wire name into a visit type.
    ///
    /// # Errors
    ///
    /// Returns [`ChecklistError::UnknownVisitType`] for any name with no registered
    /// schema. Callers must treat this as fatal to the open-visit flow for that visit,
    /// not to the whole session.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SOC" => Ok(VisitType::Soc),
            "InitialEval" => Ok(VisitType::InitialEval),
            other => Err(ChecklistError::UnknownVisitType(other.to_string())),
        }
    }
}

/// The value kind of a checklist field.
///
/// The kind drives value normalisation (see [`crate::record`]) and capture presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Single-line free text.
    Text,
    /// Multi-line free text.
    Multiline,
    /// A calendar date, stored canonically as `YYYY-MM-DD`.
    Date,
    /// One of a fixed option set, stored in the option's canonical casing.
    Choice { options: &'static [&'static str] },
}

/// Canonical option set for yes/no fields.
pub const YES_NO: &[&str] = &["YES", "NO"];

/// One checklist field: key, display label, value kind, and requiredness.
///
/// `required` is advisory: absence does not block a save, it only selects the fallback
/// sentinel during note rendering.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

/// One entry in a schema layout: a section header or a field.
#[derive(Debug, Clone, Copy)]
pub enum SchemaItem {
    Header(&'static str),
    Field(FieldDescriptor),
}

const fn header(text: &'static str) -> SchemaItem {
    SchemaItem::Header(text)
}

const fn text(key: &'static str, label: &'static str, required: bool) -> SchemaItem {
    SchemaItem::Field(FieldDescriptor {
        key,
        label,
        kind: FieldKind::Text,
        required,
    })
}

const fn multiline(key: &'static str, label: &'static str, required: bool) -> SchemaItem {
    SchemaItem::Field(FieldDescriptor {
        key,
        label,
        kind: FieldKind::Multiline,
        required,
    })
}

const fn date(key: &'static str, label: &'static str, required: bool) -> SchemaItem {
    SchemaItem::Field(FieldDescriptor {
        key,
        label,
        kind: FieldKind::Date,
        required,
    })
}

const fn yes_no(key: &'static str, label: &'static str, required: bool) -> SchemaItem {
    SchemaItem::Field(FieldDescriptor {
        key,
        label,
        kind: FieldKind::Choice { options: YES_NO },
        required,
    })
}

/// Start-of-care checklist.
static SOC_SCHEMA: &[SchemaItem] = &[
    header("Header"),
    text("insurance", "Insurance", true),
    date("admit_date", "Admit date", true),
    text(
        "recent_hosp_related_to",
        "Recent hospitalization / related to",
        true,
    ),
    text(
        "homebound_due_to_phrase",
        "Homebound due to (exact phrase)",
        true,
    ),
    text("referred_by_dr", "Referred by DR.", true),
    text("assist_with_adls", "Assist with ADLs", true),
    header("Goal + Plan"),
    text("goal_quote", "GOAL: \"___\"", true),
    text("additional_comments", "ADDITIONAL COMMENTS", true),
    text("plan_sentence", "PLAN (exact sentence if different)", false),
    header("Advance Directive/POA"),
    yes_no("ad_poa_educated", "Patient/caregiver instructed/educated", true),
    yes_no("ad_poa_reviewed", "Forms provided and reviewed", true),
    yes_no("ad_poa_left", "Forms left in home", true),
    header("Medication Safety"),
    text("med_changed_updated", "Changed/Updated medications", true),
    text(
        "med_reconciliation",
        "Performed medication reconciliation this date",
        true,
    ),
    text("meds_present", "All medications present in home", true),
    header("Skilled Obs + Dx flags"),
    text("teaching_training_for", "Teaching and training for", true),
    text("vitals_within_params", "Vitals within parameters?", true),
    text("who_notified", "Who notified (Case Manager/PCP)", true),
    yes_no("dx_htn", "HTN", true),
    yes_no("dx_copd", "COPD", true),
    yes_no("dx_depression", "DEPRESSION", true),
    yes_no("dx_dmii", "DMII", true),
    yes_no("dx_chf", "CHF", true),
    header("Cardiovascular"),
    text("cv_edema", "Edema", true),
    text("cv_palpitations", "Palpitations", true),
    text("cv_endurance", "Endurance", true),
    text("cv_unable_weigh", "Unable to weigh due to", true),
    text("cv_right_cm", "RIGHT (ankle/calf) cm", true),
    text("cv_left_cm", "LEFT (ankle/calf) cm", true),
    header("Resp / GI / Wound / Infection"),
    yes_no("resp_uses_o2", "Uses supplemental oxygen", true),
    text("resp_o2_lpm", "Oxygen L/min", false),
    text("resp_o2_route", "Route (nasal cannula)", false),
    yes_no("resp_nebulizer", "Nebulizer", true),
    text("resp_sob", "Short of Breath", true),
    date("gi_last_bm", "Last bowel movement", true),
    text("gi_appetite", "Appetite", true),
    multiline("wound_statement", "WOUND statement", true),
    yes_no("covid_symptoms_reported", "Covid symptoms reported", true),
    multiline("covid_symptoms_detail", "Symptoms detail/actions", false),
    header("Home safety + Emergency preparedness + PHQ-2"),
    multiline(
        "home_safety_teaching",
        "Home safety teaching (exact phrase)",
        true,
    ),
    text("emerg_family", "FAMILY", true),
    text("emerg_with", "with ___", true),
    text("emerg_special_needs", "special needs of ___", true),
    text("phq2_interest", "PHQ-2 interest answer", true),
    text("phq2_depressed", "PHQ-2 depressed answer", true),
    header("HEP + MD/risks/goals"),
    multiline("gait_balance_training", "GAIT/BALANCE TRAINING", false),
    multiline("transfer_training", "TRANSFER TRAINING", false),
    multiline("ther_ex", "THER EX", false),
    multiline("hep_details", "HEP details", true),
    text("attending_md", "Attending MD", true),
    text("primary_dx_focus", "Primary Dx / focus of care", true),
    multiline("rehosp_risks", "Re-hospitalization risks", true),
    multiline(
        "anticipated_needs_future",
        "Anticipated needs/education future visits",
        true,
    ),
    text("short_term_weeks", "Short term goals weeks", true),
    text("long_term_weeks", "Long term goals weeks", true),
    multiline("patient_identified_goal", "Patient identified goal", true),
    header("Clinical (quick)"),
    multiline("history", "HISTORY", false),
    multiline("rom", "ROM", false),
    multiline("strength", "STRENGTH", false),
    multiline("endurance_obj", "ENDURANCE", false),
    multiline("sensation", "SENSATION", false),
    multiline("transfers", "TRANSFERS", false),
    multiline("gait", "GAIT", false),
    multiline("tinetti", "TINETTI", false),
    multiline("balance_static", "BALANCE STATIC STANDING", false),
    multiline("disease_mgmt", "DISEASE MGMT", false),
    multiline(
        "special_instructions_precautions",
        "SPECIAL INSTRUCTIONS/PRECAUTIONS",
        false,
    ),
];

/// Initial-evaluation checklist.
static INITIAL_EVAL_SCHEMA: &[SchemaItem] = &[
    header("Initial Eval"),
    multiline("ie_subjective", "SUBJECTIVE", false),
    multiline("ie_homebound", "HOMEBOUND", false),
    multiline("ie_referred_by", "REFERRED BY", false),
    multiline("ie_living", "LIVING ARRANGEMENTS", false),
    multiline("ie_history", "HISTORY", false),
    multiline("ie_plof", "PRIOR LEVEL OF FUNCTION", false),
    multiline("ie_falls", "FALL HISTORY", false),
    header("Objective"),
    multiline("ie_rom", "ROM", false),
    multiline("ie_strength", "STRENGTH", false),
    multiline("ie_endurance", "ENDURANCE", false),
    multiline("ie_sensation", "SENSATION", false),
    multiline("ie_transfers", "TRANSFERS", false),
    multiline("ie_gait", "GAIT", false),
    multiline("ie_balance", "BALANCE", false),
    multiline("ie_tinetti", "TINETTI", false),
    header("Skilled"),
    multiline("ie_vitals", "VITALS", false),
    multiline("ie_disease_mgmt", "DISEASE MGMT", false),
    multiline("ie_precautions", "SPECIAL INSTRUCTIONS/PRECAUTIONS", false),
    multiline("ie_home_safety", "HOME SAFETY", false),
    multiline("ie_phq2", "PHQ-2", false),
    header("Interventions"),
    multiline("ie_gait_training", "GAIT/BALANCE TRAINING", false),
    multiline("ie_transfer_training", "TRANSFER TRAINING", false),
    multiline("ie_therex", "THER EX", false),
    header("Goals / Progress"),
    multiline("ie_goals_progress", "GOALS / PROGRESS", false),
];

/// Returns the full schema layout (headers and fields, in capture order) for a visit type.
pub fn layout_for(visit_type: VisitType) -> &'static [SchemaItem] {
    match visit_type {
        VisitType::Soc => SOC_SCHEMA,
        VisitType::InitialEval => INITIAL_EVAL_SCHEMA,
    }
}

/// Returns the ordered field descriptors for a visit type, headers elided.
pub fn fields_for(visit_type: VisitType) -> impl Iterator<Item = &'static FieldDescriptor> {
    layout_for(visit_type).iter().filter_map(|item| match item {
        SchemaItem::Field(descriptor) => Some(descriptor),
        SchemaItem::Header(_) => None,
    })
}

/// Looks up the descriptor for `key` within a visit type's schema.
pub fn descriptor(visit_type: VisitType, key: &str) -> Option<&'static FieldDescriptor> {
    fields_for(visit_type).find(|descriptor| descriptor.key == key)
}
