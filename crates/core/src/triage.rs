//! Structured triage state.
//!
//! Ten optional fields accumulate over a conversation. Text fields only ever grow: a new
//! distinct value is appended with `"; "` and a repeated value is ignored. Severity is numeric and
//! is replaced whenever the user states a new explicit rating.

use grokdoc_types::Severity;
use serde::{Deserialize, Serialize};

use crate::constants::CRITICAL_FIELD_COUNT;

/// Recorded for a field the user explicitly denied ("no", "none", ...).
pub const NONE_VALUE: &str = "none";

const VALUE_SEPARATOR: &str = "; ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub enum TriageField {
    Onset,
    Severity,
    AssociatedSymptoms,
    MedicalHistory,
    FamilyHistory,
    Meds,
    Allergies,
    Lifestyle,
    SubstanceUse,
    ImpactDaily,
}

impl TriageField {
    pub const ALL: [TriageField; 10] = [
        TriageField::Onset,
        TriageField::Severity,
        TriageField::AssociatedSymptoms,
        TriageField::MedicalHistory,
        TriageField::FamilyHistory,
        TriageField::Meds,
        TriageField::Allergies,
        TriageField::Lifestyle,
        TriageField::SubstanceUse,
        TriageField::ImpactDaily,
    ];

    /// Fields that gate plan generation.
    pub const CRITICAL: [TriageField; CRITICAL_FIELD_COUNT] = [
        TriageField::Onset,
        TriageField::Severity,
        TriageField::MedicalHistory,
        TriageField::Meds,
    ];

    pub fn is_critical(self) -> bool {
        Self::CRITICAL.contains(&self)
    }

    /// Human wording, used in prompts.
    pub fn label(self) -> &'static str {
        match self {
            TriageField::Onset => "when it started",
            TriageField::Severity => "how severe it is on a scale of 1 to 10",
            TriageField::AssociatedSymptoms => "any other symptoms",
            TriageField::MedicalHistory => "your medical history",
            TriageField::FamilyHistory => "your family history",
            TriageField::Meds => "any medications you take",
            TriageField::Allergies => "any allergies",
            TriageField::Lifestyle => "your lifestyle (diet, exercise, stress)",
            TriageField::SubstanceUse => "smoking, alcohol or other substance use",
            TriageField::ImpactDaily => "how it affects your daily life",
        }
    }

    /// Short heading, used in summaries.
    pub fn heading(self) -> &'static str {
        match self {
            TriageField::Onset => "Onset",
            TriageField::Severity => "Severity",
            TriageField::AssociatedSymptoms => "Associated symptoms",
            TriageField::MedicalHistory => "Medical history",
            TriageField::FamilyHistory => "Family history",
            TriageField::Meds => "Medications",
            TriageField::Allergies => "Allergies",
            TriageField::Lifestyle => "Lifestyle",
            TriageField::SubstanceUse => "Substance use",
            TriageField::ImpactDaily => "Impact on daily life",
        }
    }
}

impl std::fmt::Display for TriageField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.heading())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(default, rename_all = "camelCase")]
pub struct TriageState {
    pub onset: Option<String>,
    pub severity: Option<Severity>,
    pub associated_symptoms: Option<String>,
    pub medical_history: Option<String>,
    pub family_history: Option<String>,
    pub meds: Option<String>,
    pub allergies: Option<String>,
    pub lifestyle: Option<String>,
    pub substance_use: Option<String>,
    pub impact_daily: Option<String>,
}

impl TriageState {
    pub fn new() -> Self {
        Self::default()
    }

    fn text_slot(&self, field: TriageField) -> Option<&Option<String>> {
        match field {
            TriageField::Onset => Some(&self.onset),
            TriageField::Severity => None,
            TriageField::AssociatedSymptoms => Some(&self.associated_symptoms),
            TriageField::MedicalHistory => Some(&self.medical_history),
            TriageField::FamilyHistory => Some(&self.family_history),
            TriageField::Meds => Some(&self.meds),
            TriageField::Allergies => Some(&self.allergies),
            TriageField::Lifestyle => Some(&self.lifestyle),
            TriageField::SubstanceUse => Some(&self.substance_use),
            TriageField::ImpactDaily => Some(&self.impact_daily),
        }
    }

    fn text_slot_mut(&mut self, field: TriageField) -> Option<&mut Option<String>> {
        match field {
            TriageField::Onset => Some(&mut self.onset),
            TriageField::Severity => None,
            TriageField::AssociatedSymptoms => Some(&mut self.associated_symptoms),
            TriageField::MedicalHistory => Some(&mut self.medical_history),
            TriageField::FamilyHistory => Some(&mut self.family_history),
            TriageField::Meds => Some(&mut self.meds),
            TriageField::Allergies => Some(&mut self.allergies),
            TriageField::Lifestyle => Some(&mut self.lifestyle),
            TriageField::SubstanceUse => Some(&mut self.substance_use),
            TriageField::ImpactDaily => Some(&mut self.impact_daily),
        }
    }

    /// Display value of a field, if filled.
    pub fn value(&self, field: TriageField) -> Option<String> {
        match field {
            TriageField::Severity => self.severity.map(|s| s.value().to_string()),
            other => self.text_slot(other).and_then(Clone::clone),
        }
    }

    pub fn is_filled(&self, field: TriageField) -> bool {
        match field {
            TriageField::Severity => self.severity.is_some(),
            other => self
                .text_slot(other)
                .is_some_and(|slot| slot.as_deref().is_some_and(|v| !v.trim().is_empty())),
        }
    }

    /// Append `value` to a text field.
    ///
    /// Returns `true` if the state changed. Severity is not a text field and is never touched
    /// here; use [`TriageState::set_severity`].
    pub fn record(&mut self, field: TriageField, value: &str) -> bool {
        let value = value.trim();
        if value.is_empty() {
            return false;
        }
        let Some(slot) = self.text_slot_mut(field) else {
            return false;
        };

        if let Some(existing) = slot.as_mut() {
            let already_present = existing
                .split(VALUE_SEPARATOR)
                .any(|part| part.eq_ignore_ascii_case(value));
            if already_present {
                return false;
            }
            existing.push_str(VALUE_SEPARATOR);
            existing.push_str(value);
            return true;
        }

        *slot = Some(value.to_string());
        true
    }

    /// Replace severity. Returns `true` if it changed.
    pub fn set_severity(&mut self, severity: Severity) -> bool {
        let changed = self.severity != Some(severity);
        self.severity = Some(severity);
        changed
    }

    pub fn filled_fields(&self) -> Vec<TriageField> {
        TriageField::ALL
            .into_iter()
            .filter(|field| self.is_filled(*field))
            .collect()
    }

    pub fn critical_count(&self) -> usize {
        TriageField::CRITICAL
            .into_iter()
            .filter(|field| self.is_filled(*field))
            .count()
    }

    /// Critical fields still empty, in canonical order.
    pub fn missing_critical(&self) -> Vec<TriageField> {
        TriageField::CRITICAL
            .into_iter()
            .filter(|field| !self.is_filled(*field))
            .collect()
    }

    pub fn is_sufficient(&self) -> bool {
        self.critical_count() == CRITICAL_FIELD_COUNT
    }

    /// One line per field, "not provided" for gaps.
    pub fn summary(&self) -> String {
        TriageField::ALL
            .into_iter()
            .map(|field| {
                let value = match field {
                    TriageField::Severity => self.severity.map(|s| s.to_string()),
                    other => self.value(other),
                };
                format!(
                    "{}: {}",
                    field.heading(),
                    value.as_deref().unwrap_or("not provided")
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
