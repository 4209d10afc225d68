//! JSON bodies exchanged over the REST API.
//!
//! All bodies use camelCase keys. Core types that appear unchanged on the wire (turns, triage
//! state, plan tasks) are reused directly rather than mirrored.

use grokdoc_core::{
    ChatReply, Confidence, ConversationTurn, DaySummary, EscalationReason, Extraction, Facility,
    ModelTier, PlanProgress, PlanTask, TriageField, TriageState,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

impl ErrorRes {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChatReq {
    pub conversation: Vec<ConversationTurn>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChatRes {
    /// The assistant's reply.
    pub diagnosis: String,
    pub model: String,
    pub tier: ModelTier,
    /// `true` when the reply is the fixed apology after an upstream failure.
    pub fallback: bool,
}

impl From<ChatReply> for ChatRes {
    fn from(reply: ChatReply) -> Self {
        Self {
            diagnosis: reply.text,
            model: reply.model,
            tier: reply.tier,
            fallback: reply.fallback,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PlanRes {
    pub tasks: Vec<PlanTask>,
    pub progress: PlanProgress,
    pub days: Vec<DaySummary>,
}

/// Returned instead of a plan while critical triage fields are missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PlanClarificationRes {
    pub prompt: String,
    pub missing: Vec<TriageField>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FacilitiesQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// Search radius in metres.
    pub radius: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FacilityDto {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub distance_km: f64,
    pub map_distance_m: f64,
    pub directions_url: String,
}

impl From<Facility> for FacilityDto {
    fn from(facility: Facility) -> Self {
        Self {
            lat: facility.record.location.lat(),
            lng: facility.record.location.lng(),
            id: facility.record.id,
            name: facility.record.name,
            address: facility.record.address,
            distance_km: facility.distance_km,
            map_distance_m: facility.map_distance_m,
            directions_url: facility.directions_url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FacilitiesRes {
    pub results: Vec<FacilityDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TriageReq {
    #[serde(default)]
    pub triage_state: TriageState,
    pub user_text: String,
    #[serde(default)]
    pub preceding_assistant: Option<String>,
    #[serde(default)]
    pub previous_target: Option<TriageField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TriageRes {
    pub triage_state: TriageState,
    pub target: Option<TriageField>,
    pub candidates: Vec<TriageField>,
    pub confidence: Confidence,
    pub updated: Vec<TriageField>,
    pub critical_count: usize,
    pub missing_critical: Vec<TriageField>,
    pub urgent: bool,
    pub escalation_reasons: Vec<EscalationReason>,
}

impl TriageRes {
    pub fn new(extraction: Extraction, urgent: bool, reasons: Vec<EscalationReason>) -> Self {
        Self {
            critical_count: extraction.state.critical_count(),
            missing_critical: extraction.state.missing_critical(),
            triage_state: extraction.state,
            target: extraction.target,
            candidates: extraction.candidates,
            confidence: extraction.confidence,
            updated: extraction.updated,
            urgent,
            escalation_reasons: reasons,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InsightsReq {
    #[serde(default)]
    pub health_data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct InsightsRes {
    pub insights: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use grokdoc_core::FacilityRecord;
    use grokdoc_core::LatLng;

    #[test]
    fn chat_res_uses_diagnosis_key() {
        let res = ChatRes::from(ChatReply {
            text: "Rest up.".into(),
            tier: ModelTier::Fast,
            model: "grok-2-latest".into(),
            fallback: false,
        });
        let json = serde_json::to_value(res).unwrap();
        assert_eq!(json["diagnosis"], "Rest up.");
        assert_eq!(json["tier"], "fast");
    }

    #[test]
    fn facility_dto_flattens_the_record() {
        let dto = FacilityDto::from(Facility {
            record: FacilityRecord {
                id: "p1".into(),
                name: "Mission Urgent Care".into(),
                location: LatLng::new(37.76, -122.42).unwrap(),
                address: Some("1 Main St".into()),
            },
            distance_km: 1.5,
            map_distance_m: 1501.2,
            directions_url: "https://www.google.com/maps/dir/?api=1&destination=37.76,-122.42"
                .into(),
        });
        let json = serde_json::to_value(dto).unwrap();
        assert_eq!(json["lat"], 37.76);
        assert_eq!(json["distanceKm"], 1.5);
        assert_eq!(json["mapDistanceM"], 1501.2);
        assert!(json["directionsUrl"].as_str().unwrap().ends_with("37.76,-122.42"));
    }

    #[test]
    fn triage_req_defaults_optional_fields() {
        let req: TriageReq = serde_json::from_str(r#"{"userText": "no meds"}"#).unwrap();
        assert_eq!(req.triage_state, TriageState::default());
        assert_eq!(req.preceding_assistant, None);
    }
}
