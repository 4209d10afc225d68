//! Model tier selection.
//!
//! Every chat request is routed on its own. The advanced tier is used when the latest user turn
//! carries a lab result or medical record, or asks for a diagnosis; everything else goes to the
//! fast conversational tier. Nothing is remembered between requests, so one diagnosis question
//! does not pin the rest of the session to the slower model.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::conversation::{AttachmentPurpose, ConversationTurn};

static DIAGNOSIS_REQUEST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bdiagnos\w*").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    Fast,
    Advanced,
}

impl std::fmt::Display for ModelTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelTier::Fast => f.write_str("fast"),
            ModelTier::Advanced => f.write_str("advanced"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteReason {
    Conversational,
    DocumentAttached(AttachmentPurpose),
    DiagnosisRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteDecision {
    pub tier: ModelTier,
    pub reason: RouteReason,
}

/// Pick the tier for a conversation about to be sent upstream.
pub fn select(turns: &[ConversationTurn]) -> RouteDecision {
    let Some(latest) = turns.iter().rev().find(|turn| turn.is_user()) else {
        return RouteDecision {
            tier: ModelTier::Fast,
            reason: RouteReason::Conversational,
        };
    };

    if let Some(purpose) = latest
        .attachment_purposes()
        .into_iter()
        .find(|purpose| purpose.is_document())
    {
        return RouteDecision {
            tier: ModelTier::Advanced,
            reason: RouteReason::DocumentAttached(purpose),
        };
    }

    if DIAGNOSIS_REQUEST.is_match(&latest.text()) {
        return RouteDecision {
            tier: ModelTier::Advanced,
            reason: RouteReason::DiagnosisRequested,
        };
    }

    RouteDecision {
        tier: ModelTier::Fast,
        reason: RouteReason::Conversational,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Attachment;

    #[test]
    fn plain_chat_uses_the_fast_tier() {
        let turns = vec![
            ConversationTurn::assistant("What are your symptoms?"),
            ConversationTurn::user("sore throat"),
        ];
        assert_eq!(select(&turns).tier, ModelTier::Fast);
    }

    #[test]
    fn diagnosis_requests_use_the_advanced_tier() {
        let turns = vec![ConversationTurn::user("Can you diagnose this?")];
        let decision = select(&turns);
        assert_eq!(decision.tier, ModelTier::Advanced);
        assert_eq!(decision.reason, RouteReason::DiagnosisRequested);
    }

    #[test]
    fn lab_uploads_use_the_advanced_tier() {
        let turns = vec![ConversationTurn::user_with_attachments(
            "here you go",
            vec![Attachment {
                uri: "data:image/png;base64,AA".into(),
                purpose: AttachmentPurpose::Labs,
            }],
        )];
        assert_eq!(
            select(&turns).reason,
            RouteReason::DocumentAttached(AttachmentPurpose::Labs)
        );
    }

    #[test]
    fn photos_alone_stay_on_the_fast_tier() {
        let turns = vec![ConversationTurn::user_with_attachments(
            "rash",
            vec![Attachment {
                uri: "https://img.example/rash.jpg".into(),
                purpose: AttachmentPurpose::Photo,
            }],
        )];
        assert_eq!(select(&turns).tier, ModelTier::Fast);
    }

    #[test]
    fn routing_is_not_sticky() {
        let turns = vec![
            ConversationTurn::user("what's my diagnosis?"),
            ConversationTurn::assistant("Possibly a cold."),
            ConversationTurn::user("thanks, how much water should I drink?"),
        ];
        assert_eq!(select(&turns).tier, ModelTier::Fast);
    }
}
