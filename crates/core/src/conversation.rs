//! The chat transcript.
//!
//! A [`Conversation`] is an append-only list of [`ConversationTurn`]s. Turn content is either a
//! plain string or a list of typed chunks, so that uploaded photos, lab results and medical
//! records can ride along with the user's text.

use grokdoc_llm::{ChatMessage, ChatRole, MessagePart};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Why an image was attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum AttachmentPurpose {
    /// A photo of the affected area.
    Photo,
    /// Laboratory results.
    Labs,
    /// An electronic medical record extract.
    Emr,
}

impl AttachmentPurpose {
    /// Documents need the reasoning model to read properly.
    pub fn is_document(self) -> bool {
        matches!(self, AttachmentPurpose::Labs | AttachmentPurpose::Emr)
    }
}

impl std::str::FromStr for AttachmentPurpose {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "photo" => Ok(AttachmentPurpose::Photo),
            "labs" | "lab" => Ok(AttachmentPurpose::Labs),
            "emr" | "record" | "records" => Ok(AttachmentPurpose::Emr),
            other => Err(format!(
                "unknown attachment kind '{other}' (expected photo, labs or emr)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct Attachment {
    /// Image URL or `data:` URI.
    pub uri: String,
    pub purpose: AttachmentPurpose,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentChunk {
    Text {
        text: String,
    },
    Image {
        uri: String,
        purpose: AttachmentPurpose,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(untagged)]
pub enum TurnContent {
    Text(String),
    Chunks(Vec<ContentChunk>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct ConversationTurn {
    pub role: Role,
    pub content: TurnContent,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: TurnContent::Text(text.into()),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: TurnContent::Text(text.into()),
        }
    }

    /// A user turn carrying uploads. Falls back to plain text when there are none.
    pub fn user_with_attachments(text: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        let text = text.into();
        if attachments.is_empty() {
            return Self::user(text);
        }

        let mut chunks = Vec::with_capacity(attachments.len() + 1);
        if !text.trim().is_empty() {
            chunks.push(ContentChunk::Text { text });
        }
        chunks.extend(attachments.into_iter().map(|a| ContentChunk::Image {
            uri: a.uri,
            purpose: a.purpose,
        }));

        Self {
            role: Role::User,
            content: TurnContent::Chunks(chunks),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    /// Text content with image chunks skipped.
    pub fn text(&self) -> String {
        match &self.content {
            TurnContent::Text(text) => text.clone(),
            TurnContent::Chunks(chunks) => chunks
                .iter()
                .filter_map(|chunk| match chunk {
                    ContentChunk::Text { text } => Some(text.as_str()),
                    ContentChunk::Image { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    pub fn attachment_purposes(&self) -> Vec<AttachmentPurpose> {
        match &self.content {
            TurnContent::Text(_) => Vec::new(),
            TurnContent::Chunks(chunks) => chunks
                .iter()
                .filter_map(|chunk| match chunk {
                    ContentChunk::Image { purpose, .. } => Some(*purpose),
                    ContentChunk::Text { .. } => None,
                })
                .collect(),
        }
    }

    pub fn is_blank(&self) -> bool {
        match &self.content {
            TurnContent::Text(text) => text.trim().is_empty(),
            TurnContent::Chunks(chunks) => chunks.iter().all(|chunk| match chunk {
                ContentChunk::Text { text } => text.trim().is_empty(),
                ContentChunk::Image { uri, .. } => uri.trim().is_empty(),
            }),
        }
    }

    pub fn to_chat_message(&self) -> ChatMessage {
        let role = match self.role {
            Role::User => ChatRole::User,
            Role::Assistant => ChatRole::Assistant,
        };
        let parts = match &self.content {
            TurnContent::Text(text) => vec![MessagePart::Text { text: text.clone() }],
            TurnContent::Chunks(chunks) => chunks
                .iter()
                .map(|chunk| match chunk {
                    ContentChunk::Text { text } => MessagePart::Text { text: text.clone() },
                    ContentChunk::Image { uri, .. } => MessagePart::Image { url: uri.clone() },
                })
                .collect(),
        };
        ChatMessage { role, parts }
    }
}

/// Append-only transcript.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_turns(turns: Vec<ConversationTurn>) -> Self {
        Self { turns }
    }

    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last_assistant(&self) -> Option<&ConversationTurn> {
        self.turns.iter().rev().find(|turn| !turn.is_user())
    }

    pub fn first_user(&self) -> Option<&ConversationTurn> {
        self.turns.iter().find(|turn| turn.is_user())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_and_chunked_content_share_one_shape() {
        let turns: Vec<ConversationTurn> = serde_json::from_str(
            r#"[
                {"role": "assistant", "content": "What are your symptoms?"},
                {"role": "user", "content": [
                    {"type": "text", "text": "here are my labs"},
                    {"type": "image", "uri": "data:image/png;base64,AA", "purpose": "labs"}
                ]}
            ]"#,
        )
        .unwrap();

        assert_eq!(turns[0].text(), "What are your symptoms?");
        assert_eq!(turns[1].text(), "here are my labs");
        assert_eq!(turns[1].attachment_purposes(), vec![AttachmentPurpose::Labs]);
    }

    #[test]
    fn attachments_become_image_parts() {
        let turn = ConversationTurn::user_with_attachments(
            "rash on my arm",
            vec![Attachment {
                uri: "https://img.example/rash.jpg".into(),
                purpose: AttachmentPurpose::Photo,
            }],
        );

        let message = turn.to_chat_message();
        assert_eq!(message.role, ChatRole::User);
        assert!(message.has_images());
        assert_eq!(message.text_content(), "rash on my arm");
    }

    #[test]
    fn no_attachments_means_plain_text() {
        let turn = ConversationTurn::user_with_attachments("just text", Vec::new());
        assert_eq!(turn.content, TurnContent::Text("just text".into()));
    }

    #[test]
    fn blank_turns_are_detected() {
        assert!(ConversationTurn::user("   ").is_blank());
        assert!(!ConversationTurn::user("cough").is_blank());
    }
}
