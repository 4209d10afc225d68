//! The handoff blob.
//!
//! Before the user leaves the chat for the facility finder (or a plan run in another process),
//! the triage state and transcript are written to one JSON file so the session can be picked up
//! again. There is exactly one blob per data directory and no schema versioning.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::CONTEXT_FILENAME;
use crate::conversation::ConversationTurn;
use crate::triage::TriageState;
use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    pub triage_state: TriageState,
    pub conversation: Vec<ConversationTurn>,
    pub return_path: String,
}

/// File-backed storage for a single [`SessionContext`].
#[derive(Debug, Clone)]
pub struct ContextStore {
    path: PathBuf,
}

impl ContextStore {
    /// Store inside `data_dir`, which is created on first save.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(CONTEXT_FILENAME),
        }
    }

    /// Store at an explicit file path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, context: &SessionContext) -> CoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(CoreError::DataDirCreation)?;
        }
        let json = serde_json::to_string_pretty(context).map_err(CoreError::Serialization)?;
        fs::write(&self.path, json).map_err(CoreError::FileWrite)?;
        tracing::info!("session context saved to {}", self.path.display());
        Ok(())
    }

    /// The saved context, or `None` if nothing has been saved.
    pub fn load(&self) -> CoreResult<Option<SessionContext>> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CoreError::FileRead(e)),
        };
        let context = serde_json::from_str(&json).map_err(CoreError::Deserialization)?;
        Ok(Some(context))
    }

    pub fn clear(&self) -> CoreResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CoreError::FileRemove(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::CHAT_RETURN_PATH;
    use crate::conversation::{Attachment, AttachmentPurpose};
    use crate::triage::TriageField;
    use grokdoc_types::Severity;
    use tempfile::TempDir;

    fn sample_context() -> SessionContext {
        let mut triage_state = TriageState::new();
        triage_state.record(TriageField::Onset, "for 3 days");
        triage_state.record(TriageField::Meds, "none");
        triage_state.set_severity(Severity::new(8).unwrap());

        SessionContext {
            triage_state,
            conversation: vec![
                ConversationTurn::assistant("What are your symptoms?"),
                ConversationTurn::user_with_attachments(
                    "bad headache",
                    vec![Attachment {
                        uri: "data:image/png;base64,AA".into(),
                        purpose: AttachmentPurpose::Emr,
                    }],
                ),
            ],
            return_path: CHAT_RETURN_PATH.into(),
        }
    }

    #[test]
    fn save_then_load_reproduces_the_context() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = ContextStore::new(temp_dir.path().join("nested"));
        let context = sample_context();

        store.save(&context).expect("save should succeed");
        let loaded = store.load().expect("load should succeed");

        assert_eq!(loaded, Some(context));
    }

    #[test]
    fn missing_file_loads_as_none() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = ContextStore::new(temp_dir.path());
        assert_eq!(store.load().expect("load should succeed"), None);
    }

    #[test]
    fn blob_uses_camel_case_keys() {
        let json = serde_json::to_value(sample_context()).unwrap();
        assert!(json.get("triageState").is_some());
        assert_eq!(json["returnPath"], "/symptom-checker");
        assert_eq!(json["conversation"][1]["content"][1]["type"], "image");
    }

    #[test]
    fn clear_is_idempotent() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = ContextStore::new(temp_dir.path());
        store.save(&sample_context()).unwrap();

        store.clear().unwrap();
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn corrupt_blob_is_an_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = ContextStore::new(temp_dir.path());
        fs::write(store.path(), "{not json").unwrap();
        assert!(matches!(store.load(), Err(CoreError::Deserialization(_))));
    }
}
