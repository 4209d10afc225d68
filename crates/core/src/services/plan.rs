use std::sync::Arc;

use grokdoc_llm::{ChatMessage, ChatModel, ChatRequest};

use super::model_from_spec;
use crate::config::AppConfig;
use crate::plan::{check_gate, parse_plan, PlanGate, PlanRequest, PlanTask};
use crate::prompts::plan_prompt;
use crate::triage::TriageField;
use crate::CoreResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanOutcome {
    Ready(Vec<PlanTask>),
    /// The critical fields are not all known; nothing was sent upstream.
    NeedsMoreInfo {
        missing: Vec<TriageField>,
        prompt: String,
    },
}

/// One-shot plan generation on the advanced model.
#[derive(Clone)]
pub struct PlanService {
    model: Arc<dyn ChatModel>,
    max_tokens: u32,
}

impl PlanService {
    pub fn new(model: Arc<dyn ChatModel>, max_tokens: u32) -> Self {
        Self { model, max_tokens }
    }

    pub fn from_config(config: &AppConfig) -> CoreResult<Self> {
        Ok(Self::new(
            model_from_spec(config, config.advanced())?,
            config.max_tokens(),
        ))
    }

    /// # Errors
    ///
    /// Returns `CoreError::Upstream` if the model call fails.
    pub async fn generate(&self, request: &PlanRequest) -> CoreResult<PlanOutcome> {
        if let PlanGate::NeedsMoreInfo { missing, prompt } = check_gate(&request.triage_state) {
            tracing::info!(?missing, "plan requested before triage is complete");
            return Ok(PlanOutcome::NeedsMoreInfo { missing, prompt });
        }

        let prompt = plan_prompt(
            &request.triage_state,
            &request.symptoms,
            &request.conversation_history,
        );
        let chat = ChatRequest::new(vec![ChatMessage::user(prompt)]).with_max_tokens(self.max_tokens);
        let reply = self.model.complete(chat).await?;

        let tasks = parse_plan(&reply);
        if tasks.is_empty() {
            tracing::warn!("plan reply did not follow the day template");
        } else {
            tracing::info!(tasks = tasks.len(), "plan generated");
        }
        Ok(PlanOutcome::Ready(tasks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triage::TriageState;
    use crate::CoreError;
    use grokdoc_llm::{LlmError, ScriptedChatModel};
    use grokdoc_types::Severity;

    fn complete_request() -> PlanRequest {
        let mut triage_state = TriageState::new();
        triage_state.record(TriageField::Onset, "3 days");
        triage_state.set_severity(Severity::new(5).unwrap());
        triage_state.record(TriageField::MedicalHistory, "none");
        triage_state.record(TriageField::Meds, "none");
        PlanRequest {
            triage_state,
            conversation_history: Vec::new(),
            symptoms: "cough".into(),
        }
    }

    #[tokio::test]
    async fn incomplete_triage_never_reaches_the_model() {
        let model = Arc::new(ScriptedChatModel::default());
        let service = PlanService::new(model.clone(), 2000);

        let outcome = service.generate(&PlanRequest::default()).await.unwrap();

        match outcome {
            PlanOutcome::NeedsMoreInfo { missing, .. } => assert_eq!(missing.len(), 4),
            PlanOutcome::Ready(_) => panic!("should not plan"),
        }
        assert_eq!(model.request_count(), 0);
    }

    #[tokio::test]
    async fn reply_is_parsed_into_tasks() {
        let model = Arc::new(ScriptedChatModel::default());
        model.enqueue_reply("Day 1:\n- Rest\n- Fluids\nDay 2:\n- Short walk");
        let service = PlanService::new(model.clone(), 2000);

        let outcome = service.generate(&complete_request()).await.unwrap();

        match outcome {
            PlanOutcome::Ready(tasks) => {
                assert_eq!(tasks.len(), 3);
                assert_eq!(tasks[2].day_offset, 1);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        let prompt = model.requests()[0].messages[0].text_content();
        assert!(prompt.contains("Based on my symptoms (cough)"));
    }

    #[tokio::test]
    async fn upstream_failure_is_an_error() {
        let model = Arc::new(ScriptedChatModel::default());
        model.enqueue_error(LlmError::Refusal("no".into()));
        let service = PlanService::new(model, 2000);

        let err = service
            .generate(&complete_request())
            .await
            .expect_err("should fail");
        assert!(matches!(err, CoreError::Upstream(_)));
    }
}
