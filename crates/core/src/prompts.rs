//! Fixed instructions sent to the models.

use crate::conversation::ConversationTurn;
use crate::triage::TriageState;

/// Prepended to every chat request.
pub const SYSTEM_PROMPT: &str = "\
You are GrokDoc, a friendly AI doctor.
Keep responses under 100 words and conversational in style.
You are gathering standard triage info:
1) Onset
2) Severity (1-10)
3) Associated symptoms
4) Relevant medical history
5) Family history
6) Medications
7) Allergies
8) Lifestyle (diet, exercise, stress)
9) Tobacco/Alcohol use
10) Impact on daily activities

Politely ask for missing info if the user hasn't provided it, but let them lead the conversation.
When you ask about severity, ask the user to rate it on a scale of 1 to 10.";

const PLAN_INSTRUCTIONS: &str = "\
Write a simple 7-day care plan for me. Use exactly this format and nothing else:

Day 1:
- short actionable task
- short actionable task
Day 2:
- ...

Continue through Day 7. Give at most 4 tasks per day, each under 15 words.
Include when to seek medical care if things get worse.";

/// Prepended to health-insights requests.
pub const INSIGHTS_PROMPT: &str = "\
You are GrokDoc, a friendly AI doctor. The user will share health metrics such as sleep, \
steps, heart rate, weight or blood pressure. Summarise what stands out, point out anything \
worth discussing with a clinician, and suggest up to three practical next steps. \
Keep it under 150 words and avoid alarming language.";

/// The single user message that asks for a plan.
pub fn plan_prompt(
    triage: &TriageState,
    symptoms: &str,
    conversation_history: &[ConversationTurn],
) -> String {
    let symptoms = if symptoms.trim().is_empty() {
        "not described"
    } else {
        symptoms.trim()
    };

    let history = conversation_history
        .iter()
        .filter(|turn| turn.is_user())
        .map(|turn| turn.text())
        .filter(|text| !text.trim().is_empty())
        .map(|text| format!("- {}", text.trim()))
        .collect::<Vec<_>>();
    let history = if history.is_empty() {
        "- (none)".to_string()
    } else {
        history.join("\n")
    };

    format!(
        "Based on my symptoms ({symptoms}), what should I do? Keep it simple.\n\n\
         Here is my health info:\n{}\n\n\
         What I told you during our chat:\n{history}\n\n\
         {PLAN_INSTRUCTIONS}",
        triage.summary()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triage::TriageField;

    #[test]
    fn plan_prompt_embeds_triage_and_user_turns_only() {
        let mut triage = TriageState::new();
        triage.record(TriageField::Onset, "two days ago");

        let history = vec![
            ConversationTurn::assistant("What are your symptoms?"),
            ConversationTurn::user("sore throat and fever"),
        ];
        let prompt = plan_prompt(&triage, "sore throat", &history);

        assert!(prompt.starts_with("Based on my symptoms (sore throat)"));
        assert!(prompt.contains("Onset: two days ago"));
        assert!(prompt.contains("- sore throat and fever"));
        assert!(!prompt.contains("What are your symptoms?"));
        assert!(prompt.contains("Day 1:"));
    }

    #[test]
    fn system_prompt_lists_ten_triage_items() {
        assert!(SYSTEM_PROMPT.contains("1) Onset"));
        assert!(SYSTEM_PROMPT.contains("10) Impact on daily activities"));
        assert!(SYSTEM_PROMPT.contains("under 100 words"));
    }
}
