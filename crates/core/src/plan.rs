//! Seven-day care plans.
//!
//! The advanced model is asked for a `Day N:` header followed by bullet lines for each day. The
//! reply is parsed leniently: anything that does not fit the template is skipped, so a deviating
//! reply produces fewer tasks rather than an error.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::constants::{MAX_TASKS_PER_DAY, PLAN_DAYS};
use crate::conversation::ConversationTurn;
use crate::triage::{TriageField, TriageState};

static DAY_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:[-*•#>]+\s*)?(?:\*\*|__)?\s*day\s+(\d{1,2})\b").unwrap()
});

static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[-*•+]|\d{1,2}[.)])\s+(.+?)\s*$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PlanTask {
    pub id: u32,
    pub text: String,
    /// Zero-based day, `0..PLAN_DAYS`.
    pub day_offset: u8,
    pub done: bool,
}

/// Input to plan generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    #[serde(default)]
    pub triage_state: TriageState,
    #[serde(default)]
    pub conversation_history: Vec<ConversationTurn>,
    #[serde(default)]
    pub symptoms: String,
}

/// Whether the triage state is complete enough to plan from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanGate {
    Ready,
    NeedsMoreInfo {
        missing: Vec<TriageField>,
        prompt: String,
    },
}

pub fn check_gate(state: &TriageState) -> PlanGate {
    let missing = state.missing_critical();
    if missing.is_empty() {
        PlanGate::Ready
    } else {
        let prompt = clarifying_prompt(&missing);
        PlanGate::NeedsMoreInfo { missing, prompt }
    }
}

/// A question naming every missing field.
pub fn clarifying_prompt(missing: &[TriageField]) -> String {
    let labels: Vec<&str> = missing.iter().map(|field| field.label()).collect();
    let listed = match labels.as_slice() {
        [] => return "I have everything I need to put your plan together.".to_string(),
        [only] => (*only).to_string(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    };
    format!("Before I can put together your plan, could you tell me {listed}?")
}

fn clean_task_text(text: &str) -> String {
    text.replace("**", "")
        .replace("__", "")
        .trim()
        .trim_end_matches(['.', ';'])
        .trim()
        .to_string()
}

/// Parse a model reply into tasks.
///
/// Bullets before the first valid header, under a day outside `1..=7`, or beyond the per-day cap
/// are dropped. Ids are assigned sequentially from 1 in reading order.
pub fn parse_plan(text: &str) -> Vec<PlanTask> {
    let mut tasks: Vec<PlanTask> = Vec::new();
    let mut per_day = [0usize; PLAN_DAYS as usize];
    let mut current_day: Option<u8> = None;

    for line in text.lines() {
        if let Some(captures) = DAY_HEADER.captures(line) {
            current_day = captures
                .get(1)
                .and_then(|m| m.as_str().parse::<u8>().ok())
                .filter(|day| (1..=PLAN_DAYS).contains(day))
                .map(|day| day - 1);
            continue;
        }

        let Some(day) = current_day else {
            continue;
        };
        let Some(captures) = BULLET.captures(line) else {
            continue;
        };

        let text = captures
            .get(1)
            .map(|m| clean_task_text(m.as_str()))
            .unwrap_or_default();
        if text.is_empty() || per_day[usize::from(day)] >= MAX_TASKS_PER_DAY {
            continue;
        }

        per_day[usize::from(day)] += 1;
        tasks.push(PlanTask {
            id: tasks.len() as u32 + 1,
            text,
            day_offset: day,
            done: false,
        });
    }

    tasks
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct PlanProgress {
    pub done: usize,
    pub total: usize,
}

impl PlanProgress {
    /// Whole-number percentage, 0 for an empty plan.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            0
        } else {
            ((self.done * 100) / self.total) as u8
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct DaySummary {
    pub day_offset: u8,
    pub label: String,
    pub total: usize,
    pub done: usize,
}

/// A generated plan. Tasks are fixed at creation; only `done` changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Plan {
    tasks: Vec<PlanTask>,
}

impl Plan {
    pub fn new(tasks: Vec<PlanTask>) -> Self {
        Self { tasks }
    }

    pub fn tasks(&self) -> &[PlanTask] {
        &self.tasks
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Flip a task's `done` flag, returning the new value.
    pub fn toggle(&mut self, task_id: u32) -> Option<bool> {
        let task = self.tasks.iter_mut().find(|task| task.id == task_id)?;
        task.done = !task.done;
        Some(task.done)
    }

    pub fn tasks_for_day(&self, day_offset: u8) -> impl Iterator<Item = &PlanTask> {
        self.tasks
            .iter()
            .filter(move |task| task.day_offset == day_offset)
    }

    pub fn progress(&self) -> PlanProgress {
        PlanProgress {
            done: self.tasks.iter().filter(|task| task.done).count(),
            total: self.tasks.len(),
        }
    }

    /// One entry per plan day, including days with no tasks.
    pub fn day_summaries(&self) -> Vec<DaySummary> {
        (0..PLAN_DAYS)
            .map(|day_offset| {
                let (total, done) = self
                    .tasks_for_day(day_offset)
                    .fold((0, 0), |(total, done), task| {
                        (total + 1, done + usize::from(task.done))
                    });
                DaySummary {
                    day_offset,
                    label: format!("Day {}", day_offset + 1),
                    total,
                    done,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grokdoc_types::Severity;

    const REPLY: &str = "\
Here is your plan:

Day 1:
- Rest and drink plenty of fluids
- Take your temperature morning and evening
Day 2:
- **Gargle warm salt water** three times
- Short walk if you feel up to it.
- Honey and lemon tea before bed
- Keep a symptom diary
- Call a doctor if the fever climbs
**Day 3:**
1. Steam inhalation
2) Light meals

Day 9:
- This day does not exist
";

    #[test]
    fn parses_days_and_bullets() {
        let tasks = parse_plan(REPLY);

        assert_eq!(tasks.len(), 8);
        assert_eq!(tasks[0].text, "Rest and drink plenty of fluids");
        assert_eq!(tasks[0].day_offset, 0);
        assert_eq!(tasks[2].text, "Gargle warm salt water three times");
        assert_eq!(tasks[3].text, "Short walk if you feel up to it");
        assert_eq!(tasks[6].day_offset, 2);
        assert!(tasks.iter().all(|task| !task.done));
    }

    #[test]
    fn each_day_is_capped_at_four_tasks() {
        let tasks = parse_plan(REPLY);
        let day_two: Vec<_> = tasks.iter().filter(|task| task.day_offset == 1).collect();
        assert_eq!(day_two.len(), MAX_TASKS_PER_DAY);
        assert!(!day_two.iter().any(|task| task.text.contains("Call a doctor")));
    }

    #[test]
    fn ids_are_sequential_from_one() {
        let ids: Vec<u32> = parse_plan(REPLY).iter().map(|task| task.id).collect();
        assert_eq!(ids, (1..=8).collect::<Vec<_>>());
    }

    #[test]
    fn off_template_text_yields_no_tasks() {
        assert!(parse_plan("I'm sorry, I can't help with that.").is_empty());
        assert!(parse_plan("- a bullet with no day header").is_empty());
    }

    #[test]
    fn gate_names_missing_critical_fields() {
        let mut state = TriageState::new();
        state.record(TriageField::Onset, "yesterday");

        match check_gate(&state) {
            PlanGate::NeedsMoreInfo { missing, prompt } => {
                assert_eq!(
                    missing,
                    vec![
                        TriageField::Severity,
                        TriageField::MedicalHistory,
                        TriageField::Meds
                    ]
                );
                assert!(prompt.contains("how severe it is"));
                assert!(prompt.contains("your medical history and any medications you take"));
            }
            PlanGate::Ready => panic!("gate should not be open"),
        }

        state.set_severity(Severity::new(4).unwrap());
        state.record(TriageField::MedicalHistory, "none");
        state.record(TriageField::Meds, "none");
        assert_eq!(check_gate(&state), PlanGate::Ready);
    }

    #[test]
    fn toggle_and_progress() {
        let mut plan = Plan::new(parse_plan(REPLY));

        assert_eq!(plan.toggle(1), Some(true));
        assert_eq!(plan.toggle(3), Some(true));
        assert_eq!(plan.toggle(3), Some(false));
        assert_eq!(plan.toggle(99), None);

        let progress = plan.progress();
        assert_eq!((progress.done, progress.total), (1, 8));
        assert_eq!(progress.percent(), 12);
        assert_eq!(plan.tasks_for_day(0).count(), 2);
    }

    #[test]
    fn day_summaries_cover_the_whole_week() {
        let mut plan = Plan::new(parse_plan(REPLY));
        plan.toggle(1);

        let summaries = plan.day_summaries();
        assert_eq!(summaries.len(), 7);
        assert_eq!(summaries[0].label, "Day 1");
        assert_eq!((summaries[0].total, summaries[0].done), (2, 1));
        assert_eq!(summaries[6].total, 0);
    }
}
