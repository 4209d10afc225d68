//! Interactive chat: reads lines, drives the session reducer and carries out its effects.

use std::collections::VecDeque;

use tokio::io::{AsyncBufReadExt, BufReader};

use grokdoc_core::constants::FALLBACK_MESSAGE;
use grokdoc_core::{
    Action, AppConfig, Attachment, AttachmentPurpose, ChatService, ContextStore, CoreResult,
    Effect, FacilityService, Phase, PlanOutcome, PlanService, Session, Severity,
};

use crate::display;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    Say(String),
    Severity(Severity),
    Attach(Attachment),
    Plan,
    Done(u32),
    Yes,
    No,
    Help,
    Quit,
}

/// Anything not starting with `/` is a message for the assistant.
pub(crate) fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Say(line.to_string()));
    };

    let mut parts = rest.split_whitespace();
    match parts.next().unwrap_or_default() {
        "severity" => {
            let value = parts.next().ok_or("usage: /severity <1-10>")?;
            let value: i64 = value
                .parse()
                .map_err(|_| format!("'{value}' is not a number between 1 and 10"))?;
            Severity::new(value)
                .map(Command::Severity)
                .map_err(|e| e.to_string())
        }
        "attach" => {
            let purpose: AttachmentPurpose = parts
                .next()
                .ok_or("usage: /attach <photo|labs|emr> <uri>")?
                .parse()?;
            let uri = parts.next().ok_or("usage: /attach <photo|labs|emr> <uri>")?;
            Ok(Command::Attach(Attachment {
                uri: uri.to_string(),
                purpose,
            }))
        }
        "plan" => Ok(Command::Plan),
        "done" => {
            let id = parts.next().ok_or("usage: /done <task-id>")?;
            id.parse()
                .map(Command::Done)
                .map_err(|_| format!("'{id}' is not a task id"))
        }
        "yes" => Ok(Command::Yes),
        "no" => Ok(Command::No),
        "help" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("unknown command /{other}, try /help")),
    }
}

/// A plan refusal for missing fields goes back to the conversation, not the failure path.
fn plan_action(outcome: CoreResult<PlanOutcome>) -> Action {
    match outcome {
        Ok(PlanOutcome::Ready(tasks)) => Action::PlanReceived(tasks),
        Ok(PlanOutcome::NeedsMoreInfo { missing, prompt }) => {
            Action::PlanNeedsMoreInfo { missing, prompt }
        }
        Err(e) => {
            tracing::error!("plan generation error: {:?}", e);
            Action::PlanFailed
        }
    }
}

struct Repl<'a> {
    config: &'a AppConfig,
    coordinates: Option<(f64, f64)>,
    session: Session,
    chat: ChatService,
    plans: PlanService,
    store: ContextStore,
    pending: Vec<Attachment>,
}

pub(crate) async fn run(config: &AppConfig, coordinates: Option<(f64, f64)>) -> anyhow::Result<()> {
    let mut repl = Repl {
        config,
        coordinates,
        session: Session::new(),
        chat: ChatService::from_config(config)?,
        plans: PlanService::from_config(config)?,
        store: ContextStore::new(config.data_dir()),
        pending: Vec::new(),
    };

    if let Some(greeting) = repl.session.conversation().last_assistant() {
        display::assistant(&greeting.text());
    }
    println!("(type /help for commands)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        display::prompt();
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let action = match parse_command(&line) {
            Ok(Command::Quit) => break,
            Ok(Command::Help) => {
                display::help();
                continue;
            }
            Ok(Command::Attach(attachment)) => {
                println!(
                    "Attached {}. It will be sent with your next message.",
                    attachment.uri
                );
                repl.pending.push(attachment);
                continue;
            }
            Ok(Command::Say(text)) => Action::Send {
                text,
                attachments: std::mem::take(&mut repl.pending),
            },
            Ok(Command::Severity(severity)) => Action::SelectSeverity(severity),
            Ok(Command::Plan) => Action::RequestPlan,
            Ok(Command::Done(task_id)) => Action::ToggleTask(task_id),
            Ok(Command::Yes) => Action::AcceptEscalation,
            Ok(Command::No) => Action::DeclineEscalation,
            Err(message) => {
                eprintln!("{}", message);
                continue;
            }
        };

        let toggled = matches!(action, Action::ToggleTask(_));
        repl.dispatch(action).await;
        if toggled {
            match repl.session.plan() {
                Some(plan) => display::print_plan(plan),
                None => println!("No plan yet. Type /plan to create one."),
            }
        }
    }

    Ok(())
}

impl Repl<'_> {
    /// Run an action and every effect it causes, in order.
    async fn dispatch(&mut self, action: Action) {
        let mut queue: VecDeque<Effect> = self.session.reduce(action).into();
        while let Some(effect) = queue.pop_front() {
            queue.extend(self.execute(effect).await);
        }
    }

    async fn execute(&mut self, effect: Effect) -> Vec<Effect> {
        match effect {
            Effect::CallChat { conversation } => {
                let action = match self.chat.reply(&conversation).await {
                    Ok(reply) if !reply.fallback => {
                        display::assistant(&reply.text);
                        Action::AssistantReplied { text: reply.text }
                    }
                    Ok(_) => {
                        display::assistant(FALLBACK_MESSAGE);
                        Action::AssistantFailed
                    }
                    Err(e) => {
                        tracing::error!("chat error: {:?}", e);
                        display::assistant(FALLBACK_MESSAGE);
                        Action::AssistantFailed
                    }
                };
                self.session.reduce(action)
            }
            Effect::ShowSeverityScale => {
                display::severity_scale();
                Vec::new()
            }
            Effect::SuggestUpload(purpose) => {
                display::upload_hint(purpose);
                Vec::new()
            }
            Effect::OfferEscalation { reasons } => {
                display::escalation_offer(&reasons);
                Vec::new()
            }
            Effect::OfferPlan => {
                display::plan_offer();
                Vec::new()
            }
            Effect::GeneratePlan(request) => {
                println!("Putting your plan together...");
                let action = plan_action(self.plans.generate(&request).await);
                let follow_up = self.session.reduce(action);
                if self.session.phase() == Phase::PlanReady {
                    if let Some(plan) = self.session.plan() {
                        display::print_plan(plan);
                    }
                }
                follow_up
            }
            Effect::Clarify { prompt, .. } => {
                display::assistant(&prompt);
                Vec::new()
            }
            Effect::HandoffToFacilities(context) => {
                match self.store.save(&context) {
                    Ok(()) => println!(
                        "Saved this conversation to {} so you can pick it up later.",
                        self.store.path().display()
                    ),
                    Err(e) => eprintln!("Could not save this conversation: {}", e),
                }
                if let Err(e) = self.find_facilities().await {
                    eprintln!("Could not look up facilities: {}", e);
                    display::notice("If this is an emergency, call your local emergency number.");
                }
                Vec::new()
            }
            Effect::Notice(message) => {
                display::notice(&message);
                Vec::new()
            }
        }
    }

    async fn find_facilities(&self) -> anyhow::Result<()> {
        let facilities = FacilityService::from_config(self.config)?;
        let location = crate::location_resolver(self.config, self.coordinates)?
            .resolve()
            .await?;
        let found = facilities.locate(location.position, None).await?;
        display::print_facilities(&location, &found);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grokdoc_core::TriageField;

    #[test]
    fn plain_lines_are_messages() {
        assert_eq!(
            parse_command("  I have a cough  "),
            Ok(Command::Say("I have a cough".into()))
        );
        assert_eq!(parse_command(""), Ok(Command::Say(String::new())));
    }

    #[test]
    fn severity_must_be_on_the_scale() {
        assert_eq!(
            parse_command("/severity 7"),
            Ok(Command::Severity(Severity::new(7).unwrap()))
        );
        assert!(parse_command("/severity 11").is_err());
        assert!(parse_command("/severity bad").is_err());
        assert!(parse_command("/severity").is_err());
    }

    #[test]
    fn attach_takes_a_kind_and_uri() {
        assert_eq!(
            parse_command("/attach labs https://example.org/cbc.png"),
            Ok(Command::Attach(Attachment {
                uri: "https://example.org/cbc.png".into(),
                purpose: AttachmentPurpose::Labs,
            }))
        );
        assert!(parse_command("/attach xray scan.png").is_err());
        assert!(parse_command("/attach photo").is_err());
    }

    #[test]
    fn simple_commands() {
        assert_eq!(parse_command("/plan"), Ok(Command::Plan));
        assert_eq!(parse_command("/done 3"), Ok(Command::Done(3)));
        assert_eq!(parse_command("/yes"), Ok(Command::Yes));
        assert_eq!(parse_command("/no"), Ok(Command::No));
        assert_eq!(parse_command("/exit"), Ok(Command::Quit));
        assert!(parse_command("/dance").is_err());
    }

    #[test]
    fn plan_refusal_clarifies_without_a_failure_notice() {
        let mut session = Session::new();
        session.reduce(Action::Send {
            text: "cough for 3 days, 4/10, no meds, no history".into(),
            attachments: Vec::new(),
        });
        session.reduce(Action::RequestPlan);

        let action = plan_action(Ok(PlanOutcome::NeedsMoreInfo {
            missing: vec![TriageField::Meds],
            prompt: "Could you tell me any medications you take?".into(),
        }));
        let effects = session.reduce(action);

        assert_ne!(session.phase(), Phase::PlanRequested);
        assert!(matches!(effects.first(), Some(Effect::Clarify { .. })));
        assert!(!effects.iter().any(|e| matches!(e, Effect::Notice(_))));
    }
}
