//! Terminal rendering for the chat session and one-shot commands.

use std::io::Write;

use grokdoc_core::{AttachmentPurpose, EscalationReason, Facility, Plan};
use grokdoc_maps::{LocationSource, UserLocation};

pub(crate) fn prompt() {
    print!("you> ");
    let _ = std::io::stdout().flush();
}

pub(crate) fn assistant(text: &str) {
    println!("\nGrokDoc: {}\n", text.trim());
}

pub(crate) fn notice(text: &str) {
    println!("[!] {}", text);
}

pub(crate) fn help() {
    println!(
        "\
Type your message and press enter. Commands:
  /severity <1-10>             rate how severe your symptoms are
  /attach <photo|labs|emr> <uri>  attach an image or document to your next message
  /plan                        ask for a 7-day care plan
  /done <task-id>              tick a plan task on or off
  /yes, /no                    answer an urgent-care offer
  /quit                        leave the chat"
    );
}

pub(crate) fn severity_scale() {
    println!("How severe is it? 1 = mild, 10 = worst imaginable.");
    println!("Reply with /severity <1-10>.");
}

pub(crate) fn upload_hint(purpose: AttachmentPurpose) {
    let (what, kind) = match purpose {
        AttachmentPurpose::Photo => ("a photo", "photo"),
        AttachmentPurpose::Labs => ("your lab results", "labs"),
        AttachmentPurpose::Emr => ("your medical records", "emr"),
    };
    println!("You can share {} with /attach {} <path-or-url>.", what, kind);
}

/// "a", "a and b", "a, b and c".
fn join_natural(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [only] => (*only).to_string(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

pub(crate) fn escalation_offer(reasons: &[EscalationReason]) {
    let described: Vec<&str> = reasons.iter().map(|reason| reason.describe()).collect();
    if !described.is_empty() {
        notice(&format!(
            "You mentioned {}. This may need urgent care.",
            join_natural(&described)
        ));
    }
    println!("Would you like me to find urgent care near you? (/yes or /no)");
}

pub(crate) fn plan_offer() {
    println!("I have enough information to put together a 7-day plan. Type /plan when you're ready.");
}

pub(crate) fn print_plan(plan: &Plan) {
    if plan.is_empty() {
        println!("I couldn't turn that into a plan. Try /plan again in a moment.");
        return;
    }

    let progress = plan.progress();
    println!(
        "\nYour 7-day plan ({}/{} done, {}%)",
        progress.done,
        progress.total,
        progress.percent()
    );
    for day in plan.day_summaries() {
        if day.total == 0 {
            continue;
        }
        println!("{} ({}/{})", day.label, day.done, day.total);
        for task in plan.tasks_for_day(day.day_offset) {
            let mark = if task.done { "x" } else { " " };
            println!("  [{}] {:>2}. {}", mark, task.id, task.text);
        }
    }
    println!("Tick tasks off with /done <task-id>.\n");
}

pub(crate) fn print_facilities(location: &UserLocation, found: &[Facility]) {
    let source = match location.source {
        LocationSource::Precise => "your coordinates",
        LocationSource::IpEstimate => "an estimate from your IP address",
    };
    println!(
        "Searching near {:.4}, {:.4} (from {})",
        location.position.lat(),
        location.position.lng(),
        source
    );

    if found.is_empty() {
        println!("No urgent-care facilities found nearby.");
        return;
    }

    for (index, facility) in found.iter().enumerate() {
        println!(
            "{}. {} ({:.1} km)",
            index + 1,
            facility.record.name,
            facility.distance_km
        );
        if let Some(address) = &facility.record.address {
            println!("   {}", address);
        }
        println!("   Directions: {}", facility.directions_url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_reasons_naturally() {
        assert_eq!(join_natural(&[]), "");
        assert_eq!(join_natural(&["chest pain"]), "chest pain");
        assert_eq!(
            join_natural(&["chest pain", "a head injury", "severe pain"]),
            "chest pain, a head injury and severe pain"
        );
    }
}
