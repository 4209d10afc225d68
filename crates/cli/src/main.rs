use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use grokdoc_core::{
    escalation, extract, AppConfig, ContextStore, FacilityService, InsightsService, PlanOutcome,
    PlanService, QuestionContext, Session, TriageState,
};
use grokdoc_maps::{FixedLocator, IpLocator, LocationResolver};

mod display;
mod repl;

#[derive(Parser)]
#[command(name = "grokdoc")]
#[command(about = "GrokDoc AI triage assistant")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive triage chat
    Chat {
        /// Latitude for the facility finder (skips IP lookup)
        #[arg(long, requires = "lng", allow_hyphen_values = true)]
        lat: Option<f64>,
        /// Longitude for the facility finder
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lng: Option<f64>,
    },
    /// Extract triage fields from one message and print them as JSON
    Triage {
        /// The user's message
        text: String,
        /// The assistant question the message answers
        #[arg(long)]
        after: Option<String>,
    },
    /// Generate a 7-day plan from a saved session
    Plan {
        /// Session file (defaults to the one in the data directory)
        #[arg(long)]
        context: Option<PathBuf>,
    },
    /// List urgent-care facilities nearby
    Facilities {
        #[arg(long, requires = "lng", allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lng: Option<f64>,
        /// Search radius in metres
        #[arg(long)]
        radius: Option<u32>,
    },
    /// Summarise health metrics
    Insights {
        /// Metrics in free text, e.g. "slept 5h, 3000 steps, resting HR 80"
        text: String,
    },
}

/// Locator chain: explicit coordinates first when given, then an IP estimate.
pub(crate) fn location_resolver(
    config: &AppConfig,
    coordinates: Option<(f64, f64)>,
) -> anyhow::Result<LocationResolver> {
    let mut resolver = LocationResolver::new(config.geo_timeout());
    if let Some((lat, lng)) = coordinates {
        resolver = resolver.then(FixedLocator::precise(lat, lng, None)?);
    }
    Ok(resolver.then(IpLocator::default()))
}

fn coordinates(lat: Option<f64>, lng: Option<f64>) -> Option<(f64, f64)> {
    lat.zip(lng)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("grokdoc=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    match cli.command {
        Some(Commands::Chat { lat, lng }) => {
            repl::run(&config, coordinates(lat, lng)).await?;
        }
        Some(Commands::Triage { text, after }) => {
            let context = QuestionContext {
                preceding_assistant: after.as_deref(),
                previous_target: None,
            };
            let extraction = extract::update(&TriageState::new(), &text, context);
            let check = escalation::check(&text, &extraction.state);
            let report = serde_json::json!({
                "triageState": extraction.state,
                "target": extraction.target,
                "candidates": extraction.candidates,
                "confidence": extraction.confidence,
                "updated": extraction.updated,
                "criticalCount": extraction.state.critical_count(),
                "missingCritical": extraction.state.missing_critical(),
                "urgent": check.urgent,
                "escalationReasons": check.reasons,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Some(Commands::Plan { context }) => {
            let store = match context {
                Some(path) => ContextStore::at(path),
                None => ContextStore::new(config.data_dir()),
            };
            let Some(saved) = store.load()? else {
                anyhow::bail!(
                    "No saved session at {}. Run `grokdoc chat` first.",
                    store.path().display()
                );
            };
            let request = Session::from_context(saved).plan_request();

            let plans = PlanService::from_config(&config)?;
            match plans.generate(&request).await? {
                PlanOutcome::Ready(tasks) => {
                    display::print_plan(&grokdoc_core::Plan::new(tasks));
                }
                PlanOutcome::NeedsMoreInfo { prompt, .. } => println!("{}", prompt),
            }
        }
        Some(Commands::Facilities { lat, lng, radius }) => {
            let facilities = FacilityService::from_config(&config)?;
            let location = location_resolver(&config, coordinates(lat, lng))?
                .resolve()
                .await?;
            let found = facilities.locate(location.position, radius).await?;
            display::print_facilities(&location, &found);
        }
        Some(Commands::Insights { text }) => {
            let insights = InsightsService::from_config(&config)?;
            match insights.insights(&text).await {
                Ok(summary) => println!("{}", summary),
                Err(e) => eprintln!("Error generating insights: {}", e),
            }
        }
        None => {
            println!("Use --help to see available commands.");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn negative_coordinates_parse() {
        let cli = Cli::parse_from(["grokdoc", "facilities", "--lat", "37.7", "--lng", "-122.4"]);
        match cli.command {
            Some(Commands::Facilities { lat, lng, radius }) => {
                assert_eq!(coordinates(lat, lng), Some((37.7, -122.4)));
                assert_eq!(radius, None);
            }
            _ => panic!("expected facilities"),
        }
    }

    #[test]
    fn lat_without_lng_is_rejected() {
        assert!(Cli::try_parse_from(["grokdoc", "chat", "--lat", "37.7"]).is_err());
    }
}
