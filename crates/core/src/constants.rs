//! Constants used throughout the GrokDoc core crate.

/// First assistant turn of every new session.
pub const GREETING: &str =
    "Hey, I'm GrokDoc, your AI doctor. How can I help? What are your symptoms?";

/// Shown in place of an assistant reply when the upstream model fails.
pub const FALLBACK_MESSAGE: &str =
    "Sorry, I'm having trouble understanding right now. Please try again in a moment.";

/// Shown when plan generation fails upstream.
pub const PLAN_FALLBACK_MESSAGE: &str =
    "Sorry, I couldn't put your plan together right now. Please try again in a moment.";

/// Severity at or above which a session is considered urgent.
pub const URGENT_SEVERITY_THRESHOLD: u8 = 7;

/// Number of critical triage fields that must be filled before a plan is offered.
pub const CRITICAL_FIELD_COUNT: usize = 4;

/// Days covered by a care plan.
pub const PLAN_DAYS: u8 = 7;

/// Tasks kept per plan day; extras are dropped.
pub const MAX_TASKS_PER_DAY: usize = 4;

/// Default token ceiling for model completions.
pub const DEFAULT_MAX_TOKENS: u32 = 2000;

/// Default nearby-search radius in metres.
pub const DEFAULT_SEARCH_RADIUS_M: u32 = 5000;

/// Default per-locator timeout in milliseconds.
pub const DEFAULT_GEO_TIMEOUT_MS: u64 = 5000;

/// Default REST bind address.
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:3000";

/// Default advanced (reasoning) model.
pub const DEFAULT_ADVANCED_MODEL: &str = "o1-preview";

/// Default directory for locally persisted session state.
pub const DEFAULT_DATA_DIR: &str = ".grokdoc";

/// Filename of the persisted escalation handoff blob.
pub const CONTEXT_FILENAME: &str = "context.json";

/// Where a user lands when they come back from the facility finder.
pub const CHAT_RETURN_PATH: &str = "/symptom-checker";
