//! # API REST
//!
//! REST API implementation for GrokDoc.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON rejection, status mapping, CORS)
//!
//! Uses `api-shared` for the wire types and `grokdoc-core` for everything else. The binary that
//! serves this router lives at the workspace root.

#![warn(rust_2018_idioms)]

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use api_shared::{
    ChatReq, ChatRes, ErrorRes, FacilitiesQuery, FacilitiesRes, FacilityDto, HealthRes,
    HealthService, InsightsReq, InsightsRes, PlanClarificationRes, PlanRes, TriageReq, TriageRes,
};
use grokdoc_core::constants::PLAN_FALLBACK_MESSAGE;
use grokdoc_core::{
    escalation, extract, AppConfig, ChatService, CoreError, CoreResult, FacilityService,
    InsightsService, LatLng, Plan, PlanOutcome, PlanRequest, PlanService, QuestionContext,
};

const INVALID_CONVERSATION: &str = "Invalid conversation array";
const INVALID_PLAN_REQUEST: &str = "Invalid plan request";
const MISSING_COORDINATES: &str = "Missing coordinates";
const FACILITIES_FAILED: &str = "Failed to fetch nearby facilities";
const INSIGHTS_FAILED: &str = "Failed to generate health insights. Please try again later.";

type ApiError = (StatusCode, Json<ErrorRes>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorRes::new(message)))
}

/// Application state for the REST API server
///
/// Every service is constructed once at startup and shared read-only between requests.
#[derive(Clone)]
pub struct AppState {
    pub health: HealthService,
    pub chat: Arc<ChatService>,
    pub plans: Arc<PlanService>,
    pub insights: Arc<InsightsService>,
    pub facilities: Arc<FacilityService>,
}

impl AppState {
    /// Build every service from resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidConfig` if a required API key is missing.
    pub fn from_config(config: &AppConfig) -> CoreResult<Self> {
        Ok(Self {
            health: HealthService::new(),
            chat: Arc::new(ChatService::from_config(config)?),
            plans: Arc::new(PlanService::from_config(config)?),
            insights: Arc::new(InsightsService::from_config(config)?),
            facilities: Arc::new(FacilityService::from_config(config)?),
        })
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(health, chat, plan, facilities, triage, insights),
    components(schemas(
        HealthRes,
        ErrorRes,
        ChatReq,
        ChatRes,
        PlanRequest,
        PlanRes,
        PlanClarificationRes,
        FacilitiesRes,
        FacilityDto,
        TriageReq,
        TriageRes,
        InsightsReq,
        InsightsRes,
    ))
)]
pub struct ApiDoc;

/// The full GrokDoc router: API routes, Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/chat", post(chat))
        .route("/plan", post(plan))
        .route("/facilities", get(facilities))
        .route("/triage", post(triage))
        .route("/insights", post(insights))
        .merge(
            SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Used for monitoring and load balancer health checks.
#[axum::debug_handler]
async fn health(State(state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/chat",
    request_body = ChatReq,
    responses(
        (status = 200, description = "Assistant reply, or the fallback apology on upstream failure", body = ChatRes),
        (status = 400, description = "Missing, malformed or empty conversation", body = ErrorRes)
    )
)]
/// Answer the latest turn of a triage conversation
///
/// Picks the fast or advanced model from the latest user turn and prepends the system
/// instruction. An upstream failure still answers 200, with `fallback: true`.
///
/// # Errors
/// Returns `400 Bad Request` if:
/// - the body is not `{conversation: [...]}`, or
/// - every turn is empty.
#[axum::debug_handler]
async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatReq>, JsonRejection>,
) -> Result<Json<ChatRes>, ApiError> {
    let Json(req) = payload.map_err(|e| {
        tracing::warn!("chat request rejected: {}", e.body_text());
        api_error(StatusCode::BAD_REQUEST, INVALID_CONVERSATION)
    })?;

    match state.chat.reply(&req.conversation).await {
        Ok(reply) => Ok(Json(reply.into())),
        Err(CoreError::InvalidInput(_)) => {
            Err(api_error(StatusCode::BAD_REQUEST, INVALID_CONVERSATION))
        }
        Err(e) => {
            tracing::error!("chat error: {:?}", e);
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
            ))
        }
    }
}

#[utoipa::path(
    post,
    path = "/plan",
    request_body = PlanRequest,
    responses(
        (status = 200, description = "Seven-day plan", body = PlanRes),
        (status = 400, description = "Malformed request", body = ErrorRes),
        (status = 422, description = "Critical triage fields are missing", body = PlanClarificationRes),
        (status = 502, description = "Plan generation failed upstream", body = ErrorRes)
    )
)]
/// Generate a seven-day care plan
///
/// Nothing is sent upstream until onset, severity, medical history and medications are known;
/// until then the reply is a clarifying prompt.
///
/// # Errors
/// Returns `400 Bad Request` for a malformed body and `502 Bad Gateway` if the model call fails.
#[axum::debug_handler]
async fn plan(
    State(state): State<AppState>,
    payload: Result<Json<PlanRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = payload.map_err(|e| {
        tracing::warn!("plan request rejected: {}", e.body_text());
        api_error(StatusCode::BAD_REQUEST, INVALID_PLAN_REQUEST)
    })?;

    match state.plans.generate(&req).await {
        Ok(PlanOutcome::Ready(tasks)) => {
            let plan = Plan::new(tasks);
            let res = PlanRes {
                progress: plan.progress(),
                days: plan.day_summaries(),
                tasks: plan.tasks().to_vec(),
            };
            Ok(Json(res).into_response())
        }
        Ok(PlanOutcome::NeedsMoreInfo { missing, prompt }) => Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(PlanClarificationRes { prompt, missing }),
        )
            .into_response()),
        Err(e) => {
            tracing::error!("plan generation error: {:?}", e);
            Err(api_error(StatusCode::BAD_GATEWAY, PLAN_FALLBACK_MESSAGE))
        }
    }
}

#[utoipa::path(
    get,
    path = "/facilities",
    params(FacilitiesQuery),
    responses(
        (status = 200, description = "Nearby urgent-care facilities in provider order", body = FacilitiesRes),
        (status = 400, description = "Missing or invalid coordinates", body = ErrorRes),
        (status = 502, description = "Places provider failed", body = ErrorRes)
    )
)]
/// Find urgent-care facilities near a point
#[axum::debug_handler]
async fn facilities(
    State(state): State<AppState>,
    query: Result<Query<FacilitiesQuery>, QueryRejection>,
) -> Result<Json<FacilitiesRes>, ApiError> {
    let Query(query) = query.map_err(|e| {
        tracing::warn!("facilities query rejected: {}", e.body_text());
        api_error(StatusCode::BAD_REQUEST, "Invalid coordinates")
    })?;

    let (Some(lat), Some(lng)) = (query.lat, query.lng) else {
        return Err(api_error(StatusCode::BAD_REQUEST, MISSING_COORDINATES));
    };
    let origin = LatLng::new(lat, lng)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    let found = state
        .facilities
        .locate(origin, query.radius)
        .await
        .map_err(|e| {
            tracing::error!("facility search error: {:?}", e);
            api_error(StatusCode::BAD_GATEWAY, FACILITIES_FAILED)
        })?;

    Ok(Json(FacilitiesRes {
        results: found.into_iter().map(FacilityDto::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/triage",
    request_body = TriageReq,
    responses(
        (status = 200, description = "Updated triage state and escalation check", body = TriageRes),
        (status = 400, description = "Malformed request", body = ErrorRes)
    )
)]
/// Run heuristic field extraction for one user message
///
/// Stateless: the caller sends the current triage state and the question that was asked, and
/// receives the merged state plus the escalation check for the message.
#[axum::debug_handler(state = AppState)]
async fn triage(
    payload: Result<Json<TriageReq>, JsonRejection>,
) -> Result<Json<TriageRes>, ApiError> {
    let Json(req) = payload.map_err(|e| {
        tracing::warn!("triage request rejected: {}", e.body_text());
        api_error(StatusCode::BAD_REQUEST, "Invalid triage request")
    })?;

    let context = QuestionContext {
        preceding_assistant: req.preceding_assistant.as_deref(),
        previous_target: req.previous_target,
    };
    let extraction = extract::update(&req.triage_state, &req.user_text, context);
    let check = escalation::check(&req.user_text, &extraction.state);

    Ok(Json(TriageRes::new(extraction, check.urgent, check.reasons)))
}

#[utoipa::path(
    post,
    path = "/insights",
    request_body = InsightsReq,
    responses(
        (status = 200, description = "Plain-language summary of the metrics", body = InsightsRes),
        (status = 400, description = "No health data supplied", body = ErrorRes),
        (status = 502, description = "Insights generation failed upstream", body = ErrorRes)
    )
)]
/// Summarise shared health metrics
///
/// # Errors
/// Returns `400 Bad Request` if `healthData` is missing or blank, and `502 Bad Gateway` if the
/// model call fails.
#[axum::debug_handler]
async fn insights(
    State(state): State<AppState>,
    payload: Result<Json<InsightsReq>, JsonRejection>,
) -> Result<Json<InsightsRes>, ApiError> {
    let Json(req) = payload.map_err(|e| {
        tracing::warn!("insights request rejected: {}", e.body_text());
        api_error(StatusCode::BAD_REQUEST, "Health data is required")
    })?;

    match state.insights.insights(&req.health_data).await {
        Ok(insights) => Ok(Json(InsightsRes { insights })),
        Err(CoreError::InvalidInput(_)) => Err(api_error(
            StatusCode::BAD_REQUEST,
            "Health data is required",
        )),
        Err(e) => {
            tracing::error!("insights error: {:?}", e);
            Err(api_error(StatusCode::BAD_GATEWAY, INSIGHTS_FAILED))
        }
    }
}
