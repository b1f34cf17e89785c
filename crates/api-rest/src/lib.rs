//! # API REST
//!
//! REST API implementation for the symptom triage questionnaire.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, the access key header)
//!
//! Uses `api-shared` for wire types and `triage-core` for everything else. Each session is a
//! [`Navigator`] held in memory under a random id; sessions are independent of one another.

#![warn(rust_2018_idioms)]

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use api_shared::{
    AccessGate, AuthError, CategoriesRes, ConditionSummary, ErrorRes, HealthRes, HealthService,
    OutcomeRes, SearchReq, SearchRes, SessionCommand, SessionRes, ACCESS_KEY_HEADER,
};
use triage_core::{
    config::{match_strategy_from_env_value, match_threshold_from_env_value},
    constants::{DEFAULT_FAILURE_LOG_PATH, DEFAULT_KB_PATH},
    ClarifyingStage, CoreConfig, MatchStrategy, Navigator, Outcome, Rationale, RiskSelection,
    TriageError, TriageResult, TriageService,
};
use triage_types::{Answer, Gender};

/// Sessions untouched for this long are dropped.
pub const DEFAULT_SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

type SharedNavigator = Arc<Mutex<Navigator>>;

struct SessionSlot {
    nav: SharedNavigator,
    last_seen: Instant,
}

/// Application state shared across REST API handlers.
///
/// The store lock only guards the id map. Each navigator has its own lock, taken on a blocking
/// thread, because commands may append to the failure log.
#[derive(Clone)]
pub struct AppState {
    service: TriageService,
    gate: AccessGate,
    sessions: Arc<Mutex<HashMap<Uuid, SessionSlot>>>,
    idle_timeout: Duration,
}

impl AppState {
    pub fn new(service: TriageService, gate: AccessGate) -> Self {
        Self {
            service,
            gate,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            idle_timeout: DEFAULT_SESSION_IDLE_TIMEOUT,
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    fn store(&self) -> Result<MutexGuard<'_, HashMap<Uuid, SessionSlot>>, ApiError> {
        self.sessions.lock().map_err(|_| {
            tracing::error!("session store lock poisoned");
            ApiError::internal()
        })
    }

    /// Adds a session, dropping every session idle for longer than the timeout.
    fn insert(&self, id: Uuid, nav: Navigator) -> Result<(), ApiError> {
        let idle_timeout = self.idle_timeout;
        let mut store = self.store()?;
        let before = store.len();
        store.retain(|_, slot| slot.last_seen.elapsed() <= idle_timeout);
        if store.len() < before {
            tracing::info!("expired {} idle sessions", before - store.len());
        }
        store.insert(
            id,
            SessionSlot {
                nav: Arc::new(Mutex::new(nav)),
                last_seen: Instant::now(),
            },
        );
        Ok(())
    }

    /// Looks up a live session and marks it as used.
    fn session(&self, id: Uuid) -> Result<SharedNavigator, ApiError> {
        let mut store = self.store()?;
        let slot = store
            .get_mut(&id)
            .ok_or_else(|| ApiError::session_not_found(id))?;
        if slot.last_seen.elapsed() > self.idle_timeout {
            store.remove(&id);
            tracing::info!("session {} expired", id);
            return Err(ApiError::session_not_found(id));
        }
        slot.last_seen = Instant::now();
        Ok(slot.nav.clone())
    }

    fn remove(&self, id: Uuid) -> Result<(), ApiError> {
        self.store()?
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| ApiError::session_not_found(id))
    }
}

fn lock_navigator(nav: &SharedNavigator) -> Result<MutexGuard<'_, Navigator>, ApiError> {
    nav.lock().map_err(|_| {
        tracing::error!("session lock poisoned");
        ApiError::internal()
    })
}

/// Reads `TRIAGE_SESSION_IDLE_MINUTES`; blank or unset means the default.
pub fn session_idle_timeout_from_env() -> anyhow::Result<Duration> {
    match std::env::var("TRIAGE_SESSION_IDLE_MINUTES") {
        Ok(v) if !v.trim().is_empty() => {
            let minutes: u64 = v.trim().parse().map_err(|_| {
                anyhow::anyhow!("TRIAGE_SESSION_IDLE_MINUTES must be a whole number, got '{v}'")
            })?;
            Ok(Duration::from_secs(minutes * 60))
        }
        _ => Ok(DEFAULT_SESSION_IDLE_TIMEOUT),
    }
}

/// Builds the core configuration from `TRIAGE_*` environment variables.
///
/// # Environment Variables
/// - `TRIAGE_KB_PATH`: knowledge base CSV (default: `data/symptom_kb.csv`)
/// - `TRIAGE_KB_URL`: remote CSV tried when the local file cannot be loaded
/// - `TRIAGE_FAILURE_LOG`: failure log CSV (default: `triage_failures.csv`)
/// - `TRIAGE_MATCH_THRESHOLD`: similarity threshold in `(0, 1]` (default: 0.65)
/// - `TRIAGE_MATCH_STRATEGY`: `anchored` or `phrase` (default: `anchored`)
pub fn config_from_env() -> anyhow::Result<CoreConfig> {
    let kb_path = std::env::var("TRIAGE_KB_PATH").unwrap_or_else(|_| DEFAULT_KB_PATH.into());
    let kb_url = std::env::var("TRIAGE_KB_URL").ok();
    let failure_log =
        std::env::var("TRIAGE_FAILURE_LOG").unwrap_or_else(|_| DEFAULT_FAILURE_LOG_PATH.into());
    let threshold = match_threshold_from_env_value(std::env::var("TRIAGE_MATCH_THRESHOLD").ok())?;
    let strategy = match_strategy_from_env_value(std::env::var("TRIAGE_MATCH_STRATEGY").ok())?;

    Ok(CoreConfig::new(
        PathBuf::from(kb_path),
        kb_url,
        PathBuf::from(failure_log),
        threshold,
        strategy,
    )?)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        list_categories,
        search_symptoms,
        create_session,
        get_session,
        send_command,
        get_report,
        delete_session,
    ),
    components(schemas(
        HealthRes,
        ErrorRes,
        CategoriesRes,
        SearchReq,
        SearchRes,
        ConditionSummary,
        SessionCommand,
        SessionRes,
        OutcomeRes,
    ))
)]
pub struct ApiDoc;

/// Builds the REST router with all routes, Swagger UI and CORS.
///
/// Everything except `/health` and the documentation sits behind the access key gate.
pub fn router(state: AppState) -> Router {
    let gated = Router::new()
        .route("/categories", get(list_categories))
        .route("/search", post(search_symptoms))
        .route("/sessions", post(create_session))
        .route("/sessions/:id", get(get_session).delete(delete_session))
        .route("/sessions/:id/commands", post(send_command))
        .route("/sessions/:id/report", get(get_report))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_access_key,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(gated)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// ERRORS
// ============================================================================

/// Error response: a status code plus a JSON body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
        }
    }

    fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal",
            "Internal error",
        )
    }

    fn session_not_found(id: Uuid) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "session_not_found",
            format!("no session {id}"),
        )
    }
}

impl From<TriageError> for ApiError {
    fn from(e: TriageError) -> Self {
        match e {
            TriageError::Validation(_) => Self::new(StatusCode::BAD_REQUEST, "validation", e.to_string()),
            TriageError::InvalidInput(_) => {
                Self::new(StatusCode::BAD_REQUEST, "invalid_input", e.to_string())
            }
            TriageError::GenderRestriction { .. } => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "gender_restriction",
                e.to_string(),
            ),
            TriageError::NoMatch(_) => Self::new(StatusCode::NOT_FOUND, "no_match", e.to_string()),
            other => {
                tracing::error!("triage error: {:?}", other);
                Self::internal()
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorRes {
            kind: self.kind.to_string(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

async fn require_access_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let provided = request
        .headers()
        .get(ACCESS_KEY_HEADER)
        .and_then(|v| v.to_str().ok());
    state.gate.validate_access_key(provided)?;
    Ok(next.run(request).await)
}

// ============================================================================
// CONVERSIONS
// ============================================================================

fn stage_key(stage: ClarifyingStage) -> &'static str {
    match stage {
        ClarifyingStage::First => "first",
        ClarifyingStage::Second => "second",
    }
}

fn rationale_key(rationale: Rationale) -> &'static str {
    match rationale {
        Rationale::SeverityIndicators => "severity_indicators",
        Rationale::RiskFactors => "risk_factors",
        Rationale::GeneralAdvice => "general_advice",
        Rationale::NoClearMatch => "no_clear_match",
    }
}

fn outcome_res(outcome: Outcome) -> OutcomeRes {
    OutcomeRes {
        headline: outcome.headline,
        rationale: rationale_key(outcome.rationale).to_string(),
        rationale_text: outcome.rationale.label().to_string(),
        recommendation: outcome.recommendation,
        referral: outcome.referral,
        is_high_risk: outcome.is_high_risk,
    }
}

fn session_res(id: Uuid, nav: &Navigator, warning: Option<String>) -> SessionRes {
    let view = nav.view();
    SessionRes {
        id: id.to_string(),
        step: view.step.to_string(),
        stage: view.stage.map(|s| stage_key(s).to_string()),
        prompt: view.prompt.to_string(),
        options: view.options,
        outcome: view.outcome.map(outcome_res),
        warning,
    }
}

fn parse_gender(value: Option<&str>) -> TriageResult<Option<Gender>> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| {
            v.parse::<Gender>()
                .map_err(|e| TriageError::Validation(e.to_string()))
        })
        .transpose()
}

fn parse_answers(raw: &BTreeMap<String, String>) -> TriageResult<BTreeMap<String, Answer>> {
    raw.iter()
        .map(|(question, answer)| {
            let answer = answer
                .parse::<Answer>()
                .map_err(|e| TriageError::Validation(e.to_string()))?;
            Ok((question.clone(), answer))
        })
        .collect()
}

/// Applies one command to a session, returning a non-blocking warning if there is one.
fn apply_command(nav: &mut Navigator, command: SessionCommand) -> TriageResult<Option<String>> {
    match command {
        SessionCommand::Begin => {
            nav.begin()?;
        }
        SessionCommand::UserInfo {
            age,
            gender,
            existing_conditions,
        } => {
            let gender = parse_gender(gender.as_deref())?;
            nav.submit_user_info(age, gender, &existing_conditions)?;
        }
        SessionCommand::SelectCategory { category } => {
            nav.select_category(&category)?;
        }
        SessionCommand::RequestFreeInput => {
            nav.request_free_input()?;
        }
        SessionCommand::SearchSymptoms { symptoms } => {
            nav.submit_free_text(&symptoms)?;
        }
        SessionCommand::SelectSubcategory { sub_category } => {
            nav.select_subcategory(&sub_category)?;
        }
        SessionCommand::SelectSymptoms { symptoms } => {
            nav.select_symptoms(&symptoms)?;
        }
        SessionCommand::AnswerQuestions { answers } => {
            nav.answer_clarifying(&parse_answers(&answers)?)?;
        }
        SessionCommand::SelectRisks { flags, none } => {
            let (_, warning) = nav.select_risks(&RiskSelection { flags, none })?;
            return Ok(warning);
        }
        SessionCommand::Escalate => {
            nav.escalate()?;
        }
        SessionCommand::Retry => {
            nav.retry_search()?;
        }
        SessionCommand::Back => {
            nav.back();
        }
        SessionCommand::StartOver => {
            nav.start_over();
        }
    }
    Ok(None)
}

// ============================================================================
// HANDLERS
// ============================================================================

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
#[axum::debug_handler]
async fn health(State(state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health(
        state.service.knowledge_base().len(),
    ))
}

#[derive(Debug, Deserialize)]
struct CategoriesQuery {
    gender: Option<String>,
}

#[utoipa::path(
    get,
    path = "/categories",
    params(("gender" = Option<String>, Query, description = "Hide categories reserved for the other gender")),
    responses(
        (status = 200, description = "Primary categories", body = CategoriesRes),
        (status = 400, description = "Unknown gender", body = ErrorRes),
        (status = 401, description = "Missing or invalid access key", body = ErrorRes)
    )
)]
/// Lists primary categories, optionally filtered for a gender
#[axum::debug_handler]
async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<CategoriesQuery>,
) -> Result<Json<CategoriesRes>, ApiError> {
    let gender = parse_gender(query.gender.as_deref())?;
    let categories = state
        .service
        .categories(gender)
        .into_iter()
        .map(str::to_string)
        .collect();
    Ok(Json(CategoriesRes { categories }))
}

#[utoipa::path(
    post,
    path = "/search",
    request_body = SearchReq,
    responses(
        (status = 200, description = "Matching conditions, possibly none", body = SearchRes),
        (status = 400, description = "Blank symptoms or unknown strategy", body = ErrorRes),
        (status = 401, description = "Missing or invalid access key", body = ErrorRes)
    )
)]
/// Matches free-text symptoms against the knowledge base, outside any session
#[axum::debug_handler]
async fn search_symptoms(
    State(state): State<AppState>,
    Json(req): Json<SearchReq>,
) -> Result<Json<SearchRes>, ApiError> {
    let strategy = req
        .strategy
        .as_deref()
        .map(str::parse::<MatchStrategy>)
        .transpose()?;
    let matches = state
        .service
        .search(&req.symptoms, strategy)?
        .into_iter()
        .map(|row| ConditionSummary {
            primary_category: row.primary_category.clone(),
            sub_category: row.sub_category.clone(),
            condition: row.condition.to_string(),
            acuity_level: row.acuity_level.value(),
        })
        .collect();
    Ok(Json(SearchRes { matches }))
}

#[utoipa::path(
    post,
    path = "/sessions",
    responses(
        (status = 201, description = "Session started at the welcome step", body = SessionRes),
        (status = 401, description = "Missing or invalid access key", body = ErrorRes)
    )
)]
/// Starts a new questionnaire session
#[axum::debug_handler]
async fn create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionRes>), ApiError> {
    let id = Uuid::new_v4();
    let nav = state.service.start_session();
    let res = session_res(id, &nav, None);
    state.insert(id, nav)?;
    tracing::info!("session {} started", id);
    Ok((StatusCode::CREATED, Json(res)))
}

#[utoipa::path(
    get,
    path = "/sessions/{id}",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Current step", body = SessionRes),
        (status = 404, description = "Unknown session", body = ErrorRes)
    )
)]
/// Shows the session's current step and its options
#[axum::debug_handler]
async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionRes>, ApiError> {
    let nav = state.session(id)?;
    let nav = lock_navigator(&nav)?;
    Ok(Json(session_res(id, &nav, None)))
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/commands",
    params(("id" = String, Path, description = "Session id")),
    request_body = SessionCommand,
    responses(
        (status = 200, description = "Step after the command", body = SessionRes),
        (status = 400, description = "Invalid answer, or command not allowed at this step", body = ErrorRes),
        (status = 404, description = "Unknown session, or no condition matches the symptoms", body = ErrorRes),
        (status = 422, description = "Category not available for the stated gender", body = ErrorRes)
    )
)]
/// Applies a navigation command to a session
///
/// A rejected command leaves the session on its current step.
#[axum::debug_handler]
async fn send_command(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(command): Json<SessionCommand>,
) -> Result<Json<SessionRes>, ApiError> {
    let nav = state.session(id)?;
    let res = tokio::task::spawn_blocking(move || {
        let mut nav = lock_navigator(&nav)?;
        let warning = apply_command(&mut nav, command)?;
        Ok::<_, ApiError>(session_res(id, &nav, warning))
    })
    .await
    .map_err(|e| {
        tracing::error!("session command task failed: {}", e);
        ApiError::internal()
    })??;
    Ok(Json(res))
}

#[utoipa::path(
    get,
    path = "/sessions/{id}/report",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Plain-text report", body = String, content_type = "text/plain"),
        (status = 404, description = "Unknown session", body = ErrorRes),
        (status = 409, description = "Session has no results yet", body = ErrorRes)
    )
)]
/// Downloads the plain-text report of a resolved session
#[axum::debug_handler]
async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let nav = state.session(id)?;
    let nav = lock_navigator(&nav)?;
    let report = nav
        .report(chrono::Local::now().date_naive())
        .ok_or_else(|| {
            ApiError::new(
                StatusCode::CONFLICT,
                "not_resolved",
                "the session has not reached its results yet",
            )
        })?;

    let headers = [
        (
            header::CONTENT_TYPE,
            "text/plain; charset=utf-8".to_string(),
        ),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", report.file_name),
        ),
    ];
    Ok((headers, report.text).into_response())
}

#[utoipa::path(
    delete,
    path = "/sessions/{id}",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 204, description = "Session discarded"),
        (status = 404, description = "Unknown session", body = ErrorRes)
    )
)]
/// Discards a session and everything it collected
#[axum::debug_handler]
async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.remove(id)?;
    tracing::info!("session {} discarded", id);
    Ok(StatusCode::NO_CONTENT)
}
