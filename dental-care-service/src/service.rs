use axum::{
    Router,
    body::{Body, Bytes},
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, Request, StatusCode, header},
    middleware::{Next, from_fn},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use thiserror::Error;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, error, info, warn};
use uuid::Uuid;
use wizard_flow::{
    Flow, FlowId, FlowRegistry, Outcome, REVIEW_STEP, Route, SessionStorage, Submission, WizardError,
    WizardRunner, WizardState,
};

use crate::{
    config::ServiceConfig,
    flows::{build_registry, is_protected},
    household::{HouseholdState, children_state},
    messages::{Lang, LocalizedError, localize},
    models::{ApplicationYear, state_keys},
    repository::{ApplicationRepository, InMemoryApplicationRepository},
};

pub const CLIENT_NUMBER_HEADER: &str = "x-client-number";
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

#[derive(Clone)]
pub struct AppState {
    pub runner: WizardRunner,
    pub flows: Arc<FlowRegistry>,
    pub applications: Arc<dyn ApplicationRepository>,
}

impl AppState {
    pub fn new(storage: Arc<dyn SessionStorage>, config: &ServiceConfig) -> Self {
        Self {
            runner: WizardRunner::new(storage),
            flows: Arc::new(build_registry(&config.marital_status_codes)),
            applications: Arc::new(InMemoryApplicationRepository::new()),
        }
    }
}

/// Errors surfaced by the HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The flow instance is gone or never existed; start over at the landing page.
    #[error("flow instance unavailable, restarting at {0}")]
    Restart(String),

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("malformed request body: {0}")]
    BadRequest(String),

    #[error("client number required")]
    Unauthenticated,

    #[error("client number does not match this application")]
    Forbidden,

    #[error(transparent)]
    Wizard(WizardError),

    #[error("application submission failed: {0}")]
    Repository(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Restart(location) => return found(location),
            ApiError::UnsupportedLanguage(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Wizard(WizardError::FlowNotFound(_) | WizardError::StepNotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Wizard(_) | ApiError::Repository(_) => {
                error!(error = %self, "Request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

type ApiResult = Result<Response, ApiError>;

/// Map a wizard error for `flow`. Missing state and malformed ids restart the flow.
fn wizard_error(lang: Lang, flow: &str, error: WizardError) -> ApiError {
    match error {
        WizardError::StateNotFound { .. } | WizardError::InvalidFlowId(_) => {
            info!(flow, error = %error, "Restarting flow");
            ApiError::Restart(landing_url(lang, flow))
        }
        other => ApiError::Wizard(other),
    }
}

fn landing_url(lang: Lang, flow: &str) -> String {
    format!("/{lang}/{flow}")
}

fn page_url(lang: Lang, flow_id: &FlowId, route: &Route) -> String {
    format!("/{lang}/{}/{flow_id}/{}", route.flow, route.step)
}

/// 302, for redirects decided while loading a page.
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// 303, for redirects after a form post.
fn see_other(location: &str) -> Response {
    (StatusCode::SEE_OTHER, [(header::LOCATION, location.to_string())]).into_response()
}

/// Middleware to add correlation ID to all requests
async fn correlation_id_middleware(mut request: Request<Body>, next: Next) -> Response {
    let correlation_id = request
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let header_value = HeaderValue::from_str(&correlation_id).ok();
    if let Some(value) = &header_value {
        request.headers_mut().insert(CORRELATION_ID_HEADER, value.clone());
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    let mut response = next.run(request).instrument(span).await;
    if let Some(value) = header_value {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }
    response
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/{lang}/{flow}", get(landing))
        .route("/{lang}/{flow}/start", post(start))
        .route("/{lang}/{flow}/{flow_id}", delete(clear))
        .route("/{lang}/{flow}/{flow_id}/{step}", get(show_page).post(submit_page))
        .route("/{lang}/{flow}/{flow_id}/edit/{step}", post(edit_step))
        .layer(from_fn(correlation_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Language and flow named by the path.
fn resolve(app: &AppState, lang: &str, flow: &str) -> Result<(Lang, Arc<Flow>), ApiError> {
    let lang: Lang = lang.parse().map_err(ApiError::UnsupportedLanguage)?;
    let flow = app.flows.get(flow).map_err(ApiError::Wizard)?;
    Ok((lang, flow))
}

fn client_number(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(CLIENT_NUMBER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Protected flows only serve the client the flow was started for.
async fn authorize(
    app: &AppState,
    lang: Lang,
    flow: &Flow,
    flow_id: &FlowId,
    headers: &HeaderMap,
) -> Result<(), ApiError> {
    if !is_protected(&flow.id) {
        return Ok(());
    }
    let Some(client) = client_number(headers) else {
        warn!(flow = %flow.id, flow_id = %flow_id, "Protected flow requested without client number");
        return Err(ApiError::Unauthenticated);
    };

    let state = app
        .runner
        .state(flow, flow_id)
        .await
        .map_err(|e| wizard_error(lang, &flow.id, e))?;
    if state.get::<String>(state_keys::CLIENT_NUMBER).as_deref() != Some(client) {
        warn!(flow = %flow.id, flow_id = %flow_id, "Client number mismatch");
        return Err(ApiError::Forbidden);
    }
    Ok(())
}

async fn landing(State(app): State<AppState>, Path((lang, flow)): Path<(String, String)>) -> ApiResult {
    let (lang, flow) = resolve(&app, &lang, &flow)?;
    Ok(Json(json!({
        "flow": flow.id,
        "lang": lang,
        "start": format!("/{lang}/{}/start", flow.id),
    }))
    .into_response())
}

async fn start(
    State(app): State<AppState>,
    Path((lang, flow)): Path<(String, String)>,
    headers: HeaderMap,
) -> ApiResult {
    let (lang, flow) = resolve(&app, &lang, &flow)?;
    let fail = |e| wizard_error(lang, &flow.id, e);

    let mut seed = WizardState::new();
    if is_protected(&flow.id) {
        let client = client_number(&headers).ok_or(ApiError::Unauthenticated)?;
        seed.set(state_keys::CLIENT_NUMBER, client).map_err(fail)?;
    }

    let (flow_id, entry) = app.runner.start(&flow, seed).await.map_err(fail)?;
    Ok(see_other(&page_url(lang, &flow_id, &entry)))
}

/// Everything a page template needs.
#[derive(Debug, Serialize)]
pub struct PageResponse {
    pub lang: Lang,
    pub flow: String,
    pub flow_id: FlowId,
    pub step: String,
    pub application_year: ApplicationYear,
    pub state: WizardState,
}

async fn show_page(
    State(app): State<AppState>,
    Path((lang, flow, flow_id, step)): Path<(String, String, String, String)>,
    headers: HeaderMap,
) -> ApiResult {
    let (lang, flow) = resolve(&app, &lang, &flow)?;
    let fail = |e| wizard_error(lang, &flow.id, e);
    let flow_id: FlowId = flow_id.parse().map_err(fail)?;
    authorize(&app, lang, &flow, &flow_id, &headers).await?;

    let outcome = if step == REVIEW_STEP {
        app.runner.review(&flow, &flow_id).await
    } else {
        app.runner.load(&flow, &flow_id, &step).await
    }
    .map_err(fail)?;

    match outcome {
        Outcome::Proceed(state) => Ok(Json(PageResponse {
            lang,
            flow: flow.id.clone(),
            flow_id,
            step,
            application_year: ApplicationYear::for_date(app.runner.today()),
            state,
        })
        .into_response()),
        Outcome::RedirectTo(route) => Ok(found(&page_url(lang, &flow_id, &route))),
    }
}

async fn submit_page(
    State(app): State<AppState>,
    Path((lang, flow, flow_id, step)): Path<(String, String, String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult {
    let (lang, flow) = resolve(&app, &lang, &flow)?;
    let fail = |e| wizard_error(lang, &flow.id, e);
    let flow_id: FlowId = flow_id.parse().map_err(fail)?;
    authorize(&app, lang, &flow, &flow_id, &headers).await?;

    if step == REVIEW_STEP {
        return submit_application(&app, lang, &flow, &flow_id).await;
    }

    let input: Value = if body.is_empty() {
        json!({})
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
    };

    match app
        .runner
        .submit_step(&flow, &flow_id, &step, &input)
        .await
        .map_err(fail)?
    {
        Submission::Redirect(route) => Ok(see_other(&page_url(lang, &flow_id, &route))),
        Submission::Rejected(errors) => {
            let errors: Vec<LocalizedError> = localize(errors, lang);
            Ok((StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "errors": errors }))).into_response())
        }
    }
}

/// Re-check the answers, hand them to the application API and lock the flow.
/// Only completed children are sent with the application.
fn submission_state(mut state: WizardState) -> wizard_flow::Result<WizardState> {
    if state.contains(state_keys::CHILDREN) {
        let children = children_state(&state.children(), false);
        state.set(state_keys::CHILDREN, children)?;
    }
    Ok(state)
}

async fn submit_application(app: &AppState, lang: Lang, flow: &Flow, flow_id: &FlowId) -> ApiResult {
    let fail = |e| wizard_error(lang, &flow.id, e);

    let state = match app.runner.review(flow, flow_id).await.map_err(fail)? {
        Outcome::Proceed(state) => state,
        Outcome::RedirectTo(route) => return Ok(found(&page_url(lang, flow_id, &route))),
    };

    let state = submission_state(state).map_err(fail)?;
    let info = app.applications.submit(&flow.id, &state).await?;
    let confirmation = app
        .runner
        .mark_submitted(flow, flow_id, info)
        .await
        .map_err(fail)?;
    Ok(see_other(&page_url(lang, flow_id, &confirmation)))
}

async fn edit_step(
    State(app): State<AppState>,
    Path((lang, flow, flow_id, step)): Path<(String, String, String, String)>,
    headers: HeaderMap,
) -> ApiResult {
    let (lang, flow) = resolve(&app, &lang, &flow)?;
    let fail = |e| wizard_error(lang, &flow.id, e);
    let flow_id: FlowId = flow_id.parse().map_err(fail)?;
    authorize(&app, lang, &flow, &flow_id, &headers).await?;

    let route = app.runner.edit(&flow, &flow_id, &step).await.map_err(fail)?;
    Ok(see_other(&page_url(lang, &flow_id, &route)))
}

async fn clear(
    State(app): State<AppState>,
    Path((lang, flow, flow_id)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> ApiResult {
    let (lang, flow) = resolve(&app, &lang, &flow)?;
    let fail = |e| wizard_error(lang, &flow.id, e);
    let flow_id: FlowId = flow_id.parse().map_err(fail)?;
    authorize(&app, lang, &flow, &flow_id, &headers).await?;

    app.runner.clear(&flow, &flow_id).await.map_err(fail)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
