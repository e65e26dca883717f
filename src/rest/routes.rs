//! Wizard step endpoints.
//!
//! Every registered step URL gets the same handler: GET renders the step
//! (with replayed data), POST submits it. Redirect outcomes come back as
//! `303 See Other` so browsers re-GET the target step.

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::request::{Dispatch, MethodKind, RequestContext};
use crate::rest::error::ApiError;
use crate::rest::state::AppState;
use crate::wizard::{StepView, WizardController};

const SESSION_COOKIE: &str = "formwizard_session";

/// A wizard step rendered as JSON.
#[derive(Serialize)]
pub struct StepPage {
    pub name: String,
    pub description: String,
    pub url: String,
    /// Replayed data from earlier steps, live fields on top.
    pub data: Map<String, Value>,
    /// Visible steps annotated completed/active/disabled.
    pub steps: Vec<StepView>,
    /// Back link target, skipping auto-submitted steps.
    pub previous: Option<String>,
}

/// Summary returned when the final step completes.
#[derive(Serialize)]
pub struct WizardSummary {
    pub finished: bool,
    pub data: Map<String, Value>,
}

/// GET/POST handler for every step URL.
pub async fn handle_step(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> Response {
    let (session_id, is_new) = resolve_session_id(&headers);

    let data = match body {
        Some(Json(Value::Object(map))) => map,
        _ => Map::new(),
    };
    let mut req =
        RequestContext::new(uri.path(), MethodKind::from(&method)).with_data(data);

    let mut sessions = state.sessions.write().await;
    let session = sessions.entry(session_id).or_default();
    let mut controller = WizardController::new(&state.wizard, session);

    let mut response = match controller.startup(&mut req) {
        Ok(Dispatch::Passthrough) => {
            ApiError::NotFound(format!("no wizard step at {}", req.path)).into_response()
        }
        Ok(Dispatch::Redirect(url)) => see_other(&url),
        Ok(Dispatch::Halted) => {
            ApiError::Rejected("submission rejected by step handler".to_string()).into_response()
        }
        Ok(Dispatch::Complete) => summary_response(&controller),
        Ok(Dispatch::Continue) => step_response(&controller, &req),
        Err(err) => ApiError::from(err).into_response(),
    };

    if is_new {
        attach_session_cookie(&mut response, session_id);
    }
    response
}

/// POST handler clearing all wizard progress, then back to the first step.
pub async fn reset(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (session_id, is_new) = resolve_session_id(&headers);

    let mut sessions = state.sessions.write().await;
    let session = sessions.entry(session_id).or_default();
    let mut controller = WizardController::new(&state.wizard, session);

    let mut response = match controller.reset() {
        Ok(()) => match state.wizard.step_at(0) {
            Some(first) => see_other(&first.url),
            None => StatusCode::NO_CONTENT.into_response(),
        },
        Err(err) => ApiError::from(err).into_response(),
    };

    if is_new {
        attach_session_cookie(&mut response, session_id);
    }
    response
}

fn step_response<S>(controller: &WizardController<'_, '_, S>, req: &RequestContext) -> Response
where
    S: crate::session::SessionStore + ?Sized,
{
    let Some(step) = controller.current_step() else {
        return ApiError::Internal("no current step after startup".to_string()).into_response();
    };
    Json(StepPage {
        name: step.name.clone(),
        description: step.description.clone(),
        url: step.url.clone(),
        data: req.data.clone(),
        steps: controller.steps(),
        previous: controller.previous_step().map(|step| step.url.clone()),
    })
    .into_response()
}

fn summary_response<S>(controller: &WizardController<'_, '_, S>) -> Response
where
    S: crate::session::SessionStore + ?Sized,
{
    match controller.merged_data() {
        Ok(data) => Json(WizardSummary {
            finished: true,
            data,
        })
        .into_response(),
        Err(err) => ApiError::from(err).into_response(),
    }
}

fn see_other(url: &str) -> Response {
    match HeaderValue::from_str(url) {
        Ok(location) => {
            let mut response = StatusCode::SEE_OTHER.into_response();
            response.headers_mut().insert(header::LOCATION, location);
            response
        }
        Err(_) => ApiError::Internal(format!("invalid redirect target {url}")).into_response(),
    }
}

/// Session id from the request cookie, or a fresh one for new clients.
fn resolve_session_id(headers: &HeaderMap) -> (Uuid, bool) {
    let from_cookie = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|cookies| {
            cookies.split(';').find_map(|cookie| {
                let (name, value) = cookie.trim().split_once('=')?;
                (name == SESSION_COOKIE).then(|| Uuid::parse_str(value).ok())?
            })
        });

    match from_cookie {
        Some(id) => (id, false),
        None => (Uuid::new_v4(), true),
    }
}

fn attach_session_cookie(response: &mut Response, session_id: Uuid) {
    let cookie = format!("{SESSION_COOKIE}={session_id}; Path=/; HttpOnly; SameSite=Lax");
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
}
