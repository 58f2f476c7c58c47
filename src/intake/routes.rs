//! REST endpoints for driving the intake flow from a front-end.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use crate::error::{FlowError, SyncError};
use crate::session::model::ProfilePatch;

use super::flow::IntakeFlow;
use super::navigation::Destination;

/// Shared state for intake routes.
#[derive(Clone)]
pub struct IntakeRouteState {
    pub flow: Arc<IntakeFlow>,
}

#[derive(Debug, Serialize)]
struct NavigationBody {
    destination: Destination,
    route: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    written: Option<bool>,
}

impl NavigationBody {
    fn new(flow: &IntakeFlow, destination: Destination) -> Self {
        Self {
            route: destination.route(flow.routes()),
            destination,
            written: None,
        }
    }
}

impl IntoResponse for FlowError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            FlowError::UnknownStep(_) => (StatusCode::NOT_FOUND, "Step does not exist".to_string()),
            FlowError::InvalidAnswer { .. } => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            FlowError::Sync(SyncError::Remote { source, .. }) => {
                (StatusCode::BAD_GATEWAY, source.detail())
            }
            FlowError::Api(e) => (StatusCode::BAD_GATEWAY, e.detail()),
            FlowError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };
        if status.is_server_error() {
            warn!(error = %self, "Intake request failed");
        }
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// GET /api/intake/start
///
/// Resets the traversal and returns the first step.
async fn start(State(state): State<IntakeRouteState>) -> Result<Json<NavigationBody>, FlowError> {
    state.flow.enter_landing().await?;
    let destination = state.flow.start();
    Ok(Json(NavigationBody::new(&state.flow, destination)))
}

/// GET /api/intake/steps/{step}
async fn get_step(
    State(state): State<IntakeRouteState>,
    Path(step): Path<String>,
) -> Result<impl IntoResponse, FlowError> {
    let view = state.flow.view(&step).await?;
    Ok(Json(view))
}

/// POST /api/intake/steps/{step}
///
/// Saves the answer and returns where to go next. A 502 means the write
/// was rolled back and may be retried.
async fn submit_step(
    State(state): State<IntakeRouteState>,
    Path(step): Path<String>,
    Json(patch): Json<ProfilePatch>,
) -> Result<Json<NavigationBody>, FlowError> {
    let outcome = state.flow.submit(&step, patch).await?;
    let mut body = NavigationBody::new(&state.flow, outcome.destination);
    body.written = Some(outcome.written);
    Ok(Json(body))
}

/// GET /api/intake/steps/{step}/back
async fn back_step(
    State(state): State<IntakeRouteState>,
    Path(step): Path<String>,
) -> Result<Json<NavigationBody>, FlowError> {
    let destination = state.flow.back(&step).await?;
    Ok(Json(NavigationBody::new(&state.flow, destination)))
}

/// GET /api/intake/status
async fn get_status(State(state): State<IntakeRouteState>) -> impl IntoResponse {
    Json(state.flow.status().await)
}

/// Build the intake REST routes.
pub fn intake_routes(state: IntakeRouteState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/api/intake/start", get(start))
        .route("/api/intake/steps/{step}", get(get_step).post(submit_step))
        .route("/api/intake/steps/{step}/back", get(back_step))
        .route("/api/intake/status", get(get_status))
        .layer(cors)
        .with_state(state)
}
