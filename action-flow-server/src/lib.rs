pub mod config;
pub mod demo;

use action_flow::{Dispatch, FlowError, FlowRunner, FlowState, Session, SessionStorage};
use axum::{
    Router,
    extract::{Path, State},
    http::{HeaderValue, Request, StatusCode},
    middleware::{Next, from_fn},
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{Instrument, error, info};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    runners: Arc<HashMap<String, FlowRunner>>,
    session_storage: Arc<dyn SessionStorage>,
}

impl AppState {
    pub fn new(session_storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            runners: Arc::new(HashMap::new()),
            session_storage,
        }
    }

    /// Serve a flow package under `/flows/{package}`.
    pub fn with_runner(mut self, runner: FlowRunner) -> Self {
        let name = runner.package().name().to_string();
        Arc::make_mut(&mut self.runners).insert(name, runner);
        self
    }

    fn runner(&self, package: &str) -> Result<&FlowRunner, StatusCode> {
        self.runners.get(package).ok_or_else(|| {
            error!(package, "Flow package not found");
            StatusCode::NOT_FOUND
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    pub session_id: Option<String>,
    #[serde(default)]
    pub params: HashMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActionResponse {
    pub session_id: String,
    pub dispatch: Dispatch,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionCreated {
    pub session_id: String,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/sessions", post(create_session))
        .route("/session/{id}", get(get_session))
        .route("/flows/{package}/{action}", post(run_action))
        .route(
            "/flows/{package}/sessions/{id}",
            get(get_progress).delete(reset_progress),
        )
        .layer(from_fn(correlation_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Middleware to add correlation ID to all requests
async fn correlation_id_middleware(
    mut request: Request<axum::body::Body>,
    next: Next,
) -> axum::response::Response {
    let correlation_id = Uuid::new_v4().to_string();
    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        request.headers_mut().insert("x-correlation-id", value);
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    next.run(request).instrument(span).await
}

fn status_for(err: &FlowError) -> StatusCode {
    match err {
        FlowError::ActionNotFound(_)
        | FlowError::PackageNotFound(_)
        | FlowError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn health_check() -> &'static str {
    "OK"
}

async fn create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionCreated>), StatusCode> {
    let session = Session::new_random();
    let session_id = session.id.clone();
    if let Err(e) = state.session_storage.save(session).await {
        error!(error = %e, "Failed to create session");
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    info!(session_id = %session_id, "Created session");
    Ok((StatusCode::CREATED, Json(SessionCreated { session_id })))
}

async fn run_action(
    State(state): State<AppState>,
    Path((package, action)): Path<(String, String)>,
    Json(request): Json<ActionRequest>,
) -> Result<Json<ActionResponse>, StatusCode> {
    let runner = state.runner(&package)?;

    info!(
        package = %package,
        action = %action,
        session_id = ?request.session_id,
        params = request.params.len(),
        "Processing action request"
    );

    let session_id = match request.session_id {
        Some(session_id) => {
            if Uuid::parse_str(&session_id).is_err() {
                error!(session_id = %session_id, "Invalid session ID format");
                return Err(StatusCode::BAD_REQUEST);
            }
            session_id
        }
        None => runner.start_session().await.map_err(|e| {
            error!(error = %e, "Failed to create session");
            status_for(&e)
        })?,
    };

    let dispatch = runner
        .run(&session_id, &action, request.params)
        .await
        .map_err(|e| {
            error!(session_id = %session_id, action = %action, error = %e, "Failed to run action");
            status_for(&e)
        })?;

    Ok(Json(ActionResponse {
        session_id,
        dispatch,
    }))
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Session>, StatusCode> {
    match state.session_storage.get(&session_id).await {
        Ok(Some(session)) => Ok(Json(session)),
        Ok(None) => {
            info!(session_id = %session_id, "Session not found");
            Err(StatusCode::NOT_FOUND)
        }
        Err(e) => {
            error!(session_id = %session_id, error = %e, "Failed to get session");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn get_progress(
    State(state): State<AppState>,
    Path((package, session_id)): Path<(String, String)>,
) -> Result<Json<Option<FlowState>>, StatusCode> {
    let runner = state.runner(&package)?;
    runner.progress(&session_id).await.map(Json).map_err(|e| {
        error!(session_id = %session_id, error = %e, "Failed to read progress");
        status_for(&e)
    })
}

async fn reset_progress(
    State(state): State<AppState>,
    Path((package, session_id)): Path<(String, String)>,
) -> Result<StatusCode, StatusCode> {
    let runner = state.runner(&package)?;
    runner
        .reset(&session_id)
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(|e| {
            error!(session_id = %session_id, error = %e, "Failed to reset progress");
            status_for(&e)
        })
}
