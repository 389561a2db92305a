use std::{error::Error as StdError, net::SocketAddr, sync::Arc};

use anyhow::Result;
use axum::{
    Extension, Form, Json, Router,
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderName, Request, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, task::JoinHandle};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use super::session::{self, SessionStore};
use crate::{
    CoreError,
    audit::{self, AuditAction, AuditEntry, AuditOutcome, AuditSink},
    config::UserRegistry,
    fleet::{DebugStatus, FleetManager, ServerStatus},
};

const SERVICE_NAME: &str = "wp-fleet";
const HX_REDIRECT: HeaderName = HeaderName::from_static("hx-redirect");
const RESTART_SUCCESS: &str = "server restarted successfully";

#[derive(Clone)]
pub struct HttpState {
    pub manager: Arc<FleetManager>,
    pub users: Arc<UserRegistry>,
    pub sessions: SessionStore,
    pub audit: Option<AuditSink>,
}

#[derive(Debug)]
pub struct HttpServerHandle {
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl HttpServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn shutdown(self) {
        self.task.abort();
    }
}

/// Operator attached to a request by the session middleware.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub String);

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    time: String,
    service: &'static str,
}

#[derive(Serialize)]
pub struct ServerListResponse {
    pub servers: Vec<ServerStatus>,
}

#[derive(Serialize)]
pub struct DebugActionResponse {
    pub server: String,
    pub status: DebugStatus,
    pub servers: Vec<ServerStatus>,
}

#[derive(Serialize)]
pub struct RestartActionResponse {
    pub server: String,
    pub success: &'static str,
}

#[derive(Deserialize)]
pub struct CreateSessionForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct ServerActionForm {
    #[serde(default)]
    pub server: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    BadGateway(String),
    Internal(String),
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ServerNotFound { .. } => ApiError::not_found(err.to_string()),
            CoreError::RestartFailed { .. } | CoreError::RestartExit { .. } => {
                ApiError::BadGateway(err.to_string())
            }
            CoreError::ReadDescriptor { .. }
            | CoreError::WriteDescriptor { .. }
            | CoreError::RestartSpawn { .. }
            | CoreError::RestartStderr { .. }
            | CoreError::RestartWait { .. }
            | CoreError::RestartCommandMissing
            | CoreError::InvalidBindAddress { .. } => ApiError::internal(render_chain(&err)),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message),
            ApiError::BadGateway(message) => (StatusCode::BAD_GATEWAY, message),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

fn render_chain(err: &dyn StdError) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}

pub fn build_router(state: HttpState) -> Router {
    let protected = Router::new()
        .route("/v1/servers", get(list_servers))
        .route("/v1/actions/debug", post(debug_action))
        .route("/v1/actions/restart", post(restart_action))
        .route_layer(middleware::from_fn_with_state(state.sessions.clone(), require_session));

    Router::new()
        .route("/health", get(get_health))
        .route("/v1/sessions", post(create_session).delete(delete_session))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn require_session(
    State(sessions): State<SessionStore>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let username = session::token_from_headers(req.headers())
        .and_then(|token| sessions.username(&token))
        .ok_or_else(|| ApiError::unauthorized("please sign in first"))?;
    req.extensions_mut().insert(CurrentUser(username));
    Ok(next.run(req).await)
}

pub async fn spawn_http_server(state: HttpState, addr: SocketAddr) -> Result<HttpServerHandle> {
    let router = build_router(state);
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    info!("HTTP server listening on {}", local_addr);

    let task = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, router).await {
            error!("HTTP server terminated with error: {err}");
        }
    });

    Ok(HttpServerHandle { addr: local_addr, task })
}

async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy", time: audit::now_timestamp(), service: SERVICE_NAME })
}

async fn create_session(
    State(state): State<HttpState>,
    Form(body): Form<CreateSessionForm>,
) -> Result<Response, ApiError> {
    if body.username.is_empty() || !state.users.validate(&body.username, &body.password) {
        warn!(username = %body.username, "rejected sign-in");
        return Err(ApiError::unauthorized("invalid credentials"));
    }

    let token = state.sessions.create(&body.username);
    info!(username = %body.username, "operator signed in");
    let headers = [
        (header::SET_COOKIE, session::session_cookie(&token)),
        (HX_REDIRECT, "/".to_string()),
    ];
    Ok((StatusCode::NO_CONTENT, headers).into_response())
}

async fn delete_session(State(state): State<HttpState>, headers: HeaderMap) -> Response {
    if let Some(username) =
        session::token_from_headers(&headers).and_then(|token| state.sessions.remove(&token))
    {
        info!(username = %username, "operator signed out");
    }
    let headers = [
        (header::SET_COOKIE, session::expired_session_cookie()),
        (HX_REDIRECT, "/".to_string()),
    ];
    (StatusCode::NO_CONTENT, headers).into_response()
}

async fn list_servers(
    State(state): State<HttpState>,
) -> Result<Json<ServerListResponse>, ApiError> {
    let manager = state.manager.clone();
    let servers = run_blocking(move || manager.all_statuses()).await??;
    Ok(Json(ServerListResponse { servers }))
}

async fn debug_action(
    State(state): State<HttpState>,
    Extension(user): Extension<CurrentUser>,
    Form(body): Form<ServerActionForm>,
) -> Result<Json<DebugActionResponse>, ApiError> {
    let server = required_server(body)?;

    let manager = state.manager.clone();
    let name = server.clone();
    let toggled = run_blocking(move || manager.flip_debug(&name)).await?;

    let status = match toggled {
        Ok(status) => {
            record(
                &state,
                AuditEntry::new(AuditAction::Debug, &server, AuditOutcome::Success)
                    .with_user(&user.0)
                    .with_message(status.as_str()),
            )
            .await;
            status
        }
        Err(err) => {
            warn!(server = %server, error = ?err, "debug toggle failed");
            record(
                &state,
                AuditEntry::new(AuditAction::Debug, &server, AuditOutcome::Failure)
                    .with_user(&user.0)
                    .with_message(render_chain(&err)),
            )
            .await;
            return Err(ApiError::from(err));
        }
    };

    // The descriptor is already rewritten; a failing report does not undo the toggle.
    let manager = state.manager.clone();
    let servers = run_blocking(move || manager.all_statuses()).await?.map_err(|err| {
        warn!(server = %server, %status, error = ?err, "status report failed after toggle");
        ApiError::from(err)
    })?;
    Ok(Json(DebugActionResponse { server, status, servers }))
}

async fn restart_action(
    State(state): State<HttpState>,
    Extension(user): Extension<CurrentUser>,
    Form(body): Form<ServerActionForm>,
) -> Result<Json<RestartActionResponse>, ApiError> {
    let server = required_server(body)?;

    let manager = state.manager.clone();
    let name = server.clone();
    let outcome = run_blocking(move || manager.restart_server(&name)).await?;

    let mut entry = AuditEntry::new(
        AuditAction::Restart,
        &server,
        if outcome.is_ok() { AuditOutcome::Success } else { AuditOutcome::Failure },
    )
    .with_user(&user.0);
    if let Err(err) = &outcome {
        warn!(server = %server, error = ?err, "restart failed");
        entry = entry.with_message(render_chain(err));
    }
    record(&state, entry).await;

    outcome.map_err(ApiError::from)?;
    Ok(Json(RestartActionResponse { server, success: RESTART_SUCCESS }))
}

fn required_server(body: ServerActionForm) -> Result<String, ApiError> {
    if body.server.is_empty() {
        return Err(ApiError::bad_request("server is required"));
    }
    Ok(body.server)
}

/// Run a filesystem or process operation off the async executor.
async fn run_blocking<T, F>(task: F) -> Result<Result<T, CoreError>, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, CoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| ApiError::internal(format!("blocking task failed: {err}")))
}

async fn record(state: &HttpState, entry: AuditEntry) {
    let Some(sink) = state.audit.as_ref() else {
        return;
    };
    if let Err(err) = sink.append(&entry).await {
        warn!(path = %sink.path().display(), error = ?err, "failed to write audit record");
    }
}
