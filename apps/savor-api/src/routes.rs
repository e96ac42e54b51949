use axum::{
	Json, Router,
	extract::{Path, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::{AppState, SharedSession};
use savor_domain::{Candidate, Recommendation};
use savor_service::Error;

#[derive(Debug, Deserialize)]
pub struct RetrieveRequest {
	pub query: String,
}

#[derive(Debug, Serialize)]
pub struct RetrieveResponse {
	pub query: String,
	pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
	pub query: String,
	#[serde(default)]
	pub feedback: i32,
}

#[derive(Debug, Deserialize)]
pub struct AdvanceRequest {
	pub rating: i32,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
	pub session_id: Uuid,
	pub recommendation: Option<Recommendation>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}

	fn session_not_found(id: Uuid) -> Self {
		Self::new(StatusCode::NOT_FOUND, "SESSION_NOT_FOUND", format!("Unknown session {id}."))
	}
}

impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		let message = err.to_string();

		match err {
			Error::InvalidRequest { .. } =>
				Self::new(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message),
			Error::InvalidState { .. } => Self::new(StatusCode::CONFLICT, "INVALID_STATE", message),
			Error::TransientBackendFailure { .. } | Error::Provider { .. } | Error::Storage { .. } => {
				tracing::error!(error = %message, "Backend failure.");

				Self::new(StatusCode::SERVICE_UNAVAILABLE, "BACKEND_UNAVAILABLE", message)
			},
			Error::DimensionMismatch { .. } => {
				tracing::error!(error = %message, "Vector dimension mismatch.");

				Self::new(StatusCode::INTERNAL_SERVER_ERROR, "DIMENSION_MISMATCH", message)
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/retrieve", post(retrieve))
		.route("/v1/sessions", post(start_session))
		.route("/v1/sessions/{id}", delete(delete_session))
		.route("/v1/sessions/{id}/start", post(restart_session))
		.route("/v1/sessions/{id}/advance", post(advance_session))
		.route("/v1/sessions/{id}/reset", post(reset_session))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn retrieve(
	State(state): State<AppState>,
	Json(payload): Json<RetrieveRequest>,
) -> Result<Json<RetrieveResponse>, ApiError> {
	let candidates = state.service.retrieve(&payload.query).await?;

	Ok(Json(RetrieveResponse { query: payload.query, candidates }))
}

async fn start_session(
	State(state): State<AppState>,
	Json(payload): Json<StartSessionRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
	let mut session = state.service.new_session()?;
	let recommendation =
		state.service.start_session(&mut session, &payload.query, payload.feedback).await?;
	let session_id = state.sessions.insert(session).await;

	tracing::info!(%session_id, "Session created.");

	Ok(Json(SessionResponse { session_id, recommendation }))
}

/// Re-seeds an existing session, typically after a reset.
async fn restart_session(
	State(state): State<AppState>,
	Path(id): Path<Uuid>,
	Json(payload): Json<StartSessionRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
	let session = lookup(&state, id).await?;
	let mut session = session.lock().await;
	let recommendation =
		state.service.start_session(&mut session, &payload.query, payload.feedback).await?;

	tracing::info!(session_id = %id, "Session restarted.");

	Ok(Json(SessionResponse { session_id: id, recommendation }))
}

async fn advance_session(
	State(state): State<AppState>,
	Path(id): Path<Uuid>,
	Json(payload): Json<AdvanceRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
	let session = lookup(&state, id).await?;
	let mut session = session.lock().await;
	let recommendation = state.service.advance(&mut session, payload.rating)?;

	Ok(Json(SessionResponse { session_id: id, recommendation }))
}

async fn reset_session(
	State(state): State<AppState>,
	Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
	let session = lookup(&state, id).await?;

	state.service.reset_session(&mut *session.lock().await);

	Ok(StatusCode::NO_CONTENT)
}

async fn delete_session(
	State(state): State<AppState>,
	Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
	if !state.sessions.remove(id).await {
		return Err(ApiError::session_not_found(id));
	}

	tracing::info!(session_id = %id, "Session deleted.");

	Ok(StatusCode::NO_CONTENT)
}

async fn lookup(state: &AppState, id: Uuid) -> Result<SharedSession, ApiError> {
	state.sessions.get(id).await.ok_or_else(|| ApiError::session_not_found(id))
}
