use axum::{
	Json, Router,
	extract::{
		Query, State,
		rejection::{JsonRejection, QueryRejection},
	},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{auth::Owner, state::AppState};
use sb_service::{
	CreateNoteRequest, CreateNoteResponse, DeleteRequest, DeleteResponse, Error as ServiceError,
	ListRequest, ListResponse, SearchMode, SearchRequest, SearchResponse, TagsRequest,
	TagsResponse,
};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
	pub page: Option<u32>,
	pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
	pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
	pub q: Option<String>,
	pub mode: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchBody {
	pub query: String,
	pub mode: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	notes: Option<Vec<Value>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	empty_notes: bool,
}
impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), empty_notes: false }
	}

	fn invalid_request(message: impl Into<String>) -> Self {
		Self::new(StatusCode::BAD_REQUEST, "invalid_request", message)
	}

	/// Unauthenticated callers get an empty `notes` payload alongside the error.
	pub fn unauthorized() -> Self {
		Self {
			empty_notes: true,
			..Self::new(StatusCode::UNAUTHORIZED, "unauthorized", "Authentication required.")
		}
	}

	pub fn status(&self) -> StatusCode {
		self.status
	}
}
impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match err {
			ServiceError::InvalidRequest { message } => Self::invalid_request(message),
			ServiceError::Enrichment { message } =>
				Self::new(StatusCode::BAD_GATEWAY, "enrichment_failed", message),
			ServiceError::Embedding { message } =>
				Self::new(StatusCode::BAD_GATEWAY, "embedding_failed", message),
			ServiceError::Storage { message } => {
				tracing::error!(error = %message, "Storage request failed.");

				Self::new(
					StatusCode::INTERNAL_SERVER_ERROR,
					"storage_failed",
					"Failed to access note storage.",
				)
			},
		}
	}
}
impl From<JsonRejection> for ApiError {
	fn from(err: JsonRejection) -> Self {
		Self::invalid_request(err.body_text())
	}
}
impl From<QueryRejection> for ApiError {
	fn from(err: QueryRejection) -> Self {
		Self::invalid_request(err.body_text())
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody {
			error_code: self.error_code,
			message: self.message,
			notes: self.empty_notes.then(Vec::new),
		};

		(self.status, Json(body)).into_response()
	}
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/notes", post(create_note).get(list_notes).delete(delete_note))
		.route("/notes/search", get(search_notes))
		.route("/search", post(search))
		.route("/tags", get(tags))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn create_note(
	State(state): State<AppState>,
	Owner(owner_id): Owner,
	payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<CreateNoteResponse>, ApiError> {
	let Json(payload) = payload?;
	let content = match payload.get("content") {
		Some(Value::String(content)) => content.clone(),
		_ => return Err(ApiError::invalid_request("content must be a non-empty string.")),
	};
	let response = state.service.create_note(CreateNoteRequest { owner_id, content }).await?;

	Ok(Json(response))
}

async fn list_notes(
	State(state): State<AppState>,
	Owner(owner_id): Owner,
	query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<ListResponse>, ApiError> {
	let Query(query) = query?;
	let response = state
		.service
		.list(ListRequest { owner_id, page: query.page, limit: query.limit })
		.await?;

	Ok(Json(response))
}

async fn delete_note(
	State(state): State<AppState>,
	Owner(owner_id): Owner,
	query: Result<Query<DeleteQuery>, QueryRejection>,
) -> Result<Json<DeleteResponse>, ApiError> {
	let Query(query) = query?;
	let raw = query.id.unwrap_or_default();
	let id = Uuid::parse_str(raw.trim())
		.map_err(|_| ApiError::invalid_request("id must be a valid UUID."))?;
	let response = state.service.delete(DeleteRequest { owner_id, id }).await?;

	Ok(Json(response))
}

async fn search_notes(
	State(state): State<AppState>,
	Owner(owner_id): Owner,
	query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
	let Query(query) = query?;
	let mode = parse_mode(query.mode.as_deref())?;
	let request = SearchRequest { owner_id, query: query.q.unwrap_or_default(), mode };

	Ok(Json(state.service.search(request).await?))
}

async fn search(
	State(state): State<AppState>,
	Owner(owner_id): Owner,
	payload: Result<Json<SearchBody>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
	let Json(payload) = payload?;
	let mode = parse_mode(payload.mode.as_deref())?;
	let request = SearchRequest { owner_id, query: payload.query, mode };

	Ok(Json(state.service.search(request).await?))
}

async fn tags(
	State(state): State<AppState>,
	Owner(owner_id): Owner,
) -> Result<Json<TagsResponse>, ApiError> {
	let response = state.service.tags(TagsRequest { owner_id }).await?;

	Ok(Json(response))
}

fn parse_mode(raw: Option<&str>) -> Result<SearchMode, ApiError> {
	Ok(raw.map(str::parse::<SearchMode>).transpose()?.unwrap_or_default())
}
