//! Exchange requests API endpoints.

use api_types::request::{
    RequestList, RequestNew, RequestStatus as ApiStatus, RequestView, StatusUpdate,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{CreateRequestCmd, EngineError, ExchangeRequest, RequestStatus};
use uuid::Uuid;

use crate::{
    ServerError,
    server::{ActingUser, ServerState},
};

fn map_status(status: RequestStatus) -> ApiStatus {
    match status {
        RequestStatus::Pending => ApiStatus::Pending,
        RequestStatus::Accepted => ApiStatus::Accepted,
        RequestStatus::Declined => ApiStatus::Declined,
        RequestStatus::Completed => ApiStatus::Completed,
    }
}

fn view(request: ExchangeRequest) -> RequestView {
    RequestView {
        id: request.id,
        requester_id: request.requester_id,
        provider_id: request.provider_id,
        skill: request.skill,
        message: request.message,
        status: map_status(request.status),
        created_at: request.created_at,
        updated_at: request.updated_at,
    }
}

fn list(requests: Vec<ExchangeRequest>) -> RequestList {
    RequestList {
        requests: requests.into_iter().map(view).collect(),
    }
}

pub async fn request_new(
    Extension(ActingUser(user_id)): Extension<ActingUser>,
    State(state): State<ServerState>,
    Json(payload): Json<RequestNew>,
) -> Result<(StatusCode, Json<RequestView>), ServerError> {
    let provider_id = payload.provider_id.trim();
    if provider_id.is_empty() {
        return Err(ServerError::Generic("provider_id is required".to_string()));
    }
    let mut cmd = CreateRequestCmd::new(user_id, provider_id, payload.skill);
    if let Some(message) = payload.message {
        cmd = cmd.message(message);
    }
    let request = state.engine.create_request(cmd).await?;

    Ok((StatusCode::CREATED, Json(view(request))))
}

pub async fn incoming(
    Extension(ActingUser(user_id)): Extension<ActingUser>,
    State(state): State<ServerState>,
) -> Result<Json<RequestList>, ServerError> {
    let requests = state.engine.list_incoming(&user_id).await?;
    Ok(Json(list(requests)))
}

pub async fn outgoing(
    Extension(ActingUser(user_id)): Extension<ActingUser>,
    State(state): State<ServerState>,
) -> Result<Json<RequestList>, ServerError> {
    let requests = state.engine.list_outgoing(&user_id).await?;
    Ok(Json(list(requests)))
}

/// Only the two parties of a request may read it.
pub async fn get(
    Extension(ActingUser(user_id)): Extension<ActingUser>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RequestView>, ServerError> {
    let request = state.engine.request(id).await?;
    if !request.is_participant(&user_id) {
        return Err(EngineError::Unauthorized(format!("not a party to request {id}")).into());
    }

    Ok(Json(view(request)))
}

pub async fn update_status(
    Extension(ActingUser(user_id)): Extension<ActingUser>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusUpdate>,
) -> Result<Json<RequestView>, ServerError> {
    let status: RequestStatus = payload.status.parse()?;
    let request = state.engine.update_status(id, status, &user_id).await?;

    Ok(Json(view(request)))
}
