use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
pub use server::{ActingUser, ServerState, router, run_with_listener};

mod accounts;
mod requests;
mod server;
mod transfers;

pub mod types {
    pub mod account {
        pub use api_types::account::{AccountView, Balance};
    }

    pub mod transfer {
        pub use api_types::transfer::TransferNew;
    }

    pub mod request {
        pub use api_types::request::{
            RequestList, RequestNew, RequestStatus, RequestView, StatusUpdate,
        };
    }
}

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    if err.is_retryable() {
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    match err {
        EngineError::Unauthorized(_) => StatusCode::FORBIDDEN,
        EngineError::AccountNotFound(_)
        | EngineError::RequestNotFound(_)
        | EngineError::UnknownUser(_) => StatusCode::NOT_FOUND,
        EngineError::AccountAlreadyExists(_)
        | EngineError::AlreadyTerminal(_)
        | EngineError::InvalidTransition { .. } => StatusCode::CONFLICT,
        EngineError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::InconsistentCompletion { .. } | EngineError::Database(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        EngineError::InvalidAmount(_)
        | EngineError::SelfTransfer(_)
        | EngineError::InsufficientFunds(_)
        | EngineError::SelfRequest
        | EngineError::InvalidSkill(_)
        | EngineError::InvalidStatus(_)
        | EngineError::CompletionFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        // Already logged by the engine for reconciliation.
        EngineError::InconsistentCompletion { request_id, .. } => {
            format!("request {request_id} needs manual reconciliation")
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (
                status_for_engine_error(&err),
                message_for_engine_error(err),
            ),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

#[cfg(test)]
mod tests {
    use engine::RequestStatus;

    use super::*;

    #[test]
    fn engine_unauthorized_maps_to_403() {
        let res =
            ServerError::from(EngineError::Unauthorized("nope".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn engine_not_found_maps_to_404() {
        let res =
            ServerError::from(EngineError::RequestNotFound("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn engine_terminal_maps_to_409() {
        let res = ServerError::from(EngineError::AlreadyTerminal(RequestStatus::Completed))
            .into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn engine_completion_failure_maps_to_422() {
        let err = EngineError::CompletionFailed(Box::new(EngineError::InsufficientFunds(
            "alice".to_string(),
        )));
        let res = ServerError::from(err).into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn engine_timeout_maps_to_503() {
        let res = ServerError::from(EngineError::Timeout("lock".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn completion_timeout_maps_to_503() {
        let err = EngineError::CompletionFailed(Box::new(EngineError::Timeout(
            "account lock".to_string(),
        )));
        let res = ServerError::from(err).into_response();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn generic_maps_to_400() {
        let res = ServerError::Generic("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
