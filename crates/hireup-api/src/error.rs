use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use hireup_db::StoreError;
use hireup_types::api::Envelope;

const UNKNOWN_ERROR: &str = "An unknown error occurred";

/// Errors surfaced by the HTTP layer. Every variant renders as the
/// `{success: false, error}` envelope with a matching status code.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No session provided")]
    SessionNotProvided,

    #[error("Session not found")]
    SessionNotFound,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::SessionNotProvided | ApiError::SessionNotFound => StatusCode::UNAUTHORIZED,
            ApiError::Store(store) => match store {
                StoreError::ConversationNotFound
                | StoreError::MessageNotFound
                | StoreError::UserNotFound => StatusCode::NOT_FOUND,
                StoreError::PermissionNotFound => StatusCode::FORBIDDEN,
                StoreError::EmptyContent
                | StoreError::InvalidReply
                | StoreError::InvalidRecipient => StatusCode::BAD_REQUEST,
                StoreError::LockPoisoned | StoreError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Unexpected failures are logged server-side and reported with a
        // generic message; domain errors carry their own display string.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Internal error: {}", self);
            UNKNOWN_ERROR.to_string()
        } else {
            self.to_string()
        };

        (status, Json(Envelope::<()>::err(message))).into_response()
    }
}
