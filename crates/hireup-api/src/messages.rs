use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use tokio::task;

use hireup_db::StoreError;
use hireup_types::api::{Envelope, SendMessageRequest};

use crate::delivery;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::state::AppState;

/// Commit a message, then hand it to the delivery coordinator. The
/// response reports the durable write; live delivery is best-effort and
/// cannot fail it.
pub async fn send(
    State(state): State<AppState>,
    Path(conversation): Path<String>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let conversation_id: i64 = conversation
        .parse()
        .map_err(|_| ApiError::Store(StoreError::ConversationNotFound))?;

    let db = state.db.clone();
    let sent = task::spawn_blocking(move || {
        db.send_message(user.user_id, conversation_id, &req.content, req.reply_id)
    })
    .await??;

    delivery::deliver_sent_message(
        &state.broker,
        &sent.recipient_slug,
        sent.conversation_slug,
        sent.message.clone(),
    )
    .await;

    Ok((StatusCode::CREATED, Json(Envelope::ok(sent.message))))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(message_id): Path<i64>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    task::spawn_blocking(move || db.delete_message(user.user_id, message_id)).await??;
    Ok(Json(Envelope::ok("Message deleted")))
}
