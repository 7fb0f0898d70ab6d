use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use tokio::task;

use hireup_db::StoreError;
use hireup_types::api::{CreateConversationRequest, Envelope};

use crate::delivery;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: u32,
}

/// Mutation routes address conversations by numeric id, read routes by
/// public slug; both share the `{conversation}` path segment.
fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::Store(StoreError::ConversationNotFound))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let conversations = task::spawn_blocking(move || db.list_conversations(user.user_id)).await??;
    Ok(Json(Envelope::ok(conversations)))
}

pub async fn infinite_list(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let page =
        task::spawn_blocking(move || db.list_conversations_page(user.user_id, query.page))
            .await??;
    Ok(Json(Envelope::ok(page)))
}

pub async fn archived(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let conversations =
        task::spawn_blocking(move || db.list_archived_conversations(user.user_id)).await??;
    Ok(Json(Envelope::ok(conversations)))
}

/// Start a two-party conversation and deliver its opening message to the
/// other side.
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateConversationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let created = task::spawn_blocking(move || {
        db.create_conversation(user.user_id, req.user_id, &req.content)
    })
    .await??;

    delivery::deliver_sent_message(
        &state.broker,
        &created.recipient_slug,
        created.conversation_slug.clone(),
        created.message.clone(),
    )
    .await;

    Ok((StatusCode::CREATED, Json(Envelope::ok(created.conversation))))
}

pub async fn detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let data = task::spawn_blocking(move || db.get_conversation(user.user_id, &slug)).await??;
    Ok(Json(Envelope::ok(data)))
}

pub async fn messages_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let page =
        task::spawn_blocking(move || db.list_messages(user.user_id, &slug, query.page)).await??;
    Ok(Json(Envelope::ok(page)))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    task::spawn_blocking(move || db.mark_read(user.user_id, &slug)).await??;
    Ok(Json(Envelope::ok("none")))
}

pub async fn archive(
    State(state): State<AppState>,
    Path(conversation): Path<String>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let conversation_id = parse_id(&conversation)?;
    let db = state.db.clone();
    task::spawn_blocking(move || db.archive_conversation(user.user_id, conversation_id)).await??;
    Ok(Json(Envelope::ok("Conversation archived")))
}

pub async fn unarchive(
    State(state): State<AppState>,
    Path(conversation): Path<String>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let conversation_id = parse_id(&conversation)?;
    let db = state.db.clone();
    let summary =
        task::spawn_blocking(move || db.unarchive_conversation(user.user_id, conversation_id))
            .await??;
    Ok(Json(Envelope::ok(summary)))
}
