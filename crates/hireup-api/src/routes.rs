use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use crate::middleware::require_session;
use crate::state::AppState;
use crate::{conversations, messages};

/// The conversation API surface. Every route sits behind the session
/// middleware.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/conversations",
            get(conversations::list).post(conversations::create),
        )
        .route(
            "/conversations/infinite-list",
            get(conversations::infinite_list),
        )
        .route("/conversations/archived", get(conversations::archived))
        .route("/conversations/{conversation}", get(conversations::detail))
        .route(
            "/conversations/{conversation}/messages",
            get(conversations::messages_page).post(messages::send),
        )
        .route(
            "/conversations/{conversation}/read",
            post(conversations::mark_read),
        )
        .route(
            "/conversations/{conversation}/archive",
            post(conversations::archive),
        )
        .route(
            "/conversations/{conversation}/unarchive",
            post(conversations::unarchive),
        )
        .route("/messages/{id}", delete(messages::delete))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ))
        .with_state(state)
}
