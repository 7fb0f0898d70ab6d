use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use hireup_types::models::AccountType;

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated caller, injected as a request extension by
/// [`require_session`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: i64,
    pub slug: String,
    pub account_type: AccountType,
}

/// Resolve the bearer session token against the session store and inject
/// the current user. Missing or unresolvable tokens fail with the 401
/// error envelope; nothing downstream runs.
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned)
        .ok_or(ApiError::SessionNotProvided)?;

    let db = state.db.clone();
    let session = tokio::task::spawn_blocking(move || db.get_session(&token))
        .await??
        .ok_or(ApiError::SessionNotFound)?;

    req.extensions_mut().insert(CurrentUser {
        user_id: session.user_id,
        slug: session.user_slug,
        account_type: session.account_type,
    });
    Ok(next.run(req).await)
}
