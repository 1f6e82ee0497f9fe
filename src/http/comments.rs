use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use tracing::info;

use crate::actor::actor_from_headers;
use crate::domain::comments as comment_ops;
use crate::domain::policy;
use crate::domain::requests as request_ops;
use crate::models::comment::CommentView;
use crate::state::AppState;

use super::HttpError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", delete(delete_comment))
        .route("/{id}/replies", get(get_replies))
        .route("/{id}/approve", post(approve_comment))
        .route("/{id}/pin", post(pin_comment))
        .route("/{id}/unpin", post(unpin_comment))
}

async fn get_replies(
    Path(id): Path<i64>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<Vec<CommentView>>, HttpError> {
    // A thread on a private request must look absent, parent included
    let actor = actor_from_headers(&headers);
    let parent = comment_ops::get_comment(&state.database, id)
        .await
        .map_err(HttpError::from)?;
    let request = request_ops::get_by_id(&state.database, parent.feature_request_id)
        .await
        .map_err(HttpError::from)?;
    if !policy::can_view(&actor, request.is_public, &state.features.permissions) {
        return Err(HttpError::new(
            StatusCode::NOT_FOUND,
            format!("comment {id} not found"),
        ));
    }

    let replies = comment_ops::replies(&state.database, id)
        .await
        .map_err(HttpError::from)?;
    let views = replies.iter().map(CommentView::from_model).collect();
    Ok(Json(views))
}

async fn approve_comment(
    Path(id): Path<i64>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<CommentView>, HttpError> {
    let actor = actor_from_headers(&headers);
    policy::ensure_can_moderate(&actor, &state.features.permissions).map_err(HttpError::from)?;

    let saved = comment_ops::approve_comment(&state.database, id)
        .await
        .map_err(HttpError::from)?;
    state.cache.invalidate_domain();
    info!("Comment {id} approved");

    Ok(Json(CommentView::from_model(&saved)))
}

async fn pin_comment(
    Path(id): Path<i64>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<CommentView>, HttpError> {
    let actor = actor_from_headers(&headers);
    policy::ensure_can_moderate(&actor, &state.features.permissions).map_err(HttpError::from)?;

    let saved = comment_ops::pin_comment(&state.database, id)
        .await
        .map_err(HttpError::from)?;
    state.cache.invalidate_domain();
    Ok(Json(CommentView::from_model(&saved)))
}

async fn unpin_comment(
    Path(id): Path<i64>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<CommentView>, HttpError> {
    let actor = actor_from_headers(&headers);
    policy::ensure_can_moderate(&actor, &state.features.permissions).map_err(HttpError::from)?;

    let saved = comment_ops::unpin_comment(&state.database, id)
        .await
        .map_err(HttpError::from)?;
    state.cache.invalidate_domain();
    Ok(Json(CommentView::from_model(&saved)))
}

async fn delete_comment(
    Path(id): Path<i64>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<StatusCode, HttpError> {
    let actor = actor_from_headers(&headers);

    let existing = comment_ops::get_comment(&state.database, id)
        .await
        .map_err(HttpError::from)?;
    policy::ensure_can_delete_comment(
        &actor,
        existing.author_id.as_deref(),
        &state.features.permissions,
    )
    .map_err(HttpError::from)?;

    comment_ops::delete_comment(&state.database, id)
        .await
        .map_err(HttpError::from)?;
    state.cache.invalidate_domain();
    info!("Comment {id} deleted");

    Ok(StatusCode::NO_CONTENT)
}
