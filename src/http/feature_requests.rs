use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use chrono::DateTime;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::actor::{Actor, actor_from_headers};
use crate::domain::comments as comment_ops;
use crate::domain::policy;
use crate::domain::requests::{
    self, FeatureRequestPatch, NewFeatureRequest, RequestFilters, cache_key, clamp_page,
    clamp_page_size, parse_sort_by, parse_sort_direction,
};
use crate::domain::status::{normalize_status, status_display};
use crate::domain::votes as vote_ops;
use crate::models::comment::{CommentView, PostCommentBody};
use crate::models::feature_request::{
    CreateFeatureRequestBody, FeatureRequestSummary, FeatureRequestView, RoadmapColumn,
    UpdateFeatureRequestBody,
};
use crate::models::vote::{CastVoteBody, CastVoteResponse, RemoveVoteResponse, VoteView};
use crate::state::AppState;

use super::HttpError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_requests).post(create_request))
        .route("/stats", get(get_statistics))
        .route("/roadmap", get(get_roadmap))
        .route("/attention", get(get_attention))
        .route(
            "/{key}",
            get(get_request).patch(update_request).delete(delete_request),
        )
        .route(
            "/{id}/votes",
            get(get_vote_statistics).post(cast_vote).delete(remove_vote),
        )
        .route("/{id}/comments", get(get_comments).post(post_comment))
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ListQuery {
    status: Option<String>,
    category_id: Option<i64>,
    #[serde(alias = "q")]
    search: Option<String>,
    featured: Option<bool>,
    author: Option<String>,
    assignee: Option<String>,
    sort_by: Option<String>,
    sort_direction: Option<String>,
    page: Option<u64>,
    page_size: Option<u64>,
}

async fn list_requests(
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<Value>, HttpError> {
    let actor = actor_from_headers(&headers);

    let mut filters = RequestFilters {
        category_id: query.category_id,
        search: query.search,
        is_featured: query.featured,
        author_id: query.author,
        assignee_id: query.assignee,
        ..RequestFilters::default()
    };
    if let Some(status) = &query.status {
        filters.status = Some(normalize_status(status).map_err(HttpError::from)?.to_string());
    }
    if let Some(sort_by) = &query.sort_by {
        filters.sort_by = parse_sort_by(sort_by).map_err(HttpError::from)?;
    }
    if let Some(direction) = &query.sort_direction {
        filters.sort_direction = parse_sort_direction(direction).map_err(HttpError::from)?;
    }
    // Non-managers only ever see the public listing
    if !policy::can_moderate(&actor, &state.features.permissions) {
        filters.is_public = Some(true);
    }

    let page = clamp_page(query.page);
    let page_size = clamp_page_size(query.page_size, &state.pagination);

    let key = cache_key(&filters, page, page_size);
    if let Some(cached) = state.cache.get(&state.cache.requests, &key).await {
        return Ok(Json(cached));
    }

    let result = requests::list(&state.database, &filters, page, page_size)
        .await
        .map_err(HttpError::from)?;

    let body = serde_json::json!({
        "items": result
            .items
            .iter()
            .map(FeatureRequestSummary::from_model)
            .collect::<Vec<_>>(),
        "total": result.total,
        "page": result.page,
        "page_size": result.page_size,
        "total_pages": result.total_pages,
    });

    state
        .cache
        .insert(&state.cache.requests, key, body.clone())
        .await;
    Ok(Json(body))
}

async fn create_request(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(body): Json<CreateFeatureRequestBody>,
) -> Result<(StatusCode, Json<FeatureRequestView>), HttpError> {
    let actor = actor_from_headers(&headers);
    policy::ensure_can_submit(&actor, &state.features.permissions).map_err(HttpError::from)?;

    let due_date = parse_due_date(body.due_date.as_deref())?;
    let new = NewFeatureRequest {
        title: body.title,
        description: body.description,
        additional_info: body.additional_info,
        priority: body.priority,
        category_id: body.category_id,
        due_date,
        estimated_effort: body.estimated_effort,
        tags: body.tags,
        is_public: body.is_public,
    };

    let saved = requests::create(&state.database, &actor, new)
        .await
        .map_err(HttpError::from)?;
    state.cache.invalidate_domain();
    info!("Feature request {} created by {}", saved.id, saved.author_id);

    let view = FeatureRequestView::from_model(&saved, &state.features);
    Ok((StatusCode::CREATED, Json(view)))
}

async fn get_request(
    Path(key): Path<String>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<FeatureRequestView>, HttpError> {
    let actor = actor_from_headers(&headers);

    let mut model = requests::get_by_key(&state.database, &key)
        .await
        .map_err(HttpError::from)?;

    if !policy::can_view(&actor, model.is_public, &state.features.permissions) {
        return Err(HttpError::new(
            StatusCode::NOT_FOUND,
            format!("feature request '{key}' not found"),
        ));
    }

    requests::record_view(&state.database, model.id)
        .await
        .map_err(HttpError::from)?;
    model.view_count += 1;

    let mut view = FeatureRequestView::from_model(&model, &state.features);
    if let Some(voter_id) = actor.id.as_deref() {
        let user_vote = vote_ops::find_vote(&state.database, model.id, voter_id)
            .await
            .map_err(HttpError::from)?;
        view.has_voted = Some(user_vote.is_some());
        view.user_vote = user_vote.as_ref().map(VoteView::from_model);
    }

    Ok(Json(view))
}

async fn update_request(
    Path(key): Path<String>,
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(body): Json<UpdateFeatureRequestBody>,
) -> Result<Json<FeatureRequestView>, HttpError> {
    let actor = actor_from_headers(&headers);
    let request_id = parse_id(&key)?;

    let existing = requests::get_by_id(&state.database, request_id)
        .await
        .map_err(HttpError::from)?;
    policy::ensure_can_edit(&actor, Some(&existing.author_id), &state.features.permissions)
        .map_err(HttpError::from)?;

    // Status, assignment, featuring, and visibility are triage concerns
    let is_manager = policy::can_moderate(&actor, &state.features.permissions);
    if !is_manager
        && (body.status.is_some()
            || body.assignee_id.is_some()
            || body.is_featured.is_some()
            || body.due_date.is_some())
    {
        return Err(HttpError::new(
            StatusCode::FORBIDDEN,
            "triage fields require the manage capability".to_string(),
        ));
    }

    let due_date = match body.due_date {
        Some(Some(raw)) => Some(parse_due_date(Some(&raw))?),
        Some(None) => Some(None),
        None => None,
    };

    let patch = FeatureRequestPatch {
        title: body.title,
        description: body.description,
        additional_info: body.additional_info,
        status: body.status,
        priority: body.priority,
        category_id: body.category_id,
        assignee_id: body.assignee_id,
        due_date,
        estimated_effort: body.estimated_effort,
        tags: body.tags,
        is_public: body.is_public,
        is_featured: body.is_featured,
    };

    let saved = requests::update(&state.database, request_id, patch)
        .await
        .map_err(HttpError::from)?;
    state.cache.invalidate_domain();

    Ok(Json(FeatureRequestView::from_model(&saved, &state.features)))
}

async fn delete_request(
    Path(key): Path<String>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<StatusCode, HttpError> {
    let actor = actor_from_headers(&headers);
    let request_id = parse_id(&key)?;

    let existing = requests::get_by_id(&state.database, request_id)
        .await
        .map_err(HttpError::from)?;
    policy::ensure_can_delete(&actor, Some(&existing.author_id), &state.features.permissions)
        .map_err(HttpError::from)?;

    requests::soft_delete(&state.database, request_id)
        .await
        .map_err(HttpError::from)?;
    state.cache.invalidate_domain();
    info!("Feature request {request_id} soft-deleted");

    Ok(StatusCode::NO_CONTENT)
}

async fn get_statistics(State(state): State<AppState>) -> Result<Json<Value>, HttpError> {
    let key = "stats";
    if let Some(cached) = state.cache.get(&state.cache.statistics, key).await {
        return Ok(Json(cached));
    }

    let stats = requests::statistics(&state.database)
        .await
        .map_err(HttpError::from)?;
    let body = serde_json::to_value(&stats)
        .map_err(|err| HttpError::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;

    state
        .cache
        .insert(&state.cache.statistics, key.to_string(), body.clone())
        .await;
    Ok(Json(body))
}

async fn get_roadmap(State(state): State<AppState>) -> Result<Json<Value>, HttpError> {
    let key = "roadmap";
    if let Some(cached) = state.cache.get(&state.cache.statistics, key).await {
        return Ok(Json(cached));
    }

    let buckets = requests::roadmap(&state.database)
        .await
        .map_err(HttpError::from)?;
    let columns = buckets
        .iter()
        .map(|bucket| {
            let (label, color, _) = status_display(bucket.status);
            RoadmapColumn {
                status: bucket.status.to_string(),
                status_label: label.to_string(),
                status_color: color.to_string(),
                count: bucket.items.len(),
                items: bucket
                    .items
                    .iter()
                    .map(FeatureRequestSummary::from_model)
                    .collect(),
            }
        })
        .collect::<Vec<_>>();

    let body = serde_json::to_value(&columns)
        .map_err(|err| HttpError::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;
    state
        .cache
        .insert(&state.cache.statistics, key.to_string(), body.clone())
        .await;
    Ok(Json(body))
}

async fn get_attention(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<Value>, HttpError> {
    let actor = actor_from_headers(&headers);
    policy::ensure_can_moderate(&actor, &state.features.permissions).map_err(HttpError::from)?;

    let key = "attention";
    if let Some(cached) = state.cache.get(&state.cache.statistics, key).await {
        return Ok(Json(cached));
    }

    let rows = requests::needing_attention(&state.database)
        .await
        .map_err(HttpError::from)?;
    let summaries = rows
        .iter()
        .map(FeatureRequestSummary::from_model)
        .collect::<Vec<_>>();

    let body = serde_json::to_value(&summaries)
        .map_err(|err| HttpError::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;
    state
        .cache
        .insert(&state.cache.statistics, key.to_string(), body.clone())
        .await;
    Ok(Json(body))
}

async fn cast_vote(
    Path(id): Path<i64>,
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(body): Json<CastVoteBody>,
) -> Result<Json<CastVoteResponse>, HttpError> {
    let actor = actor_from_headers(&headers);
    if !actor.is_anonymous() {
        policy::ensure_can_vote(&actor, &state.features.permissions).map_err(HttpError::from)?;
    }
    ensure_visible(&state, &actor, id).await?;

    let saved = vote_ops::cast_vote(
        &state.database,
        &state.features,
        id,
        &actor,
        &body.vote_type,
        body.comment,
    )
    .await
    .map_err(HttpError::from)?;
    state.cache.invalidate_domain();

    let statistics = vote_ops::vote_statistics(&state.database, id)
        .await
        .map_err(HttpError::from)?;
    info!(
        "Vote {} on feature request {id} by {}",
        saved.vote_type, saved.voter_id
    );

    Ok(Json(CastVoteResponse {
        vote: VoteView::from_model(&saved),
        statistics,
    }))
}

async fn remove_vote(
    Path(id): Path<i64>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<RemoveVoteResponse>, HttpError> {
    let actor = actor_from_headers(&headers);
    ensure_visible(&state, &actor, id).await?;

    let removed = vote_ops::remove_vote(&state.database, &state.features, id, &actor)
        .await
        .map_err(HttpError::from)?;
    if removed {
        state.cache.invalidate_domain();
    }

    let statistics = vote_ops::vote_statistics(&state.database, id)
        .await
        .map_err(HttpError::from)?;
    Ok(Json(RemoveVoteResponse {
        removed,
        statistics,
    }))
}

async fn get_vote_statistics(
    Path(id): Path<i64>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<vote_ops::VoteStatistics>, HttpError> {
    let actor = actor_from_headers(&headers);
    ensure_visible(&state, &actor, id).await?;

    let statistics = vote_ops::vote_statistics(&state.database, id)
        .await
        .map_err(HttpError::from)?;
    Ok(Json(statistics))
}

async fn get_comments(
    Path(id): Path<i64>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<Vec<CommentView>>, HttpError> {
    // 404s before listing so a deleted or hidden request never shows an
    // empty thread
    let actor = actor_from_headers(&headers);
    ensure_visible(&state, &actor, id).await?;

    let comments = comment_ops::top_level(&state.database, id)
        .await
        .map_err(HttpError::from)?;
    let views = comments.iter().map(CommentView::from_model).collect();
    Ok(Json(views))
}

async fn post_comment(
    Path(id): Path<i64>,
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(body): Json<PostCommentBody>,
) -> Result<(StatusCode, Json<CommentView>), HttpError> {
    let actor = actor_from_headers(&headers);
    if !actor.is_anonymous() {
        policy::ensure_can_comment(&actor, &state.features.permissions).map_err(HttpError::from)?;
    }
    ensure_visible(&state, &actor, id).await?;

    let saved = comment_ops::post_comment(
        &state.database,
        &state.features,
        id,
        &actor,
        &body.content,
        body.parent_id,
    )
    .await
    .map_err(HttpError::from)?;
    state.cache.invalidate_domain();

    Ok((StatusCode::CREATED, Json(CommentView::from_model(&saved))))
}

/// Visibility gate shared by every `{id}` subresource handler; a private
/// request must look absent through its votes and comments too.
async fn ensure_visible(
    state: &AppState,
    actor: &Actor,
    request_id: i64,
) -> Result<(), HttpError> {
    let model = requests::get_by_id(&state.database, request_id)
        .await
        .map_err(HttpError::from)?;
    if !policy::can_view(actor, model.is_public, &state.features.permissions) {
        return Err(HttpError::new(
            StatusCode::NOT_FOUND,
            format!("feature request {request_id} not found"),
        ));
    }
    Ok(())
}

fn parse_id(key: &str) -> Result<i64, HttpError> {
    key.parse::<i64>().map_err(|_| {
        HttpError::new(
            StatusCode::BAD_REQUEST,
            "identifier must be numeric".to_string(),
        )
    })
}

fn parse_due_date(
    raw: Option<&str>,
) -> Result<Option<chrono::DateTime<chrono::FixedOffset>>, HttpError> {
    match raw {
        None => Ok(None),
        Some(value) => {
            let parsed = DateTime::parse_from_rfc3339(value.trim()).map_err(|err| {
                HttpError::new(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    format!("due_date must be RFC 3339: {err}"),
                )
            })?;
            Ok(Some(parsed))
        }
    }
}
