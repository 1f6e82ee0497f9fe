use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::actor::actor_from_headers;
use crate::domain::categories as category_ops;
use crate::domain::categories::{CategoryPatch, NewCategory};
use crate::domain::policy;
use crate::models::category::{CategoryView, CreateCategoryBody, UpdateCategoryBody};
use crate::state::AppState;

use super::HttpError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route(
            "/{id}",
            get(get_category)
                .patch(update_category)
                .delete(delete_category),
        )
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ListCategoriesQuery {
    include_inactive: bool,
}

async fn list_categories(
    Query(query): Query<ListCategoriesQuery>,
    State(state): State<AppState>,
) -> Result<Json<Value>, HttpError> {
    let key = format!("categories:inactive={}", query.include_inactive);
    if let Some(cached) = state.cache.get(&state.cache.categories, &key).await {
        return Ok(Json(cached));
    }

    let categories = category_ops::list(&state.database, !query.include_inactive)
        .await
        .map_err(HttpError::from)?;
    let views = categories.iter().map(CategoryView::from_model).collect::<Vec<_>>();

    let body = serde_json::to_value(&views)
        .map_err(|err| HttpError::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;
    state
        .cache
        .insert(&state.cache.categories, key, body.clone())
        .await;
    Ok(Json(body))
}

async fn get_category(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<CategoryView>, HttpError> {
    let category = category_ops::get(&state.database, id)
        .await
        .map_err(HttpError::from)?;
    Ok(Json(CategoryView::from_model(&category)))
}

async fn create_category(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(body): Json<CreateCategoryBody>,
) -> Result<(StatusCode, Json<CategoryView>), HttpError> {
    let actor = actor_from_headers(&headers);
    policy::ensure_can_moderate(&actor, &state.features.permissions).map_err(HttpError::from)?;

    let saved = category_ops::create(
        &state.database,
        NewCategory {
            name: body.name,
            description: body.description,
            color: body.color,
            sort_order: body.sort_order,
        },
    )
    .await
    .map_err(HttpError::from)?;
    state.cache.invalidate_domain();
    info!("Category {} created", saved.id);

    Ok((StatusCode::CREATED, Json(CategoryView::from_model(&saved))))
}

async fn update_category(
    Path(id): Path<i64>,
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(body): Json<UpdateCategoryBody>,
) -> Result<Json<CategoryView>, HttpError> {
    let actor = actor_from_headers(&headers);
    policy::ensure_can_moderate(&actor, &state.features.permissions).map_err(HttpError::from)?;

    let patch = CategoryPatch {
        name: body.name,
        description: body.description.map(Some),
        color: body.color.map(Some),
        is_active: body.is_active,
        sort_order: body.sort_order,
    };
    let saved = category_ops::update(&state.database, id, patch)
        .await
        .map_err(HttpError::from)?;
    state.cache.invalidate_domain();

    Ok(Json(CategoryView::from_model(&saved)))
}

async fn delete_category(
    Path(id): Path<i64>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<StatusCode, HttpError> {
    let actor = actor_from_headers(&headers);
    policy::ensure_can_moderate(&actor, &state.features.permissions).map_err(HttpError::from)?;

    category_ops::delete(&state.database, id)
        .await
        .map_err(HttpError::from)?;
    state.cache.invalidate_domain();
    info!("Category {id} deleted; feature requests detached");

    Ok(StatusCode::NO_CONTENT)
}
