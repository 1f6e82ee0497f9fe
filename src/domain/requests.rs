//! Feature request CRUD, filtering, and aggregate views.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, Condition, DatabaseConnection, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select,
};
use serde::Serialize;
use serde_json::json;

use crate::actor::Actor;
use crate::config::PaginationConfig;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::slug::{slug_candidate, slugify};
use crate::domain::status::{
    STATUS_IN_PROGRESS, STATUS_PENDING, STATUS_UNDER_REVIEW, normalize_priority, normalize_status,
};
use crate::entities::feature_request;

pub const MAX_TITLE_LEN: usize = 256;
pub const MAX_DESCRIPTION_LEN: usize = 10_000;
pub const MAX_TAGS: usize = 20;
pub const MAX_TAG_LEN: usize = 48;
const MAX_SLUG_ATTEMPTS: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    CreatedAt,
    Votes,
    Title,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

pub fn parse_sort_by(value: &str) -> DomainResult<SortBy> {
    match value.trim().to_ascii_lowercase().as_str() {
        "created_at" | "recent" => Ok(SortBy::CreatedAt),
        "votes" | "vote_count" => Ok(SortBy::Votes),
        "title" => Ok(SortBy::Title),
        "status" => Ok(SortBy::Status),
        other => Err(DomainError::validation(
            "sort_by",
            format!("unknown sort key '{other}'"),
        )),
    }
}

pub fn parse_sort_direction(value: &str) -> DomainResult<SortDirection> {
    match value.trim().to_ascii_lowercase().as_str() {
        "asc" => Ok(SortDirection::Asc),
        "desc" => Ok(SortDirection::Desc),
        other => Err(DomainError::validation(
            "sort_direction",
            format!("unknown sort direction '{other}'"),
        )),
    }
}

/// Optional constraints ANDed together; absent fields impose nothing.
#[derive(Debug, Clone, Default)]
pub struct RequestFilters {
    pub status: Option<String>,
    pub category_id: Option<i64>,
    pub search: Option<String>,
    pub is_public: Option<bool>,
    pub is_featured: Option<bool>,
    pub author_id: Option<String>,
    pub assignee_id: Option<String>,
    pub sort_by: SortBy,
    pub sort_direction: SortDirection,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStatistics {
    pub total: u64,
    pub by_status: Vec<StatusCount>,
    pub featured: u64,
    pub public: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: u64,
}

#[derive(Debug, Clone)]
pub struct RoadmapBucket {
    pub status: &'static str,
    pub items: Vec<feature_request::Model>,
}

/// Hard ceiling on the page number; keeps the offset multiplication far
/// from u64 overflow for any permitted page size.
pub const MAX_PAGE: u64 = 1_000_000;

pub fn clamp_page(requested: Option<u64>) -> u64 {
    requested.unwrap_or(1).clamp(1, MAX_PAGE)
}

pub fn clamp_page_size(requested: Option<u64>, pagination: &PaginationConfig) -> u64 {
    let size = requested.unwrap_or(pagination.default_page_size);
    size.clamp(1, pagination.max_page_size)
}

/// Stable cache key for a filter set + page. Same filters, same key.
pub fn cache_key(filters: &RequestFilters, page: u64, page_size: u64) -> String {
    format!(
        "list:s={}|c={}|q={}|p={}|f={}|a={}|g={}|sb={:?}|sd={:?}|pg={page}|ps={page_size}",
        filters.status.as_deref().unwrap_or("-"),
        filters
            .category_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string()),
        filters.search.as_deref().unwrap_or("-"),
        filters
            .is_public
            .map(|b| b.to_string())
            .unwrap_or_else(|| "-".to_string()),
        filters
            .is_featured
            .map(|b| b.to_string())
            .unwrap_or_else(|| "-".to_string()),
        filters.author_id.as_deref().unwrap_or("-"),
        filters.assignee_id.as_deref().unwrap_or("-"),
        filters.sort_by,
        filters.sort_direction,
    )
}

/// Lowercased haystack for substring search across title, description, and
/// tags. Maintained on every write so listing queries stay a single LIKE.
pub fn build_search_text(title: &str, description: &str, tags: &[String]) -> String {
    let mut text = String::with_capacity(title.len() + description.len() + 32);
    text.push_str(&title.to_lowercase());
    text.push(' ');
    text.push_str(&description.to_lowercase());
    for tag in tags {
        text.push(' ');
        text.push_str(&tag.to_lowercase());
    }
    text
}

fn live() -> Select<feature_request::Entity> {
    feature_request::Entity::find().filter(feature_request::Column::DeletedAt.is_null())
}

fn apply_filters(
    mut select: Select<feature_request::Entity>,
    filters: &RequestFilters,
) -> Select<feature_request::Entity> {
    if let Some(status) = &filters.status {
        select = select.filter(feature_request::Column::Status.eq(status.clone()));
    }
    if let Some(category_id) = filters.category_id {
        select = select.filter(feature_request::Column::CategoryId.eq(category_id));
    }
    if let Some(search) = &filters.search {
        let needle = search.trim().to_lowercase();
        if !needle.is_empty() {
            select = select.filter(feature_request::Column::SearchText.contains(&needle));
        }
    }
    if let Some(is_public) = filters.is_public {
        select = select.filter(feature_request::Column::IsPublic.eq(is_public));
    }
    if let Some(is_featured) = filters.is_featured {
        select = select.filter(feature_request::Column::IsFeatured.eq(is_featured));
    }
    if let Some(author_id) = &filters.author_id {
        select = select.filter(feature_request::Column::AuthorId.eq(author_id.clone()));
    }
    if let Some(assignee_id) = &filters.assignee_id {
        select = select.filter(feature_request::Column::AssigneeId.eq(assignee_id.clone()));
    }
    select
}

fn apply_sort(
    select: Select<feature_request::Entity>,
    sort_by: SortBy,
    direction: SortDirection,
) -> Select<feature_request::Entity> {
    let order = match direction {
        SortDirection::Asc => Order::Asc,
        SortDirection::Desc => Order::Desc,
    };
    let sorted = match sort_by {
        SortBy::CreatedAt => select.order_by(feature_request::Column::CreatedAt, order),
        SortBy::Votes => select.order_by(feature_request::Column::VoteCount, order),
        SortBy::Title => select.order_by(feature_request::Column::Title, order),
        SortBy::Status => select.order_by(feature_request::Column::Status, order),
    };
    // Ascending id tie-break keeps pagination stable under non-unique keys
    sorted.order_by(feature_request::Column::Id, Order::Asc)
}

pub async fn list(
    db: &DatabaseConnection,
    filters: &RequestFilters,
    page: u64,
    page_size: u64,
) -> DomainResult<Page<feature_request::Model>> {
    assert!(page >= 1, "Pages are 1-based");
    assert!(page <= MAX_PAGE, "Page exceeds supported range");
    assert!(page_size >= 1, "Page size must be positive");

    let filtered = apply_filters(live(), filters);
    let total = filtered.clone().count(db).await?;

    let items = apply_sort(filtered, filters.sort_by, filters.sort_direction)
        .limit(page_size)
        .offset((page - 1) * page_size)
        .all(db)
        .await?;

    assert!(items.len() as u64 <= page_size, "Returned more rows than requested");

    Ok(Page {
        items,
        total,
        page,
        page_size,
        total_pages: total.div_ceil(page_size),
    })
}

/// Per-status totals from one grouped query, plus featured/public counts.
pub async fn statistics(db: &DatabaseConnection) -> DomainResult<DashboardStatistics> {
    let grouped: Vec<(String, i64)> = feature_request::Entity::find()
        .select_only()
        .column(feature_request::Column::Status)
        .column_as(feature_request::Column::Id.count(), "count")
        .filter(feature_request::Column::DeletedAt.is_null())
        .group_by(feature_request::Column::Status)
        .into_tuple()
        .all(db)
        .await?;

    let mut by_status = Vec::with_capacity(grouped.len());
    let mut total = 0u64;
    for (status, count) in grouped {
        assert!(count >= 0, "Grouped count cannot be negative");
        total += count as u64;
        by_status.push(StatusCount {
            status,
            count: count as u64,
        });
    }
    by_status.sort_by(|a, b| a.status.cmp(&b.status));

    let featured = live()
        .filter(feature_request::Column::IsFeatured.eq(true))
        .count(db)
        .await?;
    let public = live()
        .filter(feature_request::Column::IsPublic.eq(true))
        .count(db)
        .await?;

    Ok(DashboardStatistics {
        total,
        by_status,
        featured,
        public,
    })
}

/// Kanban buckets: one fetch across the three roadmap statuses,
/// partitioned in memory.
pub async fn roadmap(db: &DatabaseConnection) -> DomainResult<Vec<RoadmapBucket>> {
    const BUCKETS: [&str; 3] = [STATUS_PENDING, STATUS_UNDER_REVIEW, STATUS_IN_PROGRESS];

    let rows = live()
        .filter(feature_request::Column::Status.is_in(BUCKETS))
        .order_by(feature_request::Column::VoteCount, Order::Desc)
        .order_by(feature_request::Column::Id, Order::Asc)
        .all(db)
        .await?;

    let mut buckets: Vec<RoadmapBucket> = BUCKETS
        .iter()
        .map(|status| RoadmapBucket {
            status,
            items: Vec::new(),
        })
        .collect();
    for row in rows {
        if let Some(bucket) = buckets.iter_mut().find(|b| b.status == row.status) {
            bucket.items.push(row);
        }
    }
    Ok(buckets)
}

/// Triage backlog: early-lifecycle requests that are unassigned or past
/// their due date.
pub async fn needing_attention(
    db: &DatabaseConnection,
) -> DomainResult<Vec<feature_request::Model>> {
    let now = Utc::now().fixed_offset();
    let rows = live()
        .filter(
            feature_request::Column::Status.is_in([STATUS_PENDING, STATUS_UNDER_REVIEW]),
        )
        .filter(
            Condition::any()
                .add(feature_request::Column::AssigneeId.is_null())
                .add(feature_request::Column::DueDate.lt(now)),
        )
        .order_by(feature_request::Column::CreatedAt, Order::Asc)
        .order_by(feature_request::Column::Id, Order::Asc)
        .all(db)
        .await?;
    Ok(rows)
}

#[derive(Debug, Clone, Default)]
pub struct NewFeatureRequest {
    pub title: String,
    pub description: String,
    pub additional_info: Option<String>,
    pub priority: Option<String>,
    pub category_id: Option<i64>,
    pub due_date: Option<chrono::DateTime<chrono::FixedOffset>>,
    pub estimated_effort: Option<String>,
    pub tags: Vec<String>,
    pub is_public: Option<bool>,
}

pub async fn create(
    db: &DatabaseConnection,
    actor: &Actor,
    new: NewFeatureRequest,
) -> DomainResult<feature_request::Model> {
    let author_id = actor
        .id
        .clone()
        .ok_or_else(|| DomainError::forbidden("authentication required to submit"))?;

    let title = validate_title(&new.title)?;
    let description = validate_description(&new.description)?;
    let tags = validate_tags(new.tags)?;
    let priority = match &new.priority {
        Some(value) => normalize_priority(value)?,
        None => crate::domain::status::PRIORITY_MEDIUM,
    };

    let slug = allocate_slug(db, &title).await?;
    let now = Utc::now().fixed_offset();
    let search_text = build_search_text(&title, &description, &tags);

    let active = feature_request::ActiveModel {
        id: ActiveValue::NotSet,
        slug: ActiveValue::Set(slug),
        title: ActiveValue::Set(title),
        description: ActiveValue::Set(description),
        additional_info: ActiveValue::Set(trimmed_opt(new.additional_info)),
        status: ActiveValue::Set(STATUS_PENDING.to_string()),
        priority: ActiveValue::Set(priority.to_string()),
        category_id: ActiveValue::Set(new.category_id),
        author_id: ActiveValue::Set(author_id),
        assignee_id: ActiveValue::Set(None),
        due_date: ActiveValue::Set(new.due_date),
        estimated_effort: ActiveValue::Set(trimmed_opt(new.estimated_effort)),
        tags: ActiveValue::Set(json!(tags)),
        search_text: ActiveValue::Set(search_text),
        is_public: ActiveValue::Set(new.is_public.unwrap_or(true)),
        is_featured: ActiveValue::Set(false),
        vote_count: ActiveValue::Set(0),
        up_votes: ActiveValue::Set(0),
        down_votes: ActiveValue::Set(0),
        comment_count: ActiveValue::Set(0),
        view_count: ActiveValue::Set(0),
        deleted_at: ActiveValue::Set(None),
        created_at: ActiveValue::Set(now),
        updated_at: ActiveValue::Set(now),
    };
    let saved = active.insert(db).await?;
    Ok(saved)
}

#[derive(Debug, Clone, Default)]
pub struct FeatureRequestPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub additional_info: Option<Option<String>>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category_id: Option<Option<i64>>,
    pub assignee_id: Option<Option<String>>,
    pub due_date: Option<Option<chrono::DateTime<chrono::FixedOffset>>>,
    pub estimated_effort: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
    pub is_featured: Option<bool>,
}

/// Applies a partial update. The slug stays stable even when the title
/// changes; search_text follows the new content.
pub async fn update(
    db: &DatabaseConnection,
    request_id: i64,
    patch: FeatureRequestPatch,
) -> DomainResult<feature_request::Model> {
    let existing = get_by_id(db, request_id).await?;

    let title = match &patch.title {
        Some(value) => validate_title(value)?,
        None => existing.title.clone(),
    };
    let description = match &patch.description {
        Some(value) => validate_description(value)?,
        None => existing.description.clone(),
    };
    let tags = match patch.tags {
        Some(raw) => validate_tags(raw)?,
        None => decode_tags(&existing.tags),
    };
    let search_text = build_search_text(&title, &description, &tags);

    let mut active: feature_request::ActiveModel = existing.into();
    active.title = ActiveValue::Set(title);
    active.description = ActiveValue::Set(description);
    active.tags = ActiveValue::Set(json!(tags));
    active.search_text = ActiveValue::Set(search_text);
    if let Some(value) = patch.status {
        active.status = ActiveValue::Set(normalize_status(&value)?.to_string());
    }
    if let Some(value) = patch.priority {
        active.priority = ActiveValue::Set(normalize_priority(&value)?.to_string());
    }
    if let Some(value) = patch.additional_info {
        active.additional_info = ActiveValue::Set(trimmed_opt(value));
    }
    if let Some(value) = patch.category_id {
        active.category_id = ActiveValue::Set(value);
    }
    if let Some(value) = patch.assignee_id {
        active.assignee_id = ActiveValue::Set(value.and_then(|v| trimmed_opt(Some(v))));
    }
    if let Some(value) = patch.due_date {
        active.due_date = ActiveValue::Set(value);
    }
    if let Some(value) = patch.estimated_effort {
        active.estimated_effort = ActiveValue::Set(trimmed_opt(value));
    }
    if let Some(value) = patch.is_public {
        active.is_public = ActiveValue::Set(value);
    }
    if let Some(value) = patch.is_featured {
        active.is_featured = ActiveValue::Set(value);
    }
    active.updated_at = ActiveValue::Set(Utc::now().fixed_offset());

    let saved = active.update(db).await?;
    Ok(saved)
}

pub async fn get_by_id(
    db: &DatabaseConnection,
    request_id: i64,
) -> DomainResult<feature_request::Model> {
    live()
        .filter(feature_request::Column::Id.eq(request_id))
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("feature request {request_id}")))
}

/// Fetch by numeric id or slug. Listing pages link by slug; internal
/// references use the id.
pub async fn get_by_key(
    db: &DatabaseConnection,
    key: &str,
) -> DomainResult<feature_request::Model> {
    if let Ok(id) = key.parse::<i64>() {
        return get_by_id(db, id).await;
    }
    live()
        .filter(feature_request::Column::Slug.eq(key.to_owned()))
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("feature request '{key}'")))
}

/// Atomic in-store increment; a read-modify-write here would drop
/// concurrent views.
pub async fn record_view(db: &DatabaseConnection, request_id: i64) -> DomainResult<()> {
    feature_request::Entity::update_many()
        .col_expr(
            feature_request::Column::ViewCount,
            Expr::col(feature_request::Column::ViewCount).add(1),
        )
        .filter(feature_request::Column::Id.eq(request_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Tombstones the request. The row and its votes/comments remain in the
/// store but leave every standard listing and aggregate.
pub async fn soft_delete(db: &DatabaseConnection, request_id: i64) -> DomainResult<()> {
    let existing = get_by_id(db, request_id).await?;
    let now = Utc::now().fixed_offset();
    let mut active: feature_request::ActiveModel = existing.into();
    active.deleted_at = ActiveValue::Set(Some(now));
    active.updated_at = ActiveValue::Set(now);
    active.update(db).await?;
    Ok(())
}

pub fn decode_tags(value: &serde_json::Value) -> Vec<String> {
    serde_json::from_value(value.clone()).unwrap_or_default()
}

async fn allocate_slug(db: &DatabaseConnection, title: &str) -> DomainResult<String> {
    let base = slugify(title);
    for attempt in 0..MAX_SLUG_ATTEMPTS {
        let candidate = slug_candidate(&base, attempt);
        // Soft-deleted rows still hold their slug; check all rows
        let taken = feature_request::Entity::find()
            .filter(feature_request::Column::Slug.eq(candidate.clone()))
            .count(db)
            .await?;
        if taken == 0 {
            return Ok(candidate);
        }
    }
    Err(DomainError::conflict(format!(
        "could not allocate a unique slug for '{base}'"
    )))
}

fn validate_title(title: &str) -> DomainResult<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("title", "must not be empty"));
    }
    if trimmed.chars().count() > MAX_TITLE_LEN {
        return Err(DomainError::validation(
            "title",
            format!("must be at most {MAX_TITLE_LEN} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

fn validate_description(description: &str) -> DomainResult<String> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("description", "must not be empty"));
    }
    if trimmed.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(DomainError::validation(
            "description",
            format!("must be at most {MAX_DESCRIPTION_LEN} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

fn validate_tags(tags: Vec<String>) -> DomainResult<Vec<String>> {
    if tags.len() > MAX_TAGS {
        return Err(DomainError::validation(
            "tags",
            format!("at most {MAX_TAGS} tags allowed"),
        ));
    }
    let mut cleaned = Vec::with_capacity(tags.len());
    for tag in tags {
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.chars().count() > MAX_TAG_LEN {
            return Err(DomainError::validation(
                "tags",
                format!("tag '{trimmed}' exceeds {MAX_TAG_LEN} characters"),
            ));
        }
        cleaned.push(trimmed.to_string());
    }
    Ok(cleaned)
}

fn trimmed_opt(value: Option<String>) -> Option<String> {
    value.and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_stable_and_distinguishes_filters() {
        let mut filters = RequestFilters::default();
        let base = cache_key(&filters, 1, 20);
        assert_eq!(base, cache_key(&filters, 1, 20));

        filters.status = Some("pending".to_string());
        let with_status = cache_key(&filters, 1, 20);
        assert_ne!(base, with_status);

        assert_ne!(with_status, cache_key(&filters, 2, 20));
        assert_ne!(with_status, cache_key(&filters, 1, 50));
    }

    #[test]
    fn search_text_covers_title_description_and_tags() {
        let text = build_search_text(
            "Dark Mode",
            "Support a dark THEME",
            &["ui".to_string(), "Accessibility".to_string()],
        );
        assert!(text.contains("dark mode"));
        assert!(text.contains("dark theme"));
        assert!(text.contains("accessibility"));
        assert_eq!(text, text.to_lowercase());
    }

    #[test]
    fn page_clamping_keeps_offset_in_range() {
        assert_eq!(clamp_page(None), 1);
        assert_eq!(clamp_page(Some(0)), 1);
        assert_eq!(clamp_page(Some(42)), 42);
        assert_eq!(clamp_page(Some(u64::MAX)), MAX_PAGE);

        // The worst-case offset must not overflow
        let pagination = PaginationConfig::default();
        let page = clamp_page(Some(u64::MAX));
        let page_size = clamp_page_size(Some(u64::MAX), &pagination);
        assert!((page - 1).checked_mul(page_size).is_some());
    }

    #[test]
    fn page_size_clamping() {
        let pagination = PaginationConfig::default();
        assert_eq!(clamp_page_size(None, &pagination), pagination.default_page_size);
        assert_eq!(clamp_page_size(Some(0), &pagination), 1);
        assert_eq!(clamp_page_size(Some(7), &pagination), 7);
        assert_eq!(
            clamp_page_size(Some(10_000), &pagination),
            pagination.max_page_size
        );
    }

    #[test]
    fn sort_parsing() {
        assert_eq!(parse_sort_by("votes").unwrap(), SortBy::Votes);
        assert_eq!(parse_sort_by("CREATED_AT").unwrap(), SortBy::CreatedAt);
        assert!(parse_sort_by("priority").is_err());
        assert_eq!(parse_sort_direction("asc").unwrap(), SortDirection::Asc);
        assert!(parse_sort_direction("sideways").is_err());
    }

    #[test]
    fn title_and_description_validation() {
        assert!(validate_title("  ").is_err());
        assert_eq!(validate_title(" Dark mode ").unwrap(), "Dark mode");
        let long = "x".repeat(MAX_TITLE_LEN + 1);
        assert!(validate_title(&long).is_err());
        assert!(validate_description("").is_err());
    }

    #[test]
    fn tag_validation_drops_blanks_and_bounds_length() {
        let tags = validate_tags(vec![
            " ui ".to_string(),
            "".to_string(),
            "api".to_string(),
        ])
        .unwrap();
        assert_eq!(tags, vec!["ui".to_string(), "api".to_string()]);

        let oversized = vec!["x".repeat(MAX_TAG_LEN + 1)];
        assert!(validate_tags(oversized).is_err());

        let too_many = (0..MAX_TAGS + 1).map(|i| format!("t{i}")).collect();
        assert!(validate_tags(too_many).is_err());
    }

    #[test]
    fn tags_roundtrip_through_json() {
        let tags = vec!["ui".to_string(), "api".to_string()];
        let value = json!(tags);
        assert_eq!(decode_tags(&value), tags);
        assert!(decode_tags(&json!({"not": "an array"})).is_empty());
    }

    #[test]
    fn total_pages_arithmetic() {
        let page = Page::<()> {
            items: Vec::new(),
            total: 41,
            page: 1,
            page_size: 20,
            total_pages: 41u64.div_ceil(20),
        };
        assert_eq!(page.total_pages, 3);
    }
}
