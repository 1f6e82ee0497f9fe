//! Comment aggregation and threading.
//!
//! `comment_count` on a feature request always equals the count of
//! approved, non-deleted comments, recomputed in the same transaction as
//! the triggering mutation. One level of reply nesting is used: replies
//! reference a parent comment on the same feature request.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};

use crate::actor::Actor;
use crate::config::FeaturesConfig;
use crate::domain::error::{DomainError, DomainResult};
use crate::entities::{comment, feature_request};

pub const MAX_COMMENT_LEN: usize = 5_000;

/// Posts a top-level comment or a reply. New comments start unapproved
/// when moderation is required, approved otherwise.
pub async fn post_comment(
    db: &DatabaseConnection,
    features: &FeaturesConfig,
    request_id: i64,
    actor: &Actor,
    content: &str,
    parent_id: Option<i64>,
) -> DomainResult<comment::Model> {
    if !features.comments.enabled {
        return Err(DomainError::NotCommentable);
    }
    if actor.is_anonymous() && !features.comments.allow_anonymous {
        return Err(DomainError::forbidden("authentication required to comment"));
    }
    let content = sanitize_content(content)?;

    let txn = db.begin().await?;

    let request_exists = feature_request::Entity::find_by_id(request_id)
        .filter(feature_request::Column::DeletedAt.is_null())
        .count(&txn)
        .await?;
    if request_exists == 0 {
        return Err(DomainError::not_found(format!(
            "feature request {request_id}"
        )));
    }

    if let Some(parent) = parent_id {
        let parent_row = comment::Entity::find_by_id(parent)
            .filter(comment::Column::DeletedAt.is_null())
            .one(&txn)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("comment {parent}")))?;
        if parent_row.feature_request_id != request_id {
            return Err(DomainError::validation(
                "parent_id",
                "parent comment belongs to a different feature request",
            ));
        }
    }

    let now = Utc::now().fixed_offset();
    let new_comment = comment::ActiveModel {
        id: ActiveValue::NotSet,
        feature_request_id: ActiveValue::Set(request_id),
        author_id: ActiveValue::Set(actor.id.clone()),
        parent_id: ActiveValue::Set(parent_id),
        content: ActiveValue::Set(content),
        is_approved: ActiveValue::Set(!features.comments.moderation_required),
        is_pinned: ActiveValue::Set(false),
        deleted_at: ActiveValue::Set(None),
        created_at: ActiveValue::Set(now),
        updated_at: ActiveValue::Set(now),
    };
    let saved = new_comment.insert(&txn).await?;

    recompute_comment_count(&txn, request_id).await?;
    txn.commit().await?;
    Ok(saved)
}

pub async fn approve_comment(
    db: &DatabaseConnection,
    comment_id: i64,
) -> DomainResult<comment::Model> {
    set_flag(db, comment_id, CommentFlag::Approved, true).await
}

pub async fn pin_comment(db: &DatabaseConnection, comment_id: i64) -> DomainResult<comment::Model> {
    set_flag(db, comment_id, CommentFlag::Pinned, true).await
}

pub async fn unpin_comment(
    db: &DatabaseConnection,
    comment_id: i64,
) -> DomainResult<comment::Model> {
    set_flag(db, comment_id, CommentFlag::Pinned, false).await
}

/// Soft-deletes a comment; the row stays for audit but leaves every
/// listing and the aggregate count.
pub async fn delete_comment(db: &DatabaseConnection, comment_id: i64) -> DomainResult<()> {
    let txn = db.begin().await?;
    let existing = find_live_comment(&txn, comment_id).await?;

    let now = Utc::now().fixed_offset();
    let mut active: comment::ActiveModel = existing.clone().into();
    active.deleted_at = ActiveValue::Set(Some(now));
    active.updated_at = ActiveValue::Set(now);
    active.update(&txn).await?;

    recompute_comment_count(&txn, existing.feature_request_id).await?;
    txn.commit().await?;
    Ok(())
}

pub async fn get_comment(db: &DatabaseConnection, comment_id: i64) -> DomainResult<comment::Model> {
    comment::Entity::find_by_id(comment_id)
        .filter(comment::Column::DeletedAt.is_null())
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("comment {comment_id}")))
}

/// Top-level comments for a request: approved, non-deleted, pinned first,
/// then oldest first.
pub async fn top_level(
    db: &DatabaseConnection,
    request_id: i64,
) -> DomainResult<Vec<comment::Model>> {
    let comments = comment::Entity::find()
        .filter(comment::Column::FeatureRequestId.eq(request_id))
        .filter(comment::Column::ParentId.is_null())
        .filter(comment::Column::DeletedAt.is_null())
        .filter(comment::Column::IsApproved.eq(true))
        .order_by(comment::Column::IsPinned, Order::Desc)
        .order_by(comment::Column::CreatedAt, Order::Asc)
        .order_by(comment::Column::Id, Order::Asc)
        .all(db)
        .await?;
    Ok(comments)
}

pub async fn replies(db: &DatabaseConnection, parent_id: i64) -> DomainResult<Vec<comment::Model>> {
    // 404 on a deleted/unknown parent rather than an empty list
    find_live_comment_on(db, parent_id).await?;
    let children = comment::Entity::find()
        .filter(comment::Column::ParentId.eq(parent_id))
        .filter(comment::Column::DeletedAt.is_null())
        .filter(comment::Column::IsApproved.eq(true))
        .order_by(comment::Column::IsPinned, Order::Desc)
        .order_by(comment::Column::CreatedAt, Order::Asc)
        .order_by(comment::Column::Id, Order::Asc)
        .all(db)
        .await?;
    Ok(children)
}

/// Recounts approved, non-deleted comments and writes the result onto the
/// owning feature request. The uniform rule: unapproved and tombstoned
/// comments never count.
pub async fn recompute_comment_count<C: ConnectionTrait>(
    conn: &C,
    request_id: i64,
) -> DomainResult<()> {
    let count = comment::Entity::find()
        .filter(comment::Column::FeatureRequestId.eq(request_id))
        .filter(comment::Column::DeletedAt.is_null())
        .filter(comment::Column::IsApproved.eq(true))
        .count(conn)
        .await?;
    assert!(count <= i64::MAX as u64, "Comment count exceeds i64 bounds");

    feature_request::Entity::update_many()
        .col_expr(
            feature_request::Column::CommentCount,
            Expr::value(count as i64),
        )
        .col_expr(
            feature_request::Column::UpdatedAt,
            Expr::value(Utc::now().fixed_offset()),
        )
        .filter(feature_request::Column::Id.eq(request_id))
        .exec(conn)
        .await?;
    Ok(())
}

enum CommentFlag {
    Approved,
    Pinned,
}

async fn set_flag(
    db: &DatabaseConnection,
    comment_id: i64,
    flag: CommentFlag,
    value: bool,
) -> DomainResult<comment::Model> {
    let txn = db.begin().await?;
    let existing = find_live_comment(&txn, comment_id).await?;
    let request_id = existing.feature_request_id;

    let mut active: comment::ActiveModel = existing.into();
    match flag {
        CommentFlag::Approved => active.is_approved = ActiveValue::Set(value),
        CommentFlag::Pinned => active.is_pinned = ActiveValue::Set(value),
    }
    active.updated_at = ActiveValue::Set(Utc::now().fixed_offset());
    let saved = active.update(&txn).await?;

    // Pinning never moves the count, but approval does; one recompute
    // path keeps the invariant simple to audit.
    recompute_comment_count(&txn, request_id).await?;
    txn.commit().await?;
    Ok(saved)
}

async fn find_live_comment(
    txn: &DatabaseTransaction,
    comment_id: i64,
) -> DomainResult<comment::Model> {
    comment::Entity::find_by_id(comment_id)
        .filter(comment::Column::DeletedAt.is_null())
        .one(txn)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("comment {comment_id}")))
}

async fn find_live_comment_on(
    db: &DatabaseConnection,
    comment_id: i64,
) -> DomainResult<comment::Model> {
    comment::Entity::find_by_id(comment_id)
        .filter(comment::Column::DeletedAt.is_null())
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("comment {comment_id}")))
}

fn sanitize_content(content: &str) -> DomainResult<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("content", "must not be empty"));
    }
    if trimmed.chars().count() > MAX_COMMENT_LEN {
        return Err(DomainError::validation(
            "content",
            format!("must be at most {MAX_COMMENT_LEN} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_sanitization() {
        assert_eq!(sanitize_content("  hello ").unwrap(), "hello");
        assert!(sanitize_content("   ").is_err());
        let too_long = "x".repeat(MAX_COMMENT_LEN + 1);
        assert!(sanitize_content(&too_long).is_err());
    }

    // The counting rule applied uniformly: approved and live only.
    #[test]
    fn counting_rule_excludes_pending_and_deleted() {
        struct Row {
            approved: bool,
            deleted: bool,
        }
        let rows = [
            Row { approved: true, deleted: false },
            Row { approved: false, deleted: false },
            Row { approved: true, deleted: true },
            Row { approved: true, deleted: false },
        ];
        let counted = rows.iter().filter(|r| r.approved && !r.deleted).count();
        assert_eq!(counted, 2);
    }

    // Ordering contract for threads: pinned first, then creation time,
    // then id as the stable tie-break.
    #[test]
    fn thread_ordering_key() {
        let key = |pinned: bool, created: i64, id: i64| (!pinned, created, id);
        let mut rows = vec![
            key(false, 10, 3),
            key(true, 20, 4),
            key(false, 10, 1),
            key(true, 5, 2),
        ];
        rows.sort();
        assert_eq!(rows, vec![
            key(true, 5, 2),
            key(true, 20, 4),
            key(false, 10, 1),
            key(false, 10, 3),
        ]);
    }
}
