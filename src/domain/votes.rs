//! Vote aggregation.
//!
//! Counters on a feature request are never patched incrementally: every
//! vote mutation recomputes `up_votes`/`down_votes`/`vote_count` from a
//! grouped count of the live vote rows, inside the same transaction as the
//! triggering write. Two concurrent recomputations each produce a
//! self-consistent snapshot; the unique (feature_request_id, voter_id)
//! index arbitrates racing first-time votes at the store.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect, TransactionTrait,
};
use serde::Serialize;

use crate::actor::Actor;
use crate::config::{FeaturesConfig, VotingConfig};
use crate::domain::error::{DomainError, DomainResult, map_unique_violation};
use crate::domain::status::{VOTE_DOWN, VOTE_UP, is_votable_status, normalize_vote_type};
use crate::entities::{feature_request, vote};

pub const MAX_VOTE_COMMENT_LEN: usize = 1_000;

/// Snapshot of a feature request's vote rows grouped by type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoteTally {
    pub up: i64,
    pub down: i64,
}

impl VoteTally {
    pub fn from_grouped_counts(rows: &[(String, i64)]) -> Self {
        let mut tally = Self::default();
        for (vote_type, count) in rows {
            match vote_type.as_str() {
                VOTE_UP => tally.up += count,
                VOTE_DOWN => tally.down += count,
                _ => {}
            }
        }
        tally
    }

    pub fn total(&self) -> i64 {
        self.up + self.down
    }

    pub fn net(&self) -> i64 {
        self.up - self.down
    }

    /// up / total × 100, rounded to two decimal places; 0.0 with no votes.
    pub fn approval_rate(&self) -> f64 {
        if self.total() == 0 {
            return 0.0;
        }
        let rate = (self.up as f64) / (self.total() as f64) * 100.0;
        (rate * 100.0).round() / 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VoteStatistics {
    pub total: i64,
    pub up: i64,
    pub down: i64,
    pub net: i64,
    pub approval_rate: f64,
}

impl From<VoteTally> for VoteStatistics {
    fn from(tally: VoteTally) -> Self {
        Self {
            total: tally.total(),
            up: tally.up,
            down: tally.down,
            net: tally.net(),
            approval_rate: tally.approval_rate(),
        }
    }
}

/// Admission rule for a cast: a repeat vote is only allowed when vote
/// changes are enabled, and a first vote only while the voter is under the
/// configured quota. `votes_cast` is consulted for first votes only.
pub fn check_vote_attempt(
    voting: &VotingConfig,
    has_existing_vote: bool,
    votes_cast: u64,
) -> DomainResult<()> {
    if has_existing_vote {
        if !voting.allow_vote_change {
            return Err(DomainError::AlreadyVoted);
        }
        return Ok(());
    }
    if let Some(max) = voting.max_votes_per_voter {
        if votes_cast >= max {
            return Err(DomainError::LimitExceeded { limit: max });
        }
    }
    Ok(())
}

/// Casts or changes a vote. At most one row per (request, voter) exists at
/// any time; a repeat vote mutates that row in place.
pub async fn cast_vote(
    db: &DatabaseConnection,
    features: &FeaturesConfig,
    request_id: i64,
    actor: &Actor,
    vote_type: &str,
    comment: Option<String>,
) -> DomainResult<vote::Model> {
    if !features.voting.enabled {
        return Err(DomainError::NotVotable);
    }
    let voter_id = actor
        .id
        .clone()
        .ok_or_else(|| DomainError::forbidden("authentication required to vote"))?;
    let vote_type = normalize_vote_type(vote_type)?;
    let comment = sanitize_vote_comment(comment)?;

    let txn = db.begin().await?;

    let request = find_votable_request(&txn, request_id).await?;
    if !is_votable_status(&request.status) {
        return Err(DomainError::NotVotable);
    }

    let existing = vote::Entity::find()
        .filter(vote::Column::FeatureRequestId.eq(request_id))
        .filter(vote::Column::VoterId.eq(voter_id.clone()))
        .one(&txn)
        .await?;

    let now = Utc::now().fixed_offset();
    let saved = match existing {
        Some(model) => {
            check_vote_attempt(&features.voting, true, 0)?;
            let mut active: vote::ActiveModel = model.into();
            active.vote_type = ActiveValue::Set(vote_type.to_string());
            active.comment = ActiveValue::Set(comment);
            active.updated_at = ActiveValue::Set(now);
            active.update(&txn).await?
        }
        None => {
            let cast_so_far = vote::Entity::find()
                .filter(vote::Column::VoterId.eq(voter_id.clone()))
                .count(&txn)
                .await?;
            check_vote_attempt(&features.voting, false, cast_so_far)?;
            let new_vote = vote::ActiveModel {
                id: ActiveValue::NotSet,
                feature_request_id: ActiveValue::Set(request_id),
                voter_id: ActiveValue::Set(voter_id),
                vote_type: ActiveValue::Set(vote_type.to_string()),
                comment: ActiveValue::Set(comment),
                created_at: ActiveValue::Set(now),
                updated_at: ActiveValue::Set(now),
            };
            new_vote
                .insert(&txn)
                .await
                .map_err(|err| map_unique_violation(err, DomainError::AlreadyVoted))?
        }
    };

    recompute_vote_counters(&txn, request_id).await?;
    txn.commit().await?;
    Ok(saved)
}

/// Removes the voter's vote if present. Returns false when there was
/// nothing to remove.
pub async fn remove_vote(
    db: &DatabaseConnection,
    features: &FeaturesConfig,
    request_id: i64,
    actor: &Actor,
) -> DomainResult<bool> {
    if !features.voting.enabled {
        return Err(DomainError::NotVotable);
    }
    let voter_id = actor
        .id
        .clone()
        .ok_or_else(|| DomainError::forbidden("authentication required to vote"))?;

    let txn = db.begin().await?;
    find_votable_request(&txn, request_id).await?;

    let deleted = vote::Entity::delete_many()
        .filter(vote::Column::FeatureRequestId.eq(request_id))
        .filter(vote::Column::VoterId.eq(voter_id))
        .exec(&txn)
        .await?;

    if deleted.rows_affected == 0 {
        txn.commit().await?;
        return Ok(false);
    }

    recompute_vote_counters(&txn, request_id).await?;
    txn.commit().await?;
    Ok(true)
}

pub async fn vote_statistics(
    db: &DatabaseConnection,
    request_id: i64,
) -> DomainResult<VoteStatistics> {
    let exists = feature_request::Entity::find_by_id(request_id)
        .filter(feature_request::Column::DeletedAt.is_null())
        .count(db)
        .await?;
    if exists == 0 {
        return Err(DomainError::not_found(format!(
            "feature request {request_id}"
        )));
    }
    let tally = tally_votes(db, request_id).await?;
    Ok(tally.into())
}

/// Finds the voter's current vote on a request, if any.
pub async fn find_vote(
    db: &DatabaseConnection,
    request_id: i64,
    voter_id: &str,
) -> DomainResult<Option<vote::Model>> {
    let found = vote::Entity::find()
        .filter(vote::Column::FeatureRequestId.eq(request_id))
        .filter(vote::Column::VoterId.eq(voter_id.to_owned()))
        .one(db)
        .await?;
    Ok(found)
}

async fn find_votable_request(
    txn: &DatabaseTransaction,
    request_id: i64,
) -> DomainResult<feature_request::Model> {
    feature_request::Entity::find_by_id(request_id)
        .filter(feature_request::Column::DeletedAt.is_null())
        .one(txn)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("feature request {request_id}")))
}

async fn tally_votes<C: ConnectionTrait>(conn: &C, request_id: i64) -> DomainResult<VoteTally> {
    let counts: Vec<(String, i64)> = vote::Entity::find()
        .select_only()
        .column(vote::Column::VoteType)
        .column_as(vote::Column::Id.count(), "count")
        .filter(vote::Column::FeatureRequestId.eq(request_id))
        .group_by(vote::Column::VoteType)
        .into_tuple()
        .all(conn)
        .await?;
    Ok(VoteTally::from_grouped_counts(&counts))
}

/// Writes the grouped count back onto the owning feature request. Always a
/// full recompute; incremental arithmetic drifts on any missed update.
pub async fn recompute_vote_counters<C: ConnectionTrait>(
    conn: &C,
    request_id: i64,
) -> DomainResult<()> {
    let tally = tally_votes(conn, request_id).await?;
    assert!(tally.up >= 0 && tally.down >= 0, "Vote counts cannot be negative");

    feature_request::Entity::update_many()
        .col_expr(feature_request::Column::UpVotes, Expr::value(tally.up))
        .col_expr(feature_request::Column::DownVotes, Expr::value(tally.down))
        .col_expr(feature_request::Column::VoteCount, Expr::value(tally.total()))
        .col_expr(
            feature_request::Column::UpdatedAt,
            Expr::value(Utc::now().fixed_offset()),
        )
        .filter(feature_request::Column::Id.eq(request_id))
        .exec(conn)
        .await?;
    Ok(())
}

fn sanitize_vote_comment(comment: Option<String>) -> DomainResult<Option<String>> {
    match comment {
        None => Ok(None),
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            if trimmed.chars().count() > MAX_VOTE_COMMENT_LEN {
                return Err(DomainError::validation(
                    "comment",
                    format!("must be at most {MAX_VOTE_COMMENT_LEN} characters"),
                ));
            }
            Ok(Some(trimmed.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Simulated vote rows: (voter, vote_type). Mirrors what the grouped
    /// count query would return for the same rows.
    fn tally_rows(rows: &[(&str, &str)]) -> VoteTally {
        let up = rows.iter().filter(|(_, t)| *t == VOTE_UP).count() as i64;
        let down = rows.iter().filter(|(_, t)| *t == VOTE_DOWN).count() as i64;
        VoteTally::from_grouped_counts(&[
            (VOTE_UP.to_string(), up),
            (VOTE_DOWN.to_string(), down),
        ])
    }

    #[test]
    fn tally_ignores_unknown_types() {
        let tally = VoteTally::from_grouped_counts(&[
            ("up".to_string(), 3),
            ("down".to_string(), 1),
            ("sideways".to_string(), 7),
        ]);
        assert_eq!(tally.up, 3);
        assert_eq!(tally.down, 1);
        assert_eq!(tally.total(), 4);
    }

    #[test]
    fn counter_invariant_holds() {
        let tally = tally_rows(&[("a", "up"), ("b", "down"), ("c", "up")]);
        assert_eq!(tally.total(), tally.up + tally.down);
        assert_eq!(tally.net(), 1);
    }

    #[test]
    fn approval_rate_zero_votes() {
        assert_eq!(VoteTally::default().approval_rate(), 0.0);
    }

    #[test]
    fn approval_rate_rounds_to_two_places() {
        let tally = VoteTally { up: 1, down: 2 };
        assert_eq!(tally.approval_rate(), 33.33);
        let tally = VoteTally { up: 2, down: 1 };
        assert_eq!(tally.approval_rate(), 66.67);
    }

    // Two voters, then one changes their vote in place.
    #[test]
    fn vote_change_scenario() {
        let after_first = tally_rows(&[("a", "up")]);
        assert_eq!((after_first.total(), after_first.up), (1, 1));

        let after_second = tally_rows(&[("a", "up"), ("b", "down")]);
        assert_eq!(after_second.total(), 2);
        assert_eq!(after_second.up, 1);
        assert_eq!(after_second.down, 1);
        assert_eq!(after_second.net(), 0);
        assert_eq!(after_second.approval_rate(), 50.0);

        // Voter a flips to down: the row mutates, no new row appears.
        let after_change = tally_rows(&[("a", "down"), ("b", "down")]);
        assert_eq!(after_change.total(), 2);
        assert_eq!(after_change.up, 0);
        assert_eq!(after_change.down, 2);
        assert_eq!(after_change.approval_rate(), 0.0);
    }

    // Scenario B: with vote changes disabled, a repeat cast is rejected
    // before any row is touched.
    #[test]
    fn repeat_vote_rejected_when_changes_disabled() {
        let voting = VotingConfig {
            allow_vote_change: false,
            ..VotingConfig::default()
        };
        let err = check_vote_attempt(&voting, true, 0).unwrap_err();
        assert!(matches!(err, DomainError::AlreadyVoted));

        let permissive = VotingConfig::default();
        assert!(check_vote_attempt(&permissive, true, 0).is_ok());
    }

    #[test]
    fn first_vote_bounded_by_quota() {
        let voting = VotingConfig {
            max_votes_per_voter: Some(3),
            ..VotingConfig::default()
        };
        assert!(check_vote_attempt(&voting, false, 0).is_ok());
        assert!(check_vote_attempt(&voting, false, 2).is_ok());
        let err = check_vote_attempt(&voting, false, 3).unwrap_err();
        assert!(matches!(err, DomainError::LimitExceeded { limit: 3 }));

        // The quota never blocks changing an existing vote
        assert!(check_vote_attempt(&voting, true, 3).is_ok());

        let unlimited = VotingConfig::default();
        assert!(check_vote_attempt(&unlimited, false, 10_000).is_ok());
    }

    #[test]
    fn vote_comment_sanitization() {
        assert_eq!(sanitize_vote_comment(None).unwrap(), None);
        assert_eq!(sanitize_vote_comment(Some("  ".to_string())).unwrap(), None);
        assert_eq!(
            sanitize_vote_comment(Some(" needs this ".to_string())).unwrap(),
            Some("needs this".to_string())
        );
        let too_long = "x".repeat(MAX_VOTE_COMMENT_LEN + 1);
        assert!(sanitize_vote_comment(Some(too_long)).is_err());
    }

    #[test]
    fn statistics_view_carries_derived_fields() {
        let stats: VoteStatistics = VoteTally { up: 3, down: 1 }.into();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.net, 2);
        assert_eq!(stats.approval_rate, 75.0);
    }
}
