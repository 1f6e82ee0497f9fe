use serde::{Deserialize, Serialize};

use crate::domain::status::VOTE_UP;
use crate::entities::vote;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteView {
    pub feature_request_id: i64,
    pub voter_id: String,
    pub vote_type: String,
    pub weight: i64, // +1 up, -1 down
    pub comment: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl VoteView {
    pub fn from_model(model: &vote::Model) -> Self {
        Self {
            feature_request_id: model.feature_request_id,
            voter_id: model.voter_id.clone(),
            vote_type: model.vote_type.clone(),
            weight: if model.vote_type == VOTE_UP { 1 } else { -1 },
            comment: model.comment.clone(),
            created_at: model.created_at.timestamp(),
            updated_at: model.updated_at.timestamp(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastVoteBody {
    pub vote_type: String,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CastVoteResponse {
    pub vote: VoteView,
    pub statistics: crate::domain::votes::VoteStatistics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoveVoteResponse {
    pub removed: bool,
    pub statistics: crate::domain::votes::VoteStatistics,
}
