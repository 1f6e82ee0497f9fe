use serde::{Deserialize, Serialize};

use crate::entities::comment;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentView {
    pub id: i64,
    pub feature_request_id: i64,
    pub author_id: Option<String>,
    pub parent_id: Option<i64>,
    pub content: String,
    pub is_approved: bool,
    pub is_pinned: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl CommentView {
    pub fn from_model(model: &comment::Model) -> Self {
        Self {
            id: model.id,
            feature_request_id: model.feature_request_id,
            author_id: model.author_id.clone(),
            parent_id: model.parent_id,
            content: model.content.clone(),
            is_approved: model.is_approved,
            is_pinned: model.is_pinned,
            created_at: model.created_at.timestamp(),
            updated_at: model.updated_at.timestamp(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostCommentBody {
    pub content: String,
    pub parent_id: Option<i64>,
}
