use serde::{Deserialize, Serialize};

use crate::config::FeaturesConfig;
use crate::domain::requests::decode_tags;
use crate::domain::status::{is_votable_status, status_display};
use crate::domain::votes::VoteTally;
use crate::entities::feature_request;
use crate::models::vote::VoteView;

/// Full resource representation. Derived fields (net votes, approval rate,
/// display metadata, eligibility flags) ride along with the stored ones so
/// clients never recompute them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRequestView {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub additional_info: Option<String>,
    pub status: String,
    pub status_label: String,
    pub status_color: String,
    pub priority: String,
    pub category_id: Option<i64>,
    pub author_id: String,
    pub assignee_id: Option<String>,
    pub due_date: Option<i64>,
    pub estimated_effort: Option<String>,
    pub tags: Vec<String>,
    pub is_public: bool,
    pub is_featured: bool,
    pub vote_count: i64,
    pub up_votes: i64,
    pub down_votes: i64,
    pub net_votes: i64,
    pub approval_rate: f64,
    pub comment_count: i64,
    pub view_count: i64,
    pub is_votable: bool,
    pub is_commentable: bool,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_voted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_vote: Option<VoteView>,
}

impl FeatureRequestView {
    pub fn from_model(model: &feature_request::Model, features: &FeaturesConfig) -> Self {
        let (label, color, _) = status_display(&model.status);
        let tally = VoteTally {
            up: model.up_votes,
            down: model.down_votes,
        };
        Self {
            id: model.id,
            slug: model.slug.clone(),
            title: model.title.clone(),
            description: model.description.clone(),
            additional_info: model.additional_info.clone(),
            status: model.status.clone(),
            status_label: label.to_string(),
            status_color: color.to_string(),
            priority: model.priority.clone(),
            category_id: model.category_id,
            author_id: model.author_id.clone(),
            assignee_id: model.assignee_id.clone(),
            due_date: model.due_date.map(|dt| dt.timestamp()),
            estimated_effort: model.estimated_effort.clone(),
            tags: decode_tags(&model.tags),
            is_public: model.is_public,
            is_featured: model.is_featured,
            vote_count: model.vote_count,
            up_votes: model.up_votes,
            down_votes: model.down_votes,
            net_votes: tally.net(),
            approval_rate: tally.approval_rate(),
            comment_count: model.comment_count,
            view_count: model.view_count,
            is_votable: features.voting.enabled && is_votable_status(&model.status),
            is_commentable: features.comments.enabled,
            created_at: model.created_at.timestamp(),
            updated_at: model.updated_at.timestamp(),
            has_voted: None,
            user_vote: None,
        }
    }
}

/// Trimmed representation for listing pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRequestSummary {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub status: String,
    pub status_label: String,
    pub status_color: String,
    pub priority: String,
    pub category_id: Option<i64>,
    pub tags: Vec<String>,
    pub is_featured: bool,
    pub vote_count: i64,
    pub net_votes: i64,
    pub comment_count: i64,
    pub created_at: i64,
}

impl FeatureRequestSummary {
    pub fn from_model(model: &feature_request::Model) -> Self {
        let (label, color, _) = status_display(&model.status);
        Self {
            id: model.id,
            slug: model.slug.clone(),
            title: model.title.clone(),
            status: model.status.clone(),
            status_label: label.to_string(),
            status_color: color.to_string(),
            priority: model.priority.clone(),
            category_id: model.category_id,
            tags: decode_tags(&model.tags),
            is_featured: model.is_featured,
            vote_count: model.vote_count,
            net_votes: model.up_votes - model.down_votes,
            comment_count: model.comment_count,
            created_at: model.created_at.timestamp(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateFeatureRequestBody {
    pub title: String,
    pub description: String,
    pub additional_info: Option<String>,
    pub priority: Option<String>,
    pub category_id: Option<i64>,
    pub due_date: Option<String>,
    pub estimated_effort: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_public: Option<bool>,
}

/// Partial update body. Nullable fields use a double option: omitting a
/// field leaves it untouched, sending null clears it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct UpdateFeatureRequestBody {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, with = "double_option", skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<Option<String>>,
    pub status: Option<String>,
    pub priority: Option<String>,
    #[serde(default, with = "double_option", skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Option<i64>>,
    #[serde(default, with = "double_option", skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<Option<String>>,
    #[serde(default, with = "double_option", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<String>>,
    #[serde(default, with = "double_option", skip_serializing_if = "Option::is_none")]
    pub estimated_effort: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
    pub is_featured: Option<bool>,
}

/// Distinguishes "field absent" from "field set to null" in PATCH bodies.
mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }

    pub fn serialize<T, S>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RoadmapColumn {
    pub status: String,
    pub status_label: String,
    pub status_color: String,
    pub count: usize,
    pub items: Vec<FeatureRequestSummary>,
}
