use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "feature_requests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub additional_info: Option<String>,
    pub status: String,   // pending/under_review/planned/in_progress/completed/rejected
    pub priority: String, // low/medium/high/critical
    pub category_id: Option<i64>,
    pub author_id: String,
    pub assignee_id: Option<String>,
    pub due_date: Option<DateTimeWithTimeZone>,
    pub estimated_effort: Option<String>,
    pub tags: Json,
    pub search_text: String,
    pub is_public: bool,
    pub is_featured: bool,
    pub vote_count: i64,
    pub up_votes: i64,
    pub down_votes: i64,
    pub comment_count: i64,
    pub view_count: i64,
    pub deleted_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::vote::Entity")]
    Vote,
    #[sea_orm(has_many = "super::comment::Entity")]
    Comment,
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
}

impl Related<super::vote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vote.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comment.def()
    }
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
