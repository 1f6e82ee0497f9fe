use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "comments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub feature_request_id: i64,
    pub author_id: Option<String>,
    pub parent_id: Option<i64>,
    pub content: String,
    pub is_approved: bool,
    pub is_pinned: bool,
    pub deleted_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::feature_request::Entity",
        from = "Column::FeatureRequestId",
        to = "super::feature_request::Column::Id"
    )]
    FeatureRequest,
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentId",
        to = "Column::Id"
    )]
    Parent,
}

impl Related<super::feature_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FeatureRequest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
