use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "votes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub feature_request_id: i64,
    pub voter_id: String,
    pub vote_type: String, // up/down
    pub comment: Option<String>,
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
}

impl Related<super::feature_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FeatureRequest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
