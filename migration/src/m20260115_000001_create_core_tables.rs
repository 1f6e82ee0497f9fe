use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_query::Expr;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Categories::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Categories::Name)
                            .string_len(128)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Categories::Slug)
                            .string_len(160)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Categories::Description).text())
                    .col(ColumnDef::new(Categories::Color).string_len(32))
                    .col(
                        ColumnDef::new(Categories::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Categories::SortOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Categories::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Categories::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FeatureRequests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FeatureRequests::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(FeatureRequests::Slug)
                            .string_len(200)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(FeatureRequests::Title)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(ColumnDef::new(FeatureRequests::Description).text().not_null())
                    .col(ColumnDef::new(FeatureRequests::AdditionalInfo).text())
                    .col(
                        ColumnDef::new(FeatureRequests::Status)
                            .string_len(32)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(FeatureRequests::Priority)
                            .string_len(16)
                            .not_null()
                            .default("medium"),
                    )
                    .col(ColumnDef::new(FeatureRequests::CategoryId).big_integer())
                    .col(
                        ColumnDef::new(FeatureRequests::AuthorId)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(ColumnDef::new(FeatureRequests::AssigneeId).string_len(128))
                    .col(ColumnDef::new(FeatureRequests::DueDate).timestamp_with_time_zone())
                    .col(ColumnDef::new(FeatureRequests::EstimatedEffort).string_len(64))
                    .col(
                        ColumnDef::new(FeatureRequests::Tags)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FeatureRequests::SearchText)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FeatureRequests::IsPublic)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(FeatureRequests::IsFeatured)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(FeatureRequests::VoteCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(FeatureRequests::UpVotes)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(FeatureRequests::DownVotes)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(FeatureRequests::CommentCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(FeatureRequests::ViewCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(FeatureRequests::DeletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(FeatureRequests::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(FeatureRequests::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_feature_requests_category")
                            .from(FeatureRequests::Table, FeatureRequests::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Listing filters hit status + tombstone on every query
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_feature_requests_status")
                    .table(FeatureRequests::Table)
                    .col(FeatureRequests::Status)
                    .col(FeatureRequests::DeletedAt)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_feature_requests_category")
                    .table(FeatureRequests::Table)
                    .col(FeatureRequests::CategoryId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_feature_requests_author")
                    .table(FeatureRequests::Table)
                    .col(FeatureRequests::AuthorId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FeatureRequests::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Categories {
    Table,
    Id,
    Name,
    Slug,
    Description,
    Color,
    IsActive,
    SortOrder,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum FeatureRequests {
    Table,
    Id,
    Slug,
    Title,
    Description,
    AdditionalInfo,
    Status,
    Priority,
    CategoryId,
    AuthorId,
    AssigneeId,
    DueDate,
    EstimatedEffort,
    Tags,
    SearchText,
    IsPublic,
    IsFeatured,
    VoteCount,
    UpVotes,
    DownVotes,
    CommentCount,
    ViewCount,
    DeletedAt,
    CreatedAt,
    UpdatedAt,
}
