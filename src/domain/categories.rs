use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder,
};

use crate::domain::error::{DomainError, DomainResult, map_unique_violation};
use crate::domain::slug::slugify;
use crate::entities::category;

pub const MAX_CATEGORY_NAME_LEN: usize = 128;

#[derive(Debug, Clone, Default)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub color: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i32>,
}

pub async fn list(
    db: &DatabaseConnection,
    active_only: bool,
) -> DomainResult<Vec<category::Model>> {
    let mut select = category::Entity::find();
    if active_only {
        select = select.filter(category::Column::IsActive.eq(true));
    }
    let categories = select
        .order_by(category::Column::SortOrder, Order::Asc)
        .order_by(category::Column::Name, Order::Asc)
        .all(db)
        .await?;
    Ok(categories)
}

pub async fn get(db: &DatabaseConnection, category_id: i64) -> DomainResult<category::Model> {
    category::Entity::find_by_id(category_id)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("category {category_id}")))
}

pub async fn create(db: &DatabaseConnection, new: NewCategory) -> DomainResult<category::Model> {
    let name = validate_name(&new.name)?;
    let slug = slugify(&name);

    let duplicate = category::Entity::find()
        .filter(
            category::Column::Name
                .eq(name.clone())
                .or(category::Column::Slug.eq(slug.clone())),
        )
        .count(db)
        .await?;
    if duplicate > 0 {
        return Err(DomainError::conflict(format!(
            "category '{name}' already exists"
        )));
    }

    let now = Utc::now().fixed_offset();
    let active = category::ActiveModel {
        id: ActiveValue::NotSet,
        name: ActiveValue::Set(name),
        slug: ActiveValue::Set(slug),
        description: ActiveValue::Set(new.description),
        color: ActiveValue::Set(new.color),
        is_active: ActiveValue::Set(true),
        sort_order: ActiveValue::Set(new.sort_order.unwrap_or(0)),
        created_at: ActiveValue::Set(now),
        updated_at: ActiveValue::Set(now),
    };
    // Racing creates can both pass the pre-check; the unique index decides
    let saved = active.insert(db).await.map_err(|err| {
        map_unique_violation(err, DomainError::conflict("category already exists"))
    })?;
    Ok(saved)
}

/// Renames keep the slug, same as feature requests.
pub async fn update(
    db: &DatabaseConnection,
    category_id: i64,
    patch: CategoryPatch,
) -> DomainResult<category::Model> {
    let existing = get(db, category_id).await?;
    let mut active: category::ActiveModel = existing.into();

    if let Some(name) = patch.name {
        let name = validate_name(&name)?;
        let duplicate = category::Entity::find()
            .filter(category::Column::Name.eq(name.clone()))
            .filter(category::Column::Id.ne(category_id))
            .count(db)
            .await?;
        if duplicate > 0 {
            return Err(DomainError::conflict(format!(
                "category '{name}' already exists"
            )));
        }
        active.name = ActiveValue::Set(name);
    }
    if let Some(description) = patch.description {
        active.description = ActiveValue::Set(description);
    }
    if let Some(color) = patch.color {
        active.color = ActiveValue::Set(color);
    }
    if let Some(is_active) = patch.is_active {
        active.is_active = ActiveValue::Set(is_active);
    }
    if let Some(sort_order) = patch.sort_order {
        active.sort_order = ActiveValue::Set(sort_order);
    }
    active.updated_at = ActiveValue::Set(Utc::now().fixed_offset());

    let saved = active.update(db).await?;
    Ok(saved)
}

/// Hard delete; the store's SET NULL action detaches feature requests
/// instead of cascading.
pub async fn delete(db: &DatabaseConnection, category_id: i64) -> DomainResult<()> {
    let result = category::Entity::delete_by_id(category_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(DomainError::not_found(format!("category {category_id}")));
    }
    Ok(())
}

fn validate_name(name: &str) -> DomainResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("name", "must not be empty"));
    }
    if trimmed.chars().count() > MAX_CATEGORY_NAME_LEN {
        return Err(DomainError::validation(
            "name",
            format!("must be at most {MAX_CATEGORY_NAME_LEN} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_validation() {
        assert_eq!(validate_name(" Integrations ").unwrap(), "Integrations");
        assert!(validate_name("").is_err());
        let long = "x".repeat(MAX_CATEGORY_NAME_LEN + 1);
        assert!(validate_name(&long).is_err());
    }
}
