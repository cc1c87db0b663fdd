use std::collections::HashMap;

use log::debug;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder,
    Set,
};

use super::required;
use crate::entity::{post, post_tag, tag};
use crate::error::AppError;

/// Submitted tag names, trimmed, blanks dropped, duplicates collapsed to
/// their first occurrence.
pub fn normalize_names(names: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let name = name.trim();
        if !name.is_empty() && !out.iter().any(|n| n == name) {
            out.push(name.to_string());
        }
    }
    out
}

async fn find_by_name<C: ConnectionTrait>(db: &C, name: &str) -> Result<Option<tag::Model>, AppError> {
    let found = tag::Entity::find()
        .filter(tag::Column::Name.eq(name))
        .one(db)
        .await?;
    Ok(found)
}

async fn ensure_name_free<C: ConnectionTrait>(db: &C, name: &str, owner: Option<i32>) -> Result<(), AppError> {
    match find_by_name(db, name).await? {
        Some(other) if Some(other.id) != owner => {
            Err(AppError::param_error(format!("tag {} already exists", name)))
        }
        _ => Ok(()),
    }
}

pub async fn create<C: ConnectionTrait>(db: &C, name: &str) -> Result<tag::Model, AppError> {
    let name = required("tag name", name)?;
    ensure_name_free(db, &name, None).await?;
    let inserted = tag::ActiveModel {
        name: Set(name),
        ..Default::default()
    }
    .insert(db)
    .await?;
    debug!("tag created id={} name={}", inserted.id, inserted.name);
    Ok(inserted)
}

pub async fn get<C: ConnectionTrait>(db: &C, id: i32) -> Result<tag::Model, AppError> {
    tag::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("tag", id))
}

pub async fn list<C: ConnectionTrait>(db: &C) -> Result<Vec<tag::Model>, AppError> {
    let rows = tag::Entity::find()
        .order_by_asc(tag::Column::Name)
        .order_by_asc(tag::Column::Id)
        .all(db)
        .await?;
    Ok(rows)
}

/// Renames in place; the id and every post link stay as they were.
pub async fn rename<C: ConnectionTrait>(db: &C, id: i32, name: &str) -> Result<tag::Model, AppError> {
    let exist = get(db, id).await?;
    let name = required("tag name", name)?;
    ensure_name_free(db, &name, Some(id)).await?;

    let mut active: tag::ActiveModel = exist.into();
    active.name = Set(name);
    let updated = active.update(db).await?;
    debug!("tag renamed id={} name={}", id, updated.name);
    Ok(updated)
}

/// Removes the tag and its links; the posts it was attached to remain.
pub async fn delete<C: ConnectionTrait>(db: &C, id: i32) -> Result<(), AppError> {
    let exist = get(db, id).await?;
    let unlinked = post_tag::Entity::delete_many()
        .filter(post_tag::Column::TagId.eq(id))
        .exec(db)
        .await?
        .rows_affected;
    exist.delete(db).await?;
    debug!("tag deleted id={} unlinked={}", id, unlinked);
    Ok(())
}

pub async fn posts_of<C: ConnectionTrait>(db: &C, id: i32) -> Result<Vec<post::Model>, AppError> {
    let exist = get(db, id).await?;
    let rows = exist
        .find_related(post::Entity)
        .order_by_desc(post::Column::CreatedAt)
        .order_by_desc(post::Column::Id)
        .all(db)
        .await?;
    Ok(rows)
}

/// Resolves each distinct name to a tag row, reusing an exact-name match or
/// inserting a new one. Returned in submission order.
pub async fn find_or_create<C: ConnectionTrait>(db: &C, names: &[String]) -> Result<Vec<tag::Model>, AppError> {
    let names = normalize_names(names);
    if names.is_empty() {
        return Ok(Vec::new());
    }

    let mut known: HashMap<String, tag::Model> = tag::Entity::find()
        .filter(tag::Column::Name.is_in(names.clone()))
        .all(db)
        .await?
        .into_iter()
        .map(|t| (t.name.clone(), t))
        .collect();

    let mut resolved = Vec::with_capacity(names.len());
    for name in names {
        let model = match known.remove(&name) {
            Some(model) => model,
            None => {
                let inserted = tag::ActiveModel {
                    name: Set(name),
                    ..Default::default()
                }
                .insert(db)
                .await?;
                debug!("tag created on demand id={} name={}", inserted.id, inserted.name);
                inserted
            }
        };
        resolved.push(model);
    }
    Ok(resolved)
}
