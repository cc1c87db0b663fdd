use log::debug;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use super::required;
use crate::entity::user::DEFAULT_IMAGE_URL;
use crate::entity::{post, post_tag, user};
use crate::error::AppError;

pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub img_url: Option<String>,
}

#[derive(Default)]
pub struct UserChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub img_url: Option<String>,
}

/// Blank or missing picture URLs fall back to the placeholder.
fn resolve_img_url(img_url: Option<&str>) -> String {
    img_url
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_IMAGE_URL)
        .to_string()
}

pub async fn create<C: ConnectionTrait>(db: &C, new: NewUser) -> Result<user::Model, AppError> {
    let first_name = required("first name", &new.first_name)?;
    let last_name = required("last name", &new.last_name)?;

    let inserted = user::ActiveModel {
        first_name: Set(first_name),
        last_name: Set(last_name),
        img_url: Set(resolve_img_url(new.img_url.as_deref())),
        ..Default::default()
    }
    .insert(db)
    .await?;
    debug!("user created id={}", inserted.id);
    Ok(inserted)
}

pub async fn get<C: ConnectionTrait>(db: &C, id: i32) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("user", id))
}

pub async fn list<C: ConnectionTrait>(db: &C) -> Result<Vec<user::Model>, AppError> {
    let rows = user::Entity::find()
        .order_by_asc(user::Column::LastName)
        .order_by_asc(user::Column::FirstName)
        .order_by_asc(user::Column::Id)
        .all(db)
        .await?;
    Ok(rows)
}

pub async fn update<C: ConnectionTrait>(
    db: &C,
    id: i32,
    changes: UserChanges,
) -> Result<user::Model, AppError> {
    let exist = get(db, id).await?;
    let mut active: user::ActiveModel = exist.into();

    if let Some(v) = changes.first_name {
        active.first_name = Set(required("first name", &v)?);
    }
    if let Some(v) = changes.last_name {
        active.last_name = Set(required("last name", &v)?);
    }
    if let Some(v) = changes.img_url {
        active.img_url = Set(resolve_img_url(Some(&v)));
    }

    if !active.is_changed() {
        return get(db, id).await;
    }
    let updated = active.update(db).await?;
    debug!("user updated id={}", id);
    Ok(updated)
}

/// Removes the user together with every post it wrote and those posts' tag links.
pub async fn delete<C: ConnectionTrait>(db: &C, id: i32) -> Result<(), AppError> {
    let exist = get(db, id).await?;

    let post_ids: Vec<i32> = post::Entity::find()
        .select_only()
        .column(post::Column::Id)
        .filter(post::Column::Creator.eq(id))
        .into_tuple()
        .all(db)
        .await?;

    if !post_ids.is_empty() {
        post_tag::Entity::delete_many()
            .filter(post_tag::Column::PostId.is_in(post_ids.clone()))
            .exec(db)
            .await?;
        post::Entity::delete_many()
            .filter(post::Column::Creator.eq(id))
            .exec(db)
            .await?;
    }

    exist.delete(db).await?;
    debug!("user deleted id={} posts={}", id, post_ids.len());
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
