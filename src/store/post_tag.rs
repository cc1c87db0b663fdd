use log::debug;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

use crate::entity::{post, post_tag, tag};
use crate::error::AppError;

/// Links the pair. Linking an already linked pair is a no-op.
pub async fn link<C: ConnectionTrait>(db: &C, post_id: i32, tag_id: i32) -> Result<(), AppError> {
    if post::Entity::find_by_id(post_id).one(db).await?.is_none() {
        return Err(AppError::missing_ref("post", post_id));
    }
    if tag::Entity::find_by_id(tag_id).one(db).await?.is_none() {
        return Err(AppError::missing_ref("tag", tag_id));
    }
    if post_tag::Entity::find_by_id((post_id, tag_id)).one(db).await?.is_some() {
        return Ok(());
    }
    insert_link(db, post_id, tag_id).await
}

pub async fn unlink<C: ConnectionTrait>(db: &C, post_id: i32, tag_id: i32) -> Result<(), AppError> {
    let removed = post_tag::Entity::delete_by_id((post_id, tag_id))
        .exec(db)
        .await?
        .rows_affected;
    if removed > 0 {
        debug!("post_tag unlinked post={} tag={}", post_id, tag_id);
    }
    Ok(())
}

pub async fn list_tags_for_post<C: ConnectionTrait>(db: &C, post_id: i32) -> Result<Vec<tag::Model>, AppError> {
    let exist = post::Entity::find_by_id(post_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("post", post_id))?;
    let rows = exist
        .find_related(tag::Entity)
        .order_by_asc(tag::Column::Name)
        .all(db)
        .await?;
    Ok(rows)
}

pub(super) async fn tag_ids_for_post<C: ConnectionTrait>(db: &C, post_id: i32) -> Result<Vec<i32>, AppError> {
    let ids = post_tag::Entity::find()
        .select_only()
        .column(post_tag::Column::TagId)
        .filter(post_tag::Column::PostId.eq(post_id))
        .into_tuple()
        .all(db)
        .await?;
    Ok(ids)
}

async fn insert_link<C: ConnectionTrait>(db: &C, post_id: i32, tag_id: i32) -> Result<(), AppError> {
    post_tag::Entity::insert(post_tag::ActiveModel {
        post_id: Set(post_id),
        tag_id: Set(tag_id),
    })
    .exec(db)
    .await?;
    debug!("post_tag linked post={} tag={}", post_id, tag_id);
    Ok(())
}
