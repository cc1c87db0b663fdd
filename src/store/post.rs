use chrono::Utc;
use log::debug;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use super::{post_tag as links, required, tag as tags};
use crate::entity::{post, post_tag, tag, user};
use crate::error::AppError;

pub struct NewPost {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

/// `tags: Some(..)` replaces the whole tag set, `None` leaves it alone.
#[derive(Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

pub async fn create<C: ConnectionTrait>(db: &C, creator: i32, new: NewPost) -> Result<post::Model, AppError> {
    let title = required("title", &new.title)?;
    let content = required("content", &new.content)?;
    if user::Entity::find_by_id(creator).one(db).await?.is_none() {
        return Err(AppError::missing_ref("user", creator));
    }

    let inserted = post::ActiveModel {
        title: Set(title),
        content: Set(content),
        created_at: Set(Utc::now()),
        creator: Set(creator),
        ..Default::default()
    }
    .insert(db)
    .await?;
    debug!("post saved id={} creator={}", inserted.id, creator);

    set_tags(db, inserted.id, &new.tags).await?;
    Ok(inserted)
}

pub async fn get<C: ConnectionTrait>(db: &C, id: i32) -> Result<post::Model, AppError> {
    post::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("post", id))
}

pub async fn list_recent<C: ConnectionTrait>(db: &C, limit: u64) -> Result<Vec<post::Model>, AppError> {
    let rows = post::Entity::find()
        .order_by_desc(post::Column::CreatedAt)
        .order_by_desc(post::Column::Id)
        .limit(limit)
        .all(db)
        .await?;
    Ok(rows)
}

/// Title and content only; `created_at` and `creator` never change.
pub async fn update<C: ConnectionTrait>(db: &C, id: i32, changes: PostChanges) -> Result<post::Model, AppError> {
    let exist = get(db, id).await?;
    let mut active: post::ActiveModel = exist.clone().into();

    if let Some(v) = changes.title {
        active.title = Set(required("title", &v)?);
    }
    if let Some(v) = changes.content {
        active.content = Set(required("content", &v)?);
    }

    let updated = if active.is_changed() {
        active.update(db).await?
    } else {
        exist
    };
    if let Some(names) = changes.tags {
        set_tags(db, id, &names).await?;
    }
    debug!("post updated id={}", id);
    Ok(updated)
}

/// Removes the post and its tag links; the tags themselves remain.
pub async fn delete<C: ConnectionTrait>(db: &C, id: i32) -> Result<(), AppError> {
    let exist = get(db, id).await?;
    post_tag::Entity::delete_many()
        .filter(post_tag::Column::PostId.eq(id))
        .exec(db)
        .await?;
    exist.delete(db).await?;
    debug!("post deleted id={}", id);
    Ok(())
}

/// Makes the post's tag set exactly the resolved `names`: stale links are
/// removed, missing ones added, shared ones left untouched.
pub async fn set_tags<C: ConnectionTrait>(db: &C, post_id: i32, names: &[String]) -> Result<Vec<tag::Model>, AppError> {
    let resolved = tags::find_or_create(db, names).await?;
    let wanted: Vec<i32> = resolved.iter().map(|t| t.id).collect();
    let current = links::tag_ids_for_post(db, post_id).await?;

    let stale: Vec<i32> = current.iter().copied().filter(|id| !wanted.contains(id)).collect();
    for tag_id in &stale {
        links::unlink(db, post_id, *tag_id).await?;
    }
    for tag_id in wanted.iter().filter(|id| !current.contains(id)) {
        links::link(db, post_id, *tag_id).await?;
    }
    debug!("post tags synced id={} tags={:?} unlinked={:?}", post_id, wanted, stale);
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use sea_orm::{EntityTrait, PaginatorTrait};

    use super::*;
    use crate::db::connect_memory;
    use crate::store::fixtures::{seed_post, seed_user, tag_names};
    use crate::store::tag as tag_store;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[actix_rt::test]
    async fn create_captures_timestamp_and_creator() {
        let db = connect_memory().await;
        let user = seed_user(&db, "Samantha", "Wright").await;
        let before = Utc::now();
        let post = seed_post(&db, user.id, "Hello, world!", &[]).await;

        let stored = get(&db, post.id).await.unwrap();
        assert_eq!(stored.title, "Hello, world!");
        assert_eq!(stored.creator, user.id);
        assert!(stored.created_at >= before - chrono::Duration::seconds(1));
        assert_eq!(stored.display_date().len(), 16);
    }

    #[actix_rt::test]
    async fn create_with_unknown_creator_is_referential_error() {
        let db = connect_memory().await;
        let err = create(
            &db,
            99,
            NewPost {
                title: "A New Post".to_string(),
                content: "This is a test post".to_string(),
                tags: vec![],
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Referential { entity: "user", id: 99 }));
        assert_eq!(post::Entity::find().count(&db).await.unwrap(), 0);
    }

    #[actix_rt::test]
    async fn create_rejects_blank_title_or_content() {
        let db = connect_memory().await;
        let user = seed_user(&db, "Samantha", "Wright").await;
        for (title, content) in [("", "body"), ("title", "  ")] {
            let err = create(
                &db,
                user.id,
                NewPost {
                    title: title.to_string(),
                    content: content.to_string(),
                    tags: vec![],
                },
            )
            .await
            .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
        assert_eq!(post::Entity::find().count(&db).await.unwrap(), 0);
    }

    #[actix_rt::test]
    async fn duplicate_tag_names_collapse_to_one_link() {
        let db = connect_memory().await;
        let user = seed_user(&db, "Avery", "Lenox").await;
        let post = seed_post(&db, user.id, "My favorite post", &["Fun", "Fun", " Fun"]).await;

        assert_eq!(tag_names(&db, post.id).await, names(&["Fun"]));
        assert_eq!(post_tag::Entity::find().count(&db).await.unwrap(), 1);
        assert_eq!(tag::Entity::find().count(&db).await.unwrap(), 1);
    }

    #[actix_rt::test]
    async fn editing_tags_replaces_the_set() {
        let db = connect_memory().await;
        let user = seed_user(&db, "Avery", "Lenox").await;
        let post = seed_post(&db, user.id, "Test Post", &["A", "B"]).await;
        let b_before = tag_store::list(&db).await.unwrap().into_iter().find(|t| t.name == "B").unwrap();

        update(
            &db,
            post.id,
            PostChanges {
                tags: Some(names(&["B", "C"])),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(tag_names(&db, post.id).await, names(&["B", "C"]));
        let b_after = tag_store::list(&db).await.unwrap().into_iter().find(|t| t.name == "B").unwrap();
        assert_eq!(b_before.id, b_after.id);
        // A is unlinked, not deleted
        assert_eq!(tag_store::list(&db).await.unwrap().len(), 3);
    }

    #[actix_rt::test]
    async fn editing_with_empty_tag_list_unlinks_all() {
        let db = connect_memory().await;
        let user = seed_user(&db, "Avery", "Lenox").await;
        let post = seed_post(&db, user.id, "Test Post", &["Fun", "Gardening"]).await;

        update(
            &db,
            post.id,
            PostChanges {
                tags: Some(vec![]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(tag_names(&db, post.id).await.is_empty());
    }

    #[actix_rt::test]
    async fn edit_keeps_timestamp_creator_and_tags() {
        let db = connect_memory().await;
        let user = seed_user(&db, "Samantha", "Wright").await;
        let post = seed_post(&db, user.id, "Hello, world!", &["Fun"]).await;

        let edited = update(
            &db,
            post.id,
            PostChanges {
                title: Some("Hello, earth!".to_string()),
                content: Some("This post has been edited.".to_string()),
                tags: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(edited.title, "Hello, earth!");
        assert_eq!(edited.content, "This post has been edited.");
        assert_eq!(edited.created_at, post.created_at);
        assert_eq!(edited.creator, post.creator);
        assert_eq!(tag_names(&db, post.id).await, names(&["Fun"]));
    }

    #[actix_rt::test]
    async fn edit_unknown_post_is_not_found() {
        let db = connect_memory().await;
        let err = update(&db, 3, PostChanges::default()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { entity: "post", id: 3 }));
    }

    #[actix_rt::test]
    async fn delete_removes_links_but_not_tags() {
        let db = connect_memory().await;
        let user = seed_user(&db, "Samantha", "Wright").await;
        let post = seed_post(&db, user.id, "Hello, world!", &["Fun", "Gardening"]).await;

        delete(&db, post.id).await.unwrap();

        assert!(matches!(get(&db, post.id).await, Err(AppError::NotFound { .. })));
        assert_eq!(post_tag::Entity::find().count(&db).await.unwrap(), 0);
        assert_eq!(tag::Entity::find().count(&db).await.unwrap(), 2);
        assert!(matches!(delete(&db, post.id).await, Err(AppError::NotFound { .. })));
    }

    #[actix_rt::test]
    async fn deleting_author_makes_post_lookup_not_found() {
        let db = connect_memory().await;
        let user = seed_user(&db, "Samantha", "Wright").await;
        let post = seed_post(&db, user.id, "Hello, world!", &[]).await;

        crate::store::user::delete(&db, user.id).await.unwrap();
        assert!(matches!(get(&db, post.id).await, Err(AppError::NotFound { entity: "post", .. })));
    }

    #[actix_rt::test]
    async fn recent_is_newest_first_and_limited() {
        let db = connect_memory().await;
        let user = seed_user(&db, "Samantha", "Wright").await;
        let mut ids = Vec::new();
        for title in ["one", "two", "three"] {
            ids.push(seed_post(&db, user.id, title, &[]).await.id);
        }

        let recent: Vec<i32> = list_recent(&db, 2).await.unwrap().iter().map(|p| p.id).collect();
        assert_eq!(recent, vec![ids[2], ids[1]]);
    }
}
