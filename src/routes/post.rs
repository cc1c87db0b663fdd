use actix_web::{web, HttpResponse};
use chrono::SecondsFormat;
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::{Deserialize, Serialize};

use super::tag::{to_tag_dto, TagDto};
use super::user::{to_user_dto, UserDto};
use crate::entity::post;
use crate::error::{map_tx_error, AppError};
use crate::response::{ok, ok_empty};
use crate::store::post::{self as post_store, PostChanges};
use crate::store::{post_tag, user as user_store};

const RECENT_LIMIT: u64 = 5;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/recent").route(web::get().to(recent)))
        .service(web::resource("/{id:\\d+}").route(web::get().to(get)))
        .service(web::resource("/{id:\\d+}/edit").route(web::post().to(update)))
        .service(web::resource("/{id:\\d+}/delete").route(web::post().to(remove)));
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PostRequest {
    pub(super) title: Option<String>,
    pub(super) content: Option<String>,
    pub(super) tags: Option<Vec<String>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PostDto {
    id: i32,
    title: String,
    content: String,
    created_at: String,
    display_date: String,
    creator: i32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PostDetailDto {
    #[serde(flatten)]
    post: PostDto,
    author: UserDto,
    tags: Vec<TagDto>,
}

async fn recent(db: web::Data<DatabaseConnection>) -> Result<HttpResponse, AppError> {
    let rows = post_store::list_recent(db.get_ref(), RECENT_LIMIT).await?;
    let list = rows.into_iter().map(to_post_dto).collect::<Vec<_>>();
    Ok(ok(list))
}

async fn get(
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let found = post_store::get(db.get_ref(), path.into_inner()).await?;
    Ok(ok(build_detail(db.get_ref(), found).await?))
}

/// Absent fields stay as they are; a present `tags` list, even an empty
/// one, becomes the post's whole tag set.
async fn update(
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    payload: web::Json<PostRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let payload = payload.into_inner();
    let changes = PostChanges {
        title: payload.title,
        content: payload.content,
        tags: payload.tags,
    };

    let updated = db
        .transaction::<_, post::Model, AppError>(move |txn| {
            Box::pin(async move { post_store::update(txn, id, changes).await })
        })
        .await
        .map_err(map_tx_error)?;

    Ok(ok(build_detail(db.get_ref(), updated).await?))
}

async fn remove(
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    db.transaction::<_, (), AppError>(move |txn| {
        Box::pin(async move { post_store::delete(txn, id).await })
    })
    .await
    .map_err(map_tx_error)?;

    Ok(ok_empty())
}

async fn build_detail(db: &DatabaseConnection, model: post::Model) -> Result<PostDetailDto, AppError> {
    let author = user_store::get(db, model.creator).await?;
    let tags = post_tag::list_tags_for_post(db, model.id).await?;
    Ok(PostDetailDto {
        post: to_post_dto(model),
        author: to_user_dto(author),
        tags: tags.into_iter().map(to_tag_dto).collect(),
    })
}

pub(super) fn to_post_dto(model: post::Model) -> PostDto {
    PostDto {
        display_date: model.display_date(),
        created_at: model.created_at.to_rfc3339_opts(SecondsFormat::Millis, false),
        id: model.id,
        title: model.title,
        content: model.content,
        creator: model.creator,
    }
}
