use actix_web::{web, HttpResponse};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::{Deserialize, Serialize};

use super::post::{to_post_dto, PostDto, PostRequest};
use crate::entity::{post, user};
use crate::error::{map_tx_error, AppError};
use crate::response::{ok, ok_empty};
use crate::store::post::{self as post_store, NewPost};
use crate::store::user::{self as user_store, NewUser, UserChanges};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("").route(web::get().to(list)))
        .service(web::resource("/new").route(web::post().to(create)))
        .service(web::resource("/{id:\\d+}").route(web::get().to(get)))
        .service(web::resource("/{id:\\d+}/edit").route(web::post().to(update)))
        .service(web::resource("/{id:\\d+}/delete").route(web::post().to(remove)))
        .service(web::resource("/{id:\\d+}/posts/new").route(web::post().to(create_post)));
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserRequest {
    first_name: Option<String>,
    last_name: Option<String>,
    image_url: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UserDto {
    id: i32,
    first_name: String,
    last_name: String,
    full_name: String,
    img_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserDetailDto {
    #[serde(flatten)]
    user: UserDto,
    posts: Vec<PostDto>,
}

async fn list(db: web::Data<DatabaseConnection>) -> Result<HttpResponse, AppError> {
    let rows = user_store::list(db.get_ref()).await?;
    let list = rows.into_iter().map(to_user_dto).collect::<Vec<_>>();
    Ok(ok(list))
}

async fn create(
    db: web::Data<DatabaseConnection>,
    payload: web::Json<UserRequest>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner();
    let new = NewUser {
        first_name: payload.first_name.unwrap_or_default(),
        last_name: payload.last_name.unwrap_or_default(),
        img_url: payload.image_url,
    };

    let created = db
        .transaction::<_, user::Model, AppError>(move |txn| {
            Box::pin(async move { user_store::create(txn, new).await })
        })
        .await
        .map_err(map_tx_error)?;

    Ok(ok(to_user_dto(created)))
}

async fn get(
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let found = user_store::get(db.get_ref(), id).await?;
    let posts = user_store::posts_of(db.get_ref(), id).await?;
    Ok(ok(UserDetailDto {
        user: to_user_dto(found),
        posts: posts.into_iter().map(to_post_dto).collect(),
    }))
}

async fn update(
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    payload: web::Json<UserRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let payload = payload.into_inner();
    let changes = UserChanges {
        first_name: payload.first_name,
        last_name: payload.last_name,
        img_url: payload.image_url,
    };

    let updated = db
        .transaction::<_, user::Model, AppError>(move |txn| {
            Box::pin(async move { user_store::update(txn, id, changes).await })
        })
        .await
        .map_err(map_tx_error)?;

    Ok(ok(to_user_dto(updated)))
}

async fn remove(
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    db.transaction::<_, (), AppError>(move |txn| {
        Box::pin(async move { user_store::delete(txn, id).await })
    })
    .await
    .map_err(map_tx_error)?;

    Ok(ok_empty())
}

async fn create_post(
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    payload: web::Json<PostRequest>,
) -> Result<HttpResponse, AppError> {
    let creator = path.into_inner();
    let payload = payload.into_inner();
    let new = NewPost {
        title: payload.title.unwrap_or_default(),
        content: payload.content.unwrap_or_default(),
        tags: payload.tags.unwrap_or_default(),
    };

    let created = db
        .transaction::<_, post::Model, AppError>(move |txn| {
            Box::pin(async move { post_store::create(txn, creator, new).await })
        })
        .await
        .map_err(map_tx_error)?;

    Ok(ok(to_post_dto(created)))
}

pub(super) fn to_user_dto(model: user::Model) -> UserDto {
    UserDto {
        full_name: model.get_full_name(),
        id: model.id,
        first_name: model.first_name,
        last_name: model.last_name,
        img_url: model.img_url,
    }
}
