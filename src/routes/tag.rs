use actix_web::{web, HttpResponse};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::{Deserialize, Serialize};

use super::post::{to_post_dto, PostDto};
use crate::entity::tag;
use crate::error::{map_tx_error, AppError};
use crate::response::{ok, ok_empty};
use crate::store::tag as tag_store;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("").route(web::get().to(list)))
        .service(web::resource("/new").route(web::post().to(create)))
        .service(web::resource("/{id:\\d+}").route(web::get().to(get)))
        .service(web::resource("/{id:\\d+}/edit").route(web::post().to(rename)))
        .service(web::resource("/{id:\\d+}/delete").route(web::post().to(remove)));
}

#[derive(Deserialize)]
struct TagRequest {
    name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct TagDto {
    id: i32,
    name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TagDetailDto {
    #[serde(flatten)]
    tag: TagDto,
    posts: Vec<PostDto>,
}

async fn list(db: web::Data<DatabaseConnection>) -> Result<HttpResponse, AppError> {
    let rows = tag_store::list(db.get_ref()).await?;
    let list = rows.into_iter().map(to_tag_dto).collect::<Vec<_>>();
    Ok(ok(list))
}

async fn create(
    db: web::Data<DatabaseConnection>,
    payload: web::Json<TagRequest>,
) -> Result<HttpResponse, AppError> {
    let name = payload.into_inner().name.unwrap_or_default();
    let created = db
        .transaction::<_, tag::Model, AppError>(move |txn| {
            Box::pin(async move { tag_store::create(txn, &name).await })
        })
        .await
        .map_err(map_tx_error)?;

    Ok(ok(to_tag_dto(created)))
}

async fn get(
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let found = tag_store::get(db.get_ref(), id).await?;
    let posts = tag_store::posts_of(db.get_ref(), id).await?;
    Ok(ok(TagDetailDto {
        tag: to_tag_dto(found),
        posts: posts.into_iter().map(to_post_dto).collect(),
    }))
}

async fn rename(
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    payload: web::Json<TagRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let name = payload.into_inner().name.unwrap_or_default();
    let renamed = db
        .transaction::<_, tag::Model, AppError>(move |txn| {
            Box::pin(async move { tag_store::rename(txn, id, &name).await })
        })
        .await
        .map_err(map_tx_error)?;

    Ok(ok(to_tag_dto(renamed)))
}

async fn remove(
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    db.transaction::<_, (), AppError>(move |txn| {
        Box::pin(async move { tag_store::delete(txn, id).await })
    })
    .await
    .map_err(map_tx_error)?;

    Ok(ok_empty())
}

pub(super) fn to_tag_dto(model: tag::Model) -> TagDto {
    TagDto {
        id: model.id,
        name: model.name,
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test;
    use serde_json::{json, Value};

    use crate::db::connect_memory;
    use crate::store::fixtures::{seed_post, seed_user};
    use crate::store::tag as tag_store;

    #[actix_rt::test]
    async fn lists_tags_by_name() {
        let db = connect_memory().await;
        for name in ["Fun", "Gardening", "Food & Beverage"] {
            tag_store::create(&db, name).await.unwrap();
        }
        let app = test_app!(db);

        let req = test::TestRequest::get().uri("/api/tags").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let names: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Food & Beverage", "Fun", "Gardening"]);
    }

    #[actix_rt::test]
    async fn creating_taken_name_is_rejected() {
        let db = connect_memory().await;
        tag_store::create(&db, "Fun").await.unwrap();
        let app = test_app!(db);

        let req = test::TestRequest::post()
            .uri("/api/tags/new")
            .set_json(json!({ "name": "Fun" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["code"], 1);
        assert_eq!(body["msg"], "tag Fun already exists");
    }

    #[actix_rt::test]
    async fn rename_shows_through_tagged_posts() {
        let db = connect_memory().await;
        let user = seed_user(&db, "Avery", "Lenox").await;
        let post = seed_post(&db, user.id, "My favorite post", &["Fun"]).await;
        let fun = tag_store::list(&db).await.unwrap().remove(0);
        let app = test_app!(db);

        let req = test::TestRequest::post()
            .uri(&format!("/api/tags/{}/edit", fun.id))
            .set_json(json!({ "name": "Adventure" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["id"], fun.id);
        assert_eq!(body["data"]["name"], "Adventure");

        let req = test::TestRequest::get().uri(&format!("/api/posts/{}", post.id)).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["tags"], json!([{ "id": fun.id, "name": "Adventure" }]));
    }

    #[actix_rt::test]
    async fn delete_keeps_posts() {
        let db = connect_memory().await;
        let user = seed_user(&db, "Avery", "Lenox").await;
        let post = seed_post(&db, user.id, "My favorite post", &["Gardening"]).await;
        let gardening = tag_store::list(&db).await.unwrap().remove(0);
        let app = test_app!(db);

        let req = test::TestRequest::get().uri(&format!("/api/tags/{}", gardening.id)).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["posts"][0]["id"], post.id);

        let req = test::TestRequest::post()
            .uri(&format!("/api/tags/{}/delete", gardening.id))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["code"], 0);

        let req = test::TestRequest::get().uri(&format!("/api/posts/{}", post.id)).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["code"], 0);
        assert_eq!(body["data"]["tags"], json!([]));

        let req = test::TestRequest::get().uri(&format!("/api/tags/{}", gardening.id)).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["code"], 4);
    }
}
