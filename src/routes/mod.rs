use actix_web::web;

/// Test service over `routes::config` backed by the given connection.
#[cfg(test)]
macro_rules! test_app {
    ($db:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($db))
                .app_data(
                    actix_web::web::JsonConfig::default()
                        .error_handler(crate::response::json_error_handler),
                )
                .configure(crate::routes::config),
        )
        .await
    };
}

pub mod post;
pub mod tag;
pub mod user;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(web::scope("/users").configure(user::config))
            .service(web::scope("/posts").configure(post::config))
            .service(web::scope("/tags").configure(tag::config)),
    );
}
