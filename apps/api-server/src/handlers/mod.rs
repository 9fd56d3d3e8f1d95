//! HTTP handlers and route configuration.

mod health;
mod multipart;
mod posts;
mod users;

use actix_web::web;

use crate::middleware::error::AppError;

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into())
}

fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into())
}

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config()).app_data(path_config()).service(
        web::scope("/api")
            // Public routes
            .route("/health", web::get().to(health::health_check))
            // Fixed paths go before `/{id}` so they are not shadowed by it
            .service(
                web::scope("/users")
                    .route("/register", web::post().to(users::register))
                    .route("/login", web::post().to(users::login))
                    .route("/change-avatar", web::post().to(users::change_avatar))
                    .route("/edit-user", web::patch().to(users::edit_user))
                    .route("", web::get().to(users::list_authors))
                    .route("/{id}", web::get().to(users::get_user)),
            )
            .service(
                web::scope("/posts")
                    .service(
                        web::resource("")
                            .route(web::get().to(posts::list_posts))
                            .route(web::post().to(posts::create_post)),
                    )
                    .route(
                        "/categories/{category}",
                        web::get().to(posts::posts_by_category),
                    )
                    .route("/users/{id}", web::get().to(posts::posts_by_author))
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(posts::get_post))
                            .route(web::patch().to(posts::edit_post))
                            .route(web::delete().to(posts::delete_post)),
                    ),
            ),
    );
}
