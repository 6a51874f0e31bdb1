pub mod attendance;
pub mod auth;
pub mod comment;
pub mod event;
pub mod notification;
pub mod user;

use actix_web::{get, web, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;

use crate::{
    errors::ApiError,
    service::{auth::AuthMiddleware, tags::PREDEFINED_TAGS},
};

#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

#[get("/tags")]
pub async fn tags() -> impl Responder {
    HttpResponse::Ok().json(json!({ "tags": PREDEFINED_TAGS }))
}

/// Malformed bodies, queries and path segments answer with the same JSON error
/// shape as every other failure.
fn extractor_configs(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::validation(format!("Invalid JSON body: {err}")).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ApiError::validation(format!("Invalid query: {err}")).into()),
    )
    .app_data(web::PathConfig::default().error_handler(|_err, _req| ApiError::NotFound("resource").into()));
}

/// Mounts every route. Everything except health, tags, signup, login and the
/// reminder trigger sits behind [`AuthMiddleware`].
pub fn config(cfg: &mut web::ServiceConfig, jwt_secret: &str) {
    extractor_configs(cfg);
    cfg.service(health).service(tags);

    cfg.service(
        web::scope("/auth")
            .configure(auth::init_public_routes)
            .service(
                web::resource("/me")
                    .wrap(AuthMiddleware::new(jwt_secret))
                    .route(web::get().to(auth::me)),
            )
            .service(
                web::resource("/update-profile")
                    .wrap(AuthMiddleware::new(jwt_secret))
                    .route(web::put().to(auth::update_profile)),
            ),
    );

    cfg.service(
        web::scope("/events")
            .wrap(AuthMiddleware::new(jwt_secret))
            .configure(attendance::init_routes)
            .configure(comment::init_event_routes)
            .configure(event::init_routes),
    );

    cfg.service(
        web::scope("/comments")
            .wrap(AuthMiddleware::new(jwt_secret))
            .configure(comment::init_routes),
    );

    cfg.configure(notification::init_public_routes);
    cfg.service(
        web::scope("/notifications")
            .wrap(AuthMiddleware::new(jwt_secret))
            .configure(notification::init_routes_with_auth),
    );

    cfg.service(
        web::scope("/users")
            .wrap(AuthMiddleware::new(jwt_secret))
            .configure(user::init_routes),
    );
}
