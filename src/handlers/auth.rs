use actix_web::{post, web, HttpRequest, HttpResponse};
use log::info;
use serde_json::json;

use crate::{
    config::Config,
    dto::{LoginUserRequest, NewUserDto, UpdateProfileDto},
    errors::ApiError,
    service::{self, auth::current_user},
    PGPool,
};

#[post("/register")]
pub async fn register(
    dto: web::Json<NewUserDto>,
    config: web::Data<Config>,
    pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, ApiError> {
    let conn: &PGPool = pool_state.get_ref();
    let response = service::user::create(dto.into_inner(), &config.jwt_secret, conn).await?;
    Ok(HttpResponse::Created().json(response))
}

#[post("/login")]
pub async fn login(
    dto: web::Json<LoginUserRequest>,
    config: web::Data<Config>,
    pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, ApiError> {
    let conn: &PGPool = pool_state.get_ref();
    let response = service::user::login(dto.into_inner(), &config.jwt_secret, conn).await?;
    info!("user {} logged in", response.user.id);
    Ok(HttpResponse::Ok().json(response))
}

pub async fn me(req: HttpRequest, pool_state: web::Data<PGPool>) -> Result<HttpResponse, ApiError> {
    let user_id = current_user(&req)?;
    let user = service::user::get_by_id(user_id, pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(json!({ "user": user })))
}

pub async fn update_profile(
    req: HttpRequest,
    dto: web::Json<UpdateProfileDto>,
    pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, ApiError> {
    let user_id = current_user(&req)?;
    let user = service::user::update_profile(user_id, dto.into_inner(), pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Profile updated successfully",
        "user": user,
    })))
}

pub fn init_public_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(register).service(login);
}
