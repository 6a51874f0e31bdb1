use actix_web::{get, post, put, web, HttpRequest, HttpResponse};
use chrono::Utc;
use log::info;
use serde_json::json;
use uuid::Uuid;

use crate::{
    dto::DeviceRegistrationDto,
    errors::ApiError,
    service::{self, auth::current_user, push::PushService},
    PGPool,
};

#[get("")]
pub async fn list(req: HttpRequest, pool_state: web::Data<PGPool>) -> Result<HttpResponse, ApiError> {
    let user_id = current_user(&req)?;
    let notifications = service::notification::list(user_id, pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(json!({ "notifications": notifications })))
}

#[put("/mark-all")]
pub async fn mark_all_read(req: HttpRequest, pool_state: web::Data<PGPool>) -> Result<HttpResponse, ApiError> {
    let user_id = current_user(&req)?;
    let count = service::notification::mark_all_read(user_id, pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": format!("Marked {count} notifications as read"),
        "count": count,
    })))
}

#[put("/{id}")]
pub async fn mark_read(id: web::Path<Uuid>, req: HttpRequest, pool_state: web::Data<PGPool>) -> Result<HttpResponse, ApiError> {
    let user_id = current_user(&req)?;
    let notification = service::notification::mark_read(id.into_inner(), user_id, pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(notification))
}

#[post("/register-device")]
pub async fn register_device(
    req: HttpRequest,
    dto: web::Json<DeviceRegistrationDto>,
    pool_state: web::Data<PGPool>,
    push: web::Data<PushService>,
) -> Result<HttpResponse, ApiError> {
    let user_id = current_user(&req)?;
    let added = service::notification::register_device(user_id, dto.into_inner(), pool_state.get_ref(), push.get_ref()).await?;
    let message = if added {
        "Device token registered successfully"
    } else {
        "Device token already registered"
    };
    Ok(HttpResponse::Ok().json(json!({ "message": message })))
}

/// Cron trigger for the reminder sweep. Unauthenticated.
pub async fn create_reminders(pool_state: web::Data<PGPool>, push: web::Data<PushService>) -> Result<HttpResponse, ApiError> {
    let count = service::notification::reminder_sweep(Utc::now(), pool_state.get_ref(), push.get_ref()).await?;
    info!("reminder sweep triggered over http created {} notifications", count);
    Ok(HttpResponse::Ok().json(json!({
        "message": format!("Created {count} reminder notifications"),
        "count": count,
    })))
}

/// Must be mounted before the authenticated `/notifications` scope.
pub fn init_public_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/notifications/create-reminders").route(web::post().to(create_reminders)));
}

pub fn init_routes_with_auth(cfg: &mut web::ServiceConfig) {
    cfg.service(list)
        .service(mark_all_read)
        .service(register_device)
        .service(mark_read);
}
