use actix_web::{get, post, web, HttpRequest, HttpResponse};
use serde_json::json;
use uuid::Uuid;

use crate::{
    errors::ApiError,
    service::{self, auth::current_user},
    PGPool,
};

#[post("/{id}/register")]
pub async fn register(event_id: web::Path<Uuid>, req: HttpRequest, pool_state: web::Data<PGPool>) -> Result<HttpResponse, ApiError> {
    let user_id = current_user(&req)?;
    let attendance = service::attendance::register(event_id.into_inner(), user_id, pool_state.get_ref()).await?;
    Ok(HttpResponse::Created().json(json!({
        "message": "Successfully registered for event",
        "attendance": attendance,
    })))
}

#[post("/{id}/unregister")]
pub async fn unregister(event_id: web::Path<Uuid>, req: HttpRequest, pool_state: web::Data<PGPool>) -> Result<HttpResponse, ApiError> {
    let user_id = current_user(&req)?;
    service::attendance::unregister(event_id.into_inner(), user_id, pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully unregistered from event" })))
}

#[get("/{id}/attendees")]
pub async fn attendees(event_id: web::Path<Uuid>, pool_state: web::Data<PGPool>) -> Result<HttpResponse, ApiError> {
    let attendees = service::attendance::list_attendees(event_id.into_inner(), pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(json!({ "attendees": attendees })))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(register).service(unregister).service(attendees);
}
