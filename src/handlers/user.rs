use actix_web::{get, web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::{
    dto::EventResponse,
    errors::ApiError,
    models::Event,
    service::{self, auth::current_user},
    PGPool,
};

fn events_body(events: Vec<Event>) -> serde_json::Value {
    let events: Vec<EventResponse> = events.into_iter().map(EventResponse::from).collect();
    json!({ "events": events })
}

/// The caller's own active events by start date.
#[get("/me/events")]
pub async fn my_events(req: HttpRequest, pool_state: web::Data<PGPool>) -> Result<HttpResponse, ApiError> {
    let user_id = current_user(&req)?;
    let events = service::event::get_own_active(user_id, pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(events_body(events)))
}

#[get("/me/created-events")]
pub async fn created_events(req: HttpRequest, pool_state: web::Data<PGPool>) -> Result<HttpResponse, ApiError> {
    let user_id = current_user(&req)?;
    let events = service::event::get_created_by(user_id, pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(events_body(events)))
}

#[get("/me/registered-events")]
pub async fn registered_events(req: HttpRequest, pool_state: web::Data<PGPool>) -> Result<HttpResponse, ApiError> {
    let user_id = current_user(&req)?;
    let events = service::event::get_user_participations(user_id, pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(events_body(events)))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(my_events)
        .service(created_events)
        .service(registered_events);
}
