use actix_web::{delete, get, post, web, HttpRequest, HttpResponse};
use serde_json::json;
use uuid::Uuid;

use crate::{
    dto::NewCommentDto,
    errors::ApiError,
    service::{self, auth::current_user, push::PushService},
    PGPool,
};

#[get("/{id}/comments")]
pub async fn list(event_id: web::Path<Uuid>, pool_state: web::Data<PGPool>) -> Result<HttpResponse, ApiError> {
    let comments = service::comment::list(event_id.into_inner(), pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(json!({ "comments": comments })))
}

#[post("/{id}/comments")]
pub async fn create(
    event_id: web::Path<Uuid>,
    req: HttpRequest,
    dto: web::Json<NewCommentDto>,
    pool_state: web::Data<PGPool>,
    push: web::Data<PushService>,
) -> Result<HttpResponse, ApiError> {
    let user_id = current_user(&req)?;
    let comment = service::comment::create(
        event_id.into_inner(),
        user_id,
        dto.into_inner(),
        pool_state.get_ref(),
        push.get_ref(),
    )
    .await?;
    Ok(HttpResponse::Created().json(json!({
        "message": "Comment created successfully",
        "comment": comment,
    })))
}

#[delete("/{id}")]
pub async fn delete(comment_id: web::Path<Uuid>, req: HttpRequest, pool_state: web::Data<PGPool>) -> Result<HttpResponse, ApiError> {
    let user_id = current_user(&req)?;
    service::comment::delete(comment_id.into_inner(), user_id, pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Comment deleted successfully" })))
}

/// Routes nested under `/events`.
pub fn init_event_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list).service(create);
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(delete);
}
