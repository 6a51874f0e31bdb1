use std::collections::HashMap;

use actix_multipart::Multipart;
use actix_web::{delete, get, http::header, post, put, web, HttpRequest, HttpResponse};
use futures_util::{StreamExt, TryStreamExt};
use serde_json::json;
use uuid::Uuid;

use crate::{
    dto::{EventFilterQuery, EventForm, EventResponse},
    errors::ApiError,
    models::Event,
    service::{self, auth::current_user, push::PushService, upload::UploadStore},
    PGPool,
};

const MAX_JSON_BODY: usize = 256 * 1024;
const MAX_FIELD_BYTES: usize = 5 * 1024 * 1024;

fn responses(events: Vec<Event>) -> Vec<EventResponse> {
    events.into_iter().map(EventResponse::from).collect()
}

fn is_multipart(req: &HttpRequest) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false)
}

async fn read_json_body(mut payload: web::Payload) -> Result<web::BytesMut, ApiError> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|err| ApiError::validation(format!("Could not read request body: {err}")))?;
        if body.len() + chunk.len() > MAX_JSON_BODY {
            return Err(ApiError::validation("Request body is too large"));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

async fn read_multipart(
    req: &HttpRequest,
    payload: web::Payload,
    uploads: &UploadStore,
) -> Result<(EventForm, Option<String>), ApiError> {
    let malformed = |err: actix_multipart::MultipartError| ApiError::validation(format!("Malformed form data: {err}"));

    let mut multipart = Multipart::new(req.headers(), payload);
    let mut fields = HashMap::new();
    let mut image: Option<(String, Vec<u8>)> = None;

    while let Some(mut field) = multipart.try_next().await.map_err(malformed)? {
        let disposition = field.content_disposition();
        let name = disposition.get_name().unwrap_or_default().to_string();
        let filename = disposition.get_filename().map(str::to_string);

        let mut data = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(malformed)? {
            if data.len() + chunk.len() > MAX_FIELD_BYTES {
                return Err(ApiError::validation(format!("Field '{name}' is too large")));
            }
            data.extend_from_slice(&chunk);
        }

        match filename {
            Some(filename) if name == "image" => image = Some((filename, data)),
            _ => {
                let text = String::from_utf8(data)
                    .map_err(|_| ApiError::validation(format!("Field '{name}' is not valid text")))?;
                fields.insert(name, text);
            }
        }
    }

    let mut form = EventForm::from_fields(fields);
    let mut fresh = None;
    if let Some((filename, bytes)) = image.filter(|(_, bytes)| !bytes.is_empty()) {
        let stored = uploads.save(Some(&filename), &bytes).await?;
        if stored.is_new {
            fresh = Some(stored.url.clone());
        }
        form.image = Some(stored.url);
    }
    Ok((form, fresh))
}

/// Reads an event form from either a JSON or a `multipart/form-data` body.
/// The second value is the URL of an image file first written by this
/// request, to be removed again if the request fails.
async fn read_event_form(
    req: &HttpRequest,
    payload: web::Payload,
    uploads: &UploadStore,
) -> Result<(EventForm, Option<String>), ApiError> {
    if is_multipart(req) {
        return read_multipart(req, payload, uploads).await;
    }
    let body = read_json_body(payload).await?;
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok((EventForm::default(), None));
    }
    let form = serde_json::from_slice(&body).map_err(|err| ApiError::validation(format!("Invalid JSON body: {err}")))?;
    Ok((form, None))
}

#[get("")]
pub async fn list(query: web::Query<EventFilterQuery>, pool_state: web::Data<PGPool>) -> Result<HttpResponse, ApiError> {
    let events = service::event::list(query.into_inner(), pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(json!({ "events": responses(events) })))
}

#[post("")]
pub async fn create(
    req: HttpRequest,
    payload: web::Payload,
    pool_state: web::Data<PGPool>,
    uploads: web::Data<UploadStore>,
) -> Result<HttpResponse, ApiError> {
    let user_id = current_user(&req)?;
    let (form, stored) = read_event_form(&req, payload, uploads.get_ref()).await?;

    match service::event::create(user_id, form, pool_state.get_ref()).await {
        Ok(event) => Ok(HttpResponse::Created().json(json!({
            "message": "Event created successfully",
            "event": EventResponse::from(event),
        }))),
        Err(err) => {
            if let Some(url) = stored {
                uploads.remove(&url).await;
            }
            Err(err)
        }
    }
}

#[get("/{id}")]
pub async fn get_by_id(id: web::Path<Uuid>, pool_state: web::Data<PGPool>) -> Result<HttpResponse, ApiError> {
    let event = service::event::get_by_id(id.into_inner(), pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(json!({ "event": EventResponse::from(event) })))
}

#[put("/{id}")]
pub async fn update(
    id: web::Path<Uuid>,
    req: HttpRequest,
    payload: web::Payload,
    pool_state: web::Data<PGPool>,
    push: web::Data<PushService>,
    uploads: web::Data<UploadStore>,
) -> Result<HttpResponse, ApiError> {
    let user_id = current_user(&req)?;
    let (form, stored) = read_event_form(&req, payload, uploads.get_ref()).await?;

    let result = service::event::update(id.into_inner(), user_id, form, pool_state.get_ref(), push.get_ref()).await;
    match result {
        Ok(event) => Ok(HttpResponse::Ok().json(json!({
            "message": "Event updated successfully",
            "event": EventResponse::from(event),
        }))),
        Err(err) => {
            if let Some(url) = stored {
                uploads.remove(&url).await;
            }
            Err(err)
        }
    }
}

#[delete("/{id}")]
pub async fn delete(id: web::Path<Uuid>, req: HttpRequest, pool_state: web::Data<PGPool>) -> Result<HttpResponse, ApiError> {
    let user_id = current_user(&req)?;
    service::event::delete(id.into_inner(), user_id, pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Event deleted successfully" })))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list)
        .service(create)
        .service(get_by_id)
        .service(update)
        .service(delete);
}
