use actix_web::{
    error,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use derive_more::Display;
use log::error;

#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[display(fmt = "{}", _0)]
    Validation(String),

    #[display(fmt = "invalid date format for '{}'", _0)]
    InvalidDateFormat(String),

    #[display(fmt = "{} not found", _0)]
    NotFound(&'static str),

    #[display(fmt = "authentication required")]
    Unauthenticated,

    #[display(fmt = "unauthorized")]
    Unauthorized,

    #[display(fmt = "{}", _0)]
    Conflict(String),

    #[display(fmt = "event is full")]
    CapacityExceeded,

    #[display(fmt = "internal error")]
    Persistence,
}

impl std::error::Error for ApiError {}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_error",
            ApiError::InvalidDateFormat(_) => "invalid_date_format",
            ApiError::NotFound(_) => "not_found",
            ApiError::Unauthenticated => "unauthenticated",
            ApiError::Unauthorized => "unauthorized",
            ApiError::Conflict(_) => "conflict",
            ApiError::CapacityExceeded => "capacity_exceeded",
            ApiError::Persistence => "persistence_error",
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn required(field: &str) -> Self {
        ApiError::Validation(format!("{field} is required"))
    }
}

impl error::ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(serde_json::json!({
                "error": self.to_string(),
                "kind": self.kind(),
            }))
    }

    fn status_code(&self) -> StatusCode {
        match *self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidDateFormat(_) => StatusCode::BAD_REQUEST,
            ApiError::CapacityExceeded => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Unauthorized => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return ApiError::Conflict("resource already exists".to_string());
            }
            if db_err.is_check_violation() {
                return ApiError::Validation(format!(
                    "constraint violated: {}",
                    db_err.constraint().unwrap_or("unknown")
                ));
            }
        }
        error!("database error: {:?}", err);
        ApiError::Persistence
    }
}
