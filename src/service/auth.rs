use std::future::{ready, Ready};
use std::rc::Rc;

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    HttpMessage, HttpRequest,
};
use futures_util::future::LocalBoxFuture;
use log::debug;
use uuid::Uuid;

use crate::errors::ApiError;

#[derive(Debug, Clone, Copy)]
pub struct UserAuthData {
    pub user_id: Uuid,
}

/// Reads the caller placed in request extensions by [`AuthMiddleware`].
pub fn current_user(req: &HttpRequest) -> Result<Uuid, ApiError> {
    req.extensions()
        .get::<UserAuthData>()
        .map(|data| data.user_id)
        .ok_or(ApiError::Unauthenticated)
}

/// Rejects requests without a valid bearer token; otherwise stores the token's
/// subject as [`UserAuthData`] for the handlers behind it.
pub struct AuthMiddleware {
    pub jwt_secret: Rc<String>,
}

impl AuthMiddleware {
    pub fn new(jwt_secret: &str) -> Self {
        Self {
            jwt_secret: Rc::new(jwt_secret.to_string()),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service,
            jwt_secret: self.jwt_secret.clone(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
    jwt_secret: Rc<String>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let claims = req
            .headers()
            .get(actix_web::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(jwt::parse_bearer)
            .map(|token| jwt::decode_claims(token, &self.jwt_secret));

        match claims {
            Some(Ok(claims)) => {
                req.extensions_mut().insert(UserAuthData { user_id: claims.sub });
                let fut = self.service.call(req);
                Box::pin(async move { fut.await })
            }
            Some(Err(err)) => {
                debug!("rejected bearer token: {}", err);
                Box::pin(async move { Err(ApiError::Unauthenticated.into()) })
            }
            None => Box::pin(async move { Err(ApiError::Unauthenticated.into()) }),
        }
    }
}

pub mod jwt {
    use chrono::Utc;
    use jsonwebtoken::{decode, encode, errors::Error, Algorithm, DecodingKey, EncodingKey, Header, Validation};
    use uuid::Uuid;

    use crate::dto::Claims;

    pub fn create(user_id: &Uuid, secret: &str, ttl_secs: usize) -> Result<String, Error> {
        let exp = Utc::now().timestamp() as usize + ttl_secs;
        let claims = Claims::new(user_id, exp);
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Verifies signature and expiry.
    pub fn decode_claims(token: &str, secret: &str) -> Result<Claims, Error> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
            .map(|data| data.claims)
    }

    pub fn parse_bearer(header: &str) -> Option<&str> {
        header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test as actix_test, web, App, HttpResponse};

    const SECRET: &str = "test-secret";

    #[test]
    fn token_round_trip_keeps_subject() {
        let id = Uuid::new_v4();
        let token = jwt::create(&id, SECRET, 60).unwrap();
        assert_eq!(jwt::decode_claims(&token, SECRET).unwrap().sub, id);
        assert!(jwt::decode_claims(&token, "other-secret").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let claims = crate::dto::Claims::new(&Uuid::new_v4(), 1_000);
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert!(jwt::decode_claims(&token, SECRET).is_err());
    }

    #[test]
    fn bearer_prefix_is_required() {
        assert_eq!(jwt::parse_bearer("Bearer abc.def"), Some("abc.def"));
        assert_eq!(jwt::parse_bearer("Basic abc"), None);
        assert_eq!(jwt::parse_bearer("Bearer "), None);
    }

    async fn whoami(req: HttpRequest) -> Result<HttpResponse, ApiError> {
        let user_id = current_user(&req)?;
        Ok(HttpResponse::Ok().body(user_id.to_string()))
    }

    #[actix_rt::test]
    async fn middleware_gates_requests() {
        let app = actix_test::init_service(
            App::new().service(
                web::resource("/me")
                    .wrap(AuthMiddleware::new(SECRET))
                    .route(web::get().to(whoami)),
            ),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/me").to_request();
        let err = actix_test::try_call_service(&app, req).await.unwrap_err();
        assert_eq!(err.as_response_error().status_code(), 401);

        let id = Uuid::new_v4();
        let token = jwt::create(&id, SECRET, 60).unwrap();
        let req = actix_test::TestRequest::get()
            .uri("/me")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let body = actix_test::call_and_read_body(&app, req).await;
        assert_eq!(body, id.to_string().as_bytes());
    }
}
