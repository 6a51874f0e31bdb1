use chrono::Utc;
use log::{error, info};
use uuid::Uuid;

use crate::{
    db,
    dto::{AuthUserResponse, LoginUserRequest, NewUserDto, UpdateProfileDto},
    errors::ApiError,
    models::User,
    service::{auth::jwt, crypto},
    PGPool, ACCESS_TOKEN_EXP,
};

fn issue_token(user_id: &Uuid, jwt_secret: &str) -> Result<String, ApiError> {
    jwt::create(user_id, jwt_secret, ACCESS_TOKEN_EXP).map_err(|err| {
        error!("failed to sign token for {}: {}", user_id, err);
        ApiError::Persistence
    })
}

pub async fn create(dto: NewUserDto, jwt_secret: &str, pool: &PGPool) -> Result<AuthUserResponse, ApiError> {
    let new_user = dto.validate()?;
    if db::user::email_exists(&new_user.email, pool).await? {
        return Err(ApiError::Conflict("Email already registered".to_string()));
    }
    let password_hash = crypto::hash_password(&new_user.password).map_err(|err| {
        error!("password hashing failed: {}", err);
        ApiError::Persistence
    })?;

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        email: new_user.email,
        password_hash,
        first_name: new_user.first_name,
        last_name: new_user.last_name,
        tags: new_user.tags,
        major: new_user.major,
        year: new_user.year,
        bio: new_user.bio,
        profile_picture: None,
        created_at: now,
        updated_at: now,
    };
    // A concurrent signup with the same email surfaces as a unique violation,
    // which converts to `Conflict`.
    let user = db::user::create(&user, pool).await?;
    let token = issue_token(&user.id, jwt_secret)?;
    info!("registered user {}", user.id);
    Ok(AuthUserResponse {
        message: "User registered successfully".to_string(),
        token,
        user,
    })
}

pub async fn login(req: LoginUserRequest, jwt_secret: &str, pool: &PGPool) -> Result<AuthUserResponse, ApiError> {
    let (Some(email), Some(password)) = (req.email, req.password) else {
        return Err(ApiError::validation("Email and password are required"));
    };
    let user = db::user::get_by_email(&email.trim().to_lowercase(), pool)
        .await?
        .ok_or(ApiError::Unauthenticated)?;
    let valid = crypto::verify_password(&password, &user.password_hash).map_err(|err| {
        error!("stored hash for {} is unreadable: {}", user.id, err);
        ApiError::Persistence
    })?;
    if !valid {
        return Err(ApiError::Unauthenticated);
    }
    let token = issue_token(&user.id, jwt_secret)?;
    Ok(AuthUserResponse {
        message: "Login successful".to_string(),
        token,
        user,
    })
}

pub async fn get_by_id(id: Uuid, pool: &PGPool) -> Result<User, ApiError> {
    db::user::get_by_id(id, pool)
        .await?
        .ok_or(ApiError::NotFound("user"))
}

pub async fn update_profile(id: Uuid, dto: UpdateProfileDto, pool: &PGPool) -> Result<User, ApiError> {
    let changes = dto.validate()?;
    db::user::set_fields(id, &changes, pool)
        .await?
        .ok_or(ApiError::NotFound("user"))
}
