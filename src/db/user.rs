use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{dto::ProfileChanges, models::User};

const COLUMNS: &str = "id, email, password_hash, first_name, last_name, tags, major, year, bio, \
                       profile_picture, created_at, updated_at";

pub async fn create<'e, E>(user: &User, executor: E) -> Result<User, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!(
        "INSERT INTO users (id, email, password_hash, first_name, last_name, tags, major, year, bio, \
         profile_picture, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
         RETURNING {COLUMNS}"
    );
    sqlx::query_as::<_, User>(&query)
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.tags)
        .bind(&user.major)
        .bind(&user.year)
        .bind(&user.bio)
        .bind(&user.profile_picture)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(executor)
        .await
}

pub async fn get_by_id<'e, E>(id: Uuid, executor: E) -> Result<Option<User>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
    sqlx::query_as::<_, User>(&query)
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn get_by_email<'e, E>(email: &str, executor: E) -> Result<Option<User>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!("SELECT {COLUMNS} FROM users WHERE email = $1");
    sqlx::query_as::<_, User>(&query)
        .bind(email)
        .fetch_optional(executor)
        .await
}

pub async fn email_exists<'e, E>(email: &str, executor: E) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
        .bind(email)
        .fetch_one(executor)
        .await
}

/// Overwrites the supplied profile fields; absent ones keep their value.
pub async fn set_fields<'e, E>(
    id: Uuid,
    changes: &ProfileChanges,
    executor: E,
) -> Result<Option<User>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!(
        "UPDATE users SET \
             first_name = COALESCE($2, first_name), \
             last_name = COALESCE($3, last_name), \
             major = COALESCE($4, major), \
             year = COALESCE($5, year), \
             bio = COALESCE($6, bio), \
             profile_picture = COALESCE($7, profile_picture), \
             tags = COALESCE($8, tags), \
             updated_at = NOW() \
         WHERE id = $1 \
         RETURNING {COLUMNS}"
    );
    sqlx::query_as::<_, User>(&query)
        .bind(id)
        .bind(&changes.first_name)
        .bind(&changes.last_name)
        .bind(&changes.major)
        .bind(&changes.year)
        .bind(&changes.bio)
        .bind(&changes.profile_picture)
        .bind(&changes.tags)
        .fetch_optional(executor)
        .await
}
