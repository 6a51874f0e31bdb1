use chrono::Utc;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::Comment;

pub async fn create<'e, E>(event_id: Uuid, user_id: Uuid, content: &str, executor: E) -> Result<Comment, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let now = Utc::now();
    sqlx::query_as::<_, Comment>(
        "INSERT INTO comments (id, event_id, user_id, content, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $5) \
         RETURNING id, event_id, user_id, content, created_at, updated_at",
    )
    .bind(Uuid::new_v4())
    .bind(event_id)
    .bind(user_id)
    .bind(content)
    .bind(now)
    .fetch_one(executor)
    .await
}

pub async fn get_by_id<'e, E>(id: Uuid, executor: E) -> Result<Option<Comment>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, Comment>(
        "SELECT id, event_id, user_id, content, created_at, updated_at FROM comments WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn get_for_event<'e, E>(event_id: Uuid, executor: E) -> Result<Vec<Comment>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, Comment>(
        "SELECT c.id, c.event_id, c.user_id, c.content, c.created_at, c.updated_at, \
                u.first_name || ' ' || u.last_name AS user_name, \
                u.profile_picture AS user_profile_picture \
         FROM comments c \
         JOIN users u ON u.id = c.user_id \
         WHERE c.event_id = $1 \
         ORDER BY c.created_at ASC",
    )
    .bind(event_id)
    .fetch_all(executor)
    .await
}

pub async fn delete<'e, E>(id: Uuid, executor: E) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let res = sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(res.rows_affected())
}
