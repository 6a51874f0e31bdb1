use chrono::Utc;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::{Attendance, Attendee};

/// Inserts the (event, user) pair. Returns `None` when the pair already exists.
pub async fn create<'e, E>(event_id: Uuid, user_id: Uuid, executor: E) -> Result<Option<Attendance>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, Attendance>(
        "INSERT INTO event_attendees (id, event_id, user_id, registered_at, attended) \
         VALUES ($1, $2, $3, $4, FALSE) \
         ON CONFLICT (event_id, user_id) DO NOTHING \
         RETURNING id, event_id, user_id, registered_at, attended",
    )
    .bind(Uuid::new_v4())
    .bind(event_id)
    .bind(user_id)
    .bind(Utc::now())
    .fetch_optional(executor)
    .await
}

pub async fn exists<'e, E>(event_id: Uuid, user_id: Uuid, executor: E) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM event_attendees WHERE event_id = $1 AND user_id = $2)",
    )
    .bind(event_id)
    .bind(user_id)
    .fetch_one(executor)
    .await
}

/// Removes the pair. Returns `None` when there was nothing to remove.
pub async fn delete<'e, E>(event_id: Uuid, user_id: Uuid, executor: E) -> Result<Option<Attendance>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, Attendance>(
        "DELETE FROM event_attendees WHERE event_id = $1 AND user_id = $2 \
         RETURNING id, event_id, user_id, registered_at, attended",
    )
    .bind(event_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

pub async fn get_attendees<'e, E>(event_id: Uuid, executor: E) -> Result<Vec<Attendee>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, Attendee>(
        "SELECT a.id, a.event_id, a.user_id, a.registered_at, a.attended, \
                u.first_name, u.last_name, u.major, u.year, u.profile_picture \
         FROM event_attendees a \
         JOIN users u ON u.id = a.user_id \
         WHERE a.event_id = $1 \
         ORDER BY a.registered_at ASC, a.id ASC",
    )
    .bind(event_id)
    .fetch_all(executor)
    .await
}

pub async fn get_user_ids<'e, E>(event_id: Uuid, executor: E) -> Result<Vec<Uuid>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar::<_, Uuid>(
        "SELECT user_id FROM event_attendees WHERE event_id = $1 ORDER BY registered_at ASC",
    )
    .bind(event_id)
    .fetch_all(executor)
    .await
}
