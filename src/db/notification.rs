use chrono::Utc;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::{Notification, NotificationKind};

const COLUMNS: &str = "id, user_id, event_id, kind, message, is_read, created_at";

/// Writes one notification row, honouring the per-kind uniqueness rules:
/// reminders are skipped if already present (returns `None`), and an
/// unread edit notice is refreshed in place instead of duplicated.
pub async fn create<'e, E>(
    user_id: Uuid,
    event_id: Uuid,
    kind: NotificationKind,
    message: &str,
    executor: E,
) -> Result<Option<Notification>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let conflict = if kind.is_reminder() {
        "ON CONFLICT (user_id, event_id, kind) \
         WHERE kind IN ('event_starting', 'event_soon') DO NOTHING"
    } else if kind == NotificationKind::EventEdited {
        "ON CONFLICT (user_id, event_id) \
         WHERE kind = 'event_edited' AND NOT is_read \
         DO UPDATE SET message = EXCLUDED.message, created_at = EXCLUDED.created_at"
    } else {
        ""
    };
    let query = format!(
        "INSERT INTO notifications (id, user_id, event_id, kind, message, is_read, created_at) \
         VALUES ($1, $2, $3, $4, $5, FALSE, $6) \
         {conflict} \
         RETURNING {COLUMNS}"
    );
    sqlx::query_as::<_, Notification>(&query)
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(event_id)
        .bind(kind.as_str())
        .bind(message)
        .bind(Utc::now())
        .fetch_optional(executor)
        .await
}

pub async fn get_by_id<'e, E>(id: Uuid, executor: E) -> Result<Option<Notification>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!("SELECT {COLUMNS} FROM notifications WHERE id = $1");
    sqlx::query_as::<_, Notification>(&query)
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn get_for_user<'e, E>(user_id: Uuid, executor: E) -> Result<Vec<Notification>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, Notification>(
        "SELECT n.id, n.user_id, n.event_id, n.kind, n.message, n.is_read, n.created_at, \
                e.title AS event_title \
         FROM notifications n \
         LEFT JOIN events e ON e.id = n.event_id \
         WHERE n.user_id = $1 \
         ORDER BY n.created_at DESC",
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
}

pub async fn mark_read<'e, E>(id: Uuid, executor: E) -> Result<Option<Notification>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!("UPDATE notifications SET is_read = TRUE WHERE id = $1 RETURNING {COLUMNS}");
    sqlx::query_as::<_, Notification>(&query)
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn mark_all_read<'e, E>(user_id: Uuid, executor: E) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let res = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND NOT is_read")
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(res.rows_affected())
}
