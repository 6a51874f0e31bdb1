use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{dto::EventChanges, models::Event};

const COLUMNS: &str = "id, title, description, location, start_date, end_date, max_attendees, \
                       current_attendees, created_by, image, tags, is_active, created_at, updated_at";

pub async fn create<'e, E>(event: &Event, executor: E) -> Result<Event, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!(
        "INSERT INTO events (id, title, description, location, start_date, end_date, max_attendees, \
         current_attendees, created_by, image, tags, is_active, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
         RETURNING {COLUMNS}"
    );
    sqlx::query_as::<_, Event>(&query)
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(event.max_attendees)
        .bind(event.current_attendees)
        .bind(event.created_by)
        .bind(&event.image)
        .bind(&event.tags)
        .bind(event.is_active)
        .bind(event.created_at)
        .bind(event.updated_at)
        .fetch_one(executor)
        .await
}

pub async fn get_by_id<'e, E>(id: Uuid, executor: E) -> Result<Option<Event>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!("SELECT {COLUMNS} FROM events WHERE id = $1");
    sqlx::query_as::<_, Event>(&query)
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Reads the event and holds its row lock until the surrounding transaction
/// ends. Concurrent writers to the same event queue behind it.
pub async fn lock_by_id<'e, E>(id: Uuid, executor: E) -> Result<Option<Event>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!("SELECT {COLUMNS} FROM events WHERE id = $1 FOR UPDATE");
    sqlx::query_as::<_, Event>(&query)
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn get_active<'e, E>(executor: E) -> Result<Vec<Event>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!(
        "SELECT {COLUMNS} FROM events WHERE is_active ORDER BY start_date ASC, id ASC"
    );
    sqlx::query_as::<_, Event>(&query).fetch_all(executor).await
}

pub async fn get_created_by<'e, E>(creator: Uuid, executor: E) -> Result<Vec<Event>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!(
        "SELECT {COLUMNS} FROM events WHERE created_by = $1 ORDER BY created_at DESC"
    );
    sqlx::query_as::<_, Event>(&query)
        .bind(creator)
        .fetch_all(executor)
        .await
}

// /users/me/events
pub async fn get_active_created_by<'e, E>(creator: Uuid, executor: E) -> Result<Vec<Event>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!(
        "SELECT {COLUMNS} FROM events WHERE created_by = $1 AND is_active ORDER BY start_date ASC, id ASC"
    );
    sqlx::query_as::<_, Event>(&query)
        .bind(creator)
        .fetch_all(executor)
        .await
}

// /users/me/registered-events
pub async fn get_user_participations<'e, E>(user_id: Uuid, executor: E) -> Result<Vec<Event>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!(
        "SELECT {COLUMNS} FROM events \
         WHERE is_active AND id IN (SELECT event_id FROM event_attendees WHERE user_id = $1) \
         ORDER BY start_date ASC"
    );
    sqlx::query_as::<_, Event>(&query)
        .bind(user_id)
        .fetch_all(executor)
        .await
}

/// Active events whose start falls in `(from, until]`.
pub async fn get_starting_between<'e, E>(
    from: DateTime<Utc>,
    until: DateTime<Utc>,
    executor: E,
) -> Result<Vec<Event>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!(
        "SELECT {COLUMNS} FROM events \
         WHERE is_active AND start_date > $1 AND start_date <= $2 \
         ORDER BY start_date ASC"
    );
    sqlx::query_as::<_, Event>(&query)
        .bind(from)
        .bind(until)
        .fetch_all(executor)
        .await
}

pub async fn set_fields<'e, E>(
    id: Uuid,
    changes: &EventChanges,
    executor: E,
) -> Result<Event, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!(
        "UPDATE events SET \
             title = COALESCE($2, title), \
             description = COALESCE($3, description), \
             location = COALESCE($4, location), \
             start_date = COALESCE($5, start_date), \
             end_date = COALESCE($6, end_date), \
             max_attendees = COALESCE($7, max_attendees), \
             tags = COALESCE($8, tags), \
             image = COALESCE($9, image), \
             updated_at = NOW() \
         WHERE id = $1 \
         RETURNING {COLUMNS}"
    );
    sqlx::query_as::<_, Event>(&query)
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(&changes.location)
        .bind(changes.start_date)
        .bind(changes.end_date)
        .bind(changes.max_attendees)
        .bind(&changes.tags)
        .bind(&changes.image)
        .fetch_one(executor)
        .await
}

pub async fn deactivate<'e, E>(id: Uuid, executor: E) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let res = sqlx::query("UPDATE events SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(res.rows_affected())
}

/// Takes one seat if the event is active and not full. Returns whether a seat
/// was taken.
pub async fn increment_attendees<'e, E>(id: Uuid, executor: E) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let res = sqlx::query(
        "UPDATE events SET current_attendees = current_attendees + 1 \
         WHERE id = $1 AND is_active AND current_attendees < max_attendees",
    )
    .bind(id)
    .execute(executor)
    .await?;
    Ok(res.rows_affected() == 1)
}

/// Releases one seat, never going below zero.
pub async fn decrement_attendees<'e, E>(id: Uuid, executor: E) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let res = sqlx::query(
        "UPDATE events SET current_attendees = GREATEST(current_attendees - 1, 0) WHERE id = $1",
    )
    .bind(id)
    .execute(executor)
    .await?;
    Ok(res.rows_affected())
}
