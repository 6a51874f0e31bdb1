use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use log::{debug, error, info};
use serde_json::json;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    db,
    dto::DeviceRegistrationDto,
    errors::ApiError,
    models::{Event, Notification, NotificationKind},
    service::push::{PushMessage, PushService},
    PGPool,
};

/// Events starting within this window get an `event_starting` reminder.
pub const STARTING_WINDOW_MINUTES: i64 = 60;
/// Events starting within this window (but not the one above) get `event_soon`.
pub const SOON_WINDOW_HOURS: i64 = 24;

pub fn message_for(kind: NotificationKind, event: &Event, actor_name: Option<&str>) -> PushMessage {
    let (title, body) = match kind {
        NotificationKind::EventEdited => (
            "Event Updated",
            format!("The event \"{}\" has been updated by the organizer.", event.title),
        ),
        NotificationKind::NewComment => (
            "New Comment",
            format!(
                "{} commented on \"{}\"",
                actor_name.unwrap_or("Someone"),
                event.title
            ),
        ),
        NotificationKind::EventStarting => (
            "Event Starting Soon",
            format!("\"{}\" starts within the hour at {}.", event.title, event.location),
        ),
        NotificationKind::EventSoon => (
            "Upcoming Event",
            format!(
                "\"{}\" starts {} UTC.",
                event.title,
                event.start_date.format("%b %-d at %H:%M")
            ),
        ),
    };
    PushMessage {
        title: title.to_string(),
        body,
        data: json!({ "type": kind.as_str(), "event_id": event.id }),
    }
}

/// Which reminder, if any, an event starting at `start` is due at `now`.
pub fn reminder_kind(start: DateTime<Utc>, now: DateTime<Utc>) -> Option<NotificationKind> {
    let until = start - now;
    if until <= Duration::zero() {
        None
    } else if until <= Duration::minutes(STARTING_WINDOW_MINUTES) {
        Some(NotificationKind::EventStarting)
    } else if until <= Duration::hours(SOON_WINDOW_HOURS) {
        Some(NotificationKind::EventSoon)
    } else {
        None
    }
}

/// Comment notices go to every attendee except the commenter.
pub fn comment_audience(attendees: Vec<Uuid>, author: Uuid) -> Vec<Uuid> {
    attendees.into_iter().filter(|id| *id != author).collect()
}

/// Writes one notification per recipient on `conn` (normally an open
/// transaction). Returns the recipients that actually got a row, which for
/// reminders excludes anyone notified before.
pub async fn fanout(
    event: &Event,
    kind: NotificationKind,
    recipients: &[Uuid],
    message: &PushMessage,
    conn: &mut PgConnection,
) -> Result<Vec<Uuid>, sqlx::Error> {
    let mut notified = Vec::with_capacity(recipients.len());
    for user_id in recipients {
        let row = db::notification::create(*user_id, event.id, kind, &message.body, &mut *conn).await?;
        if row.is_some() {
            notified.push(*user_id);
        }
    }
    debug!(
        "{} fanout for event {}: {}/{} rows",
        kind,
        event.id,
        notified.len(),
        recipients.len()
    );
    Ok(notified)
}

pub async fn notify_event_edited(event: &Event, conn: &mut PgConnection) -> Result<(Vec<Uuid>, PushMessage), sqlx::Error> {
    let attendees = db::attendance::get_user_ids(event.id, &mut *conn).await?;
    let message = message_for(NotificationKind::EventEdited, event, None);
    let notified = fanout(event, NotificationKind::EventEdited, &attendees, &message, conn).await?;
    Ok((notified, message))
}

pub async fn notify_new_comment(
    event: &Event,
    author: Uuid,
    author_name: &str,
    conn: &mut PgConnection,
) -> Result<(Vec<Uuid>, PushMessage), sqlx::Error> {
    let attendees = db::attendance::get_user_ids(event.id, &mut *conn).await?;
    let audience = comment_audience(attendees, author);
    let message = message_for(NotificationKind::NewComment, event, Some(author_name));
    let notified = fanout(event, NotificationKind::NewComment, &audience, &message, conn).await?;
    Ok((notified, message))
}

/// Creates due reminders for every active event starting within the next
/// day. Safe to call repeatedly; returns how many rows were new.
pub async fn reminder_sweep(now: DateTime<Utc>, pool: &PGPool, push: &PushService) -> Result<usize, ApiError> {
    let mut tx = pool.begin().await?;
    let events = db::event::get_starting_between(now, now + Duration::hours(SOON_WINDOW_HOURS), &mut *tx).await?;

    let mut created = 0;
    let mut deliveries = Vec::new();
    for event in &events {
        let Some(kind) = reminder_kind(event.start_date, now) else {
            continue;
        };
        let attendees = db::attendance::get_user_ids(event.id, &mut *tx).await?;
        let message = message_for(kind, event, None);
        let notified = fanout(event, kind, &attendees, &message, &mut *tx).await?;
        created += notified.len();
        deliveries.push((notified, message));
    }
    tx.commit().await?;

    for (recipients, message) in deliveries {
        push.dispatch(recipients, message);
    }
    info!("reminder sweep over {} events created {} notifications", events.len(), created);
    Ok(created)
}

/// Runs [`reminder_sweep`] forever on a fixed interval.
pub async fn run_reminder_sweeps(pool: PGPool, push: PushService, every: StdDuration) {
    info!("in-process reminder sweep every {} s", every.as_secs());
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        if let Err(err) = reminder_sweep(Utc::now(), &pool, &push).await {
            error!("scheduled reminder sweep failed: {}", err);
        }
    }
}

pub async fn list(user_id: Uuid, pool: &PGPool) -> Result<Vec<Notification>, ApiError> {
    Ok(db::notification::get_for_user(user_id, pool).await?)
}

pub async fn mark_read(id: Uuid, user_id: Uuid, pool: &PGPool) -> Result<Notification, ApiError> {
    let mut tx = pool.begin().await?;
    let notification = db::notification::get_by_id(id, &mut *tx)
        .await?
        .ok_or(ApiError::NotFound("notification"))?;
    if notification.user_id != user_id {
        return Err(ApiError::Unauthorized);
    }
    let updated = db::notification::mark_read(id, &mut *tx)
        .await?
        .ok_or(ApiError::NotFound("notification"))?;
    tx.commit().await?;
    Ok(updated)
}

pub async fn mark_all_read(user_id: Uuid, pool: &PGPool) -> Result<u64, ApiError> {
    Ok(db::notification::mark_all_read(user_id, pool).await?)
}

/// Returns `true` when the token was new for this user.
pub async fn register_device(
    user_id: Uuid,
    dto: DeviceRegistrationDto,
    pool: &PGPool,
    push: &PushService,
) -> Result<bool, ApiError> {
    let token = dto
        .device_token
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::validation("Device token is required"))?;
    if db::user::get_by_id(user_id, pool).await?.is_none() {
        return Err(ApiError::NotFound("user"));
    }
    let platform = dto.platform.unwrap_or_else(|| "unknown".to_string());
    Ok(push.register_token(user_id, token, platform).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::event;

    #[test]
    fn reminder_windows() {
        let now = Utc::now();
        assert_eq!(reminder_kind(now - Duration::minutes(5), now), None);
        assert_eq!(reminder_kind(now, now), None);
        assert_eq!(
            reminder_kind(now + Duration::minutes(30), now),
            Some(NotificationKind::EventStarting)
        );
        assert_eq!(
            reminder_kind(now + Duration::minutes(60), now),
            Some(NotificationKind::EventStarting)
        );
        assert_eq!(
            reminder_kind(now + Duration::hours(5), now),
            Some(NotificationKind::EventSoon)
        );
        assert_eq!(
            reminder_kind(now + Duration::hours(24), now),
            Some(NotificationKind::EventSoon)
        );
        assert_eq!(reminder_kind(now + Duration::hours(25), now), None);
    }

    #[test]
    fn commenter_is_not_notified_of_own_comment() {
        let author = Uuid::new_v4();
        let other = Uuid::new_v4();
        assert_eq!(comment_audience(vec![author, other], author), vec![other]);
        assert!(comment_audience(vec![author], author).is_empty());
    }

    #[test]
    fn messages_name_the_event_and_carry_push_data() {
        let ev = event(10, 0);
        let edited = message_for(NotificationKind::EventEdited, &ev, None);
        assert_eq!(edited.title, "Event Updated");
        assert!(edited.body.contains("\"Jazz night\""));
        assert_eq!(edited.data["type"], "event_edited");
        assert_eq!(edited.data["event_id"], ev.id.to_string());

        let comment = message_for(NotificationKind::NewComment, &ev, Some("Ada Lovelace"));
        assert_eq!(comment.body, "Ada Lovelace commented on \"Jazz night\"");
    }
}
