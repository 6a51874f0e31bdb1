#![allow(dead_code)]

use chrono::{Duration, Utc};
use uuid::Uuid;
use student_events::{
    config::PushConfig,
    dto::{EventForm, NewUserDto, Scalar, TagList},
    models::{Event, NotificationKind, User},
    service::{self, push::PushService},
    PGPool,
};

pub const JWT_SECRET: &str = "integration-test-secret";

/// Push service that never talks to a gateway.
pub fn silent_push() -> PushService {
    PushService::new(PushConfig {
        enabled: false,
        ..PushConfig::default()
    })
    .expect("push client")
}

pub async fn signup(pool: &PGPool, email: &str) -> User {
    let dto = NewUserDto {
        email: Some(email.to_string()),
        password: Some("correct horse battery".to_string()),
        first_name: Some("Ada".to_string()),
        last_name: Some("Lovelace".to_string()),
        tags: Some(vec!["Music".into(), "Coding".into(), "Film".into()]),
        ..NewUserDto::default()
    };
    service::user::create(dto, JWT_SECRET, pool)
        .await
        .expect("signup")
        .user
}

pub fn event_form(title: &str, starts_in: Duration, max_attendees: i64, tags: &[&str]) -> EventForm {
    let start = Utc::now() + starts_in;
    EventForm {
        title: Some(title.to_string()),
        description: Some(format!("{title} on the quad")),
        location: Some("Student union".to_string()),
        start_date: Some(start.to_rfc3339()),
        end_date: Some((start + Duration::hours(2)).to_rfc3339()),
        max_attendees: Some(Scalar::Int(max_attendees)),
        tags: Some(TagList::List(tags.iter().map(|t| t.to_string()).collect())),
        image: None,
    }
}

pub async fn create_event(pool: &PGPool, creator: &User, form: EventForm) -> Event {
    service::event::create(creator.id, form, pool)
        .await
        .expect("create event")
}

pub async fn attendee_rows(pool: &PGPool, event_id: Uuid) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM event_attendees WHERE event_id = $1")
        .bind(event_id)
        .fetch_one(pool)
        .await
        .expect("count attendees")
}

pub async fn notification_rows(pool: &PGPool, event_id: Uuid, kind: NotificationKind) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM notifications WHERE event_id = $1 AND kind = $2")
        .bind(event_id)
        .bind(kind.as_str())
        .fetch_one(pool)
        .await
        .expect("count notifications")
}
