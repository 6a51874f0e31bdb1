use std::fmt;

use chrono::{DateTime, Utc};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, serde::Serialize, serde::Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub tags: Vec<String>,
    pub major: Option<String>,
    pub year: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, FromRow, serde::Serialize, serde::Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub location: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub max_attendees: i32,
    pub current_attendees: i32,
    pub created_by: Uuid,
    pub image: Option<String>,
    pub tags: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn is_full(&self) -> bool {
        self.current_attendees >= self.max_attendees
    }

    pub fn can_register(&self) -> bool {
        self.is_active && !self.is_full()
    }
}

#[derive(Debug, Clone, FromRow, serde::Serialize, serde::Deserialize)]
pub struct Attendance {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub registered_at: DateTime<Utc>,
    pub attended: bool,
}

/// Attendance row joined with the attendee's public profile.
#[derive(Debug, Clone, FromRow, serde::Serialize)]
pub struct Attendee {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub registered_at: DateTime<Utc>,
    pub attended: bool,
    pub first_name: String,
    pub last_name: String,
    pub major: Option<String>,
    pub year: Option<String>,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Clone, FromRow, serde::Serialize, serde::Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(default)]
    pub user_name: Option<String>,
    #[sqlx(default)]
    pub user_profile_picture: Option<String>,
}

#[derive(Debug, Clone, FromRow, serde::Serialize, serde::Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    #[sqlx(default)]
    pub event_title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    EventEdited,
    EventStarting,
    EventSoon,
    NewComment,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::EventEdited => "event_edited",
            NotificationKind::EventStarting => "event_starting",
            NotificationKind::EventSoon => "event_soon",
            NotificationKind::NewComment => "new_comment",
        }
    }

    /// Reminders are created at most once per (user, event, kind).
    pub fn is_reminder(&self) -> bool {
        matches!(self, NotificationKind::EventStarting | NotificationKind::EventSoon)
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::Duration;

    pub fn event(max_attendees: i32, current_attendees: i32) -> Event {
        let now = Utc::now();
        Event {
            id: Uuid::new_v4(),
            title: "Jazz night".into(),
            description: "Live jazz in the student union".into(),
            location: "Union Hall".into(),
            start_date: now + Duration::days(1),
            end_date: now + Duration::days(1) + Duration::hours(2),
            max_attendees,
            current_attendees,
            created_by: Uuid::new_v4(),
            image: None,
            tags: vec!["music".into()],
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::event;
    use super::*;

    #[test]
    fn full_event_cannot_register() {
        let e = event(2, 2);
        assert!(e.is_full());
        assert!(!e.can_register());
    }

    #[test]
    fn inactive_event_cannot_register() {
        let mut e = event(10, 0);
        e.is_active = false;
        assert!(!e.is_full());
        assert!(!e.can_register());
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: "ada@uni.edu".into(),
            password_hash: "$argon2id$secret".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            tags: vec!["math".into(), "music".into(), "chess".into()],
            major: None,
            year: None,
            bio: None,
            profile_picture: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "ada@uni.edu");
    }
}
