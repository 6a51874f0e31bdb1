use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{errors::ApiError, models::{Event, User}};

pub const MIN_USER_TAGS: usize = 3;
pub const MAX_USER_TAGS: usize = 20;
pub const MIN_PASSWORD_LEN: usize = 8;
pub const DEFAULT_MAX_ATTENDEES: i32 = 50;

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

fn parse_bare_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Parses an ISO-8601 timestamp. Offset-less input is taken as UTC and a
/// bare `YYYY-MM-DD` means midnight UTC.
pub fn parse_datetime(field: &str, raw: &str) -> Result<DateTime<Utc>, ApiError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| parse_bare_date(raw)?.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| ApiError::InvalidDateFormat(field.to_string()))
}

/// Like [`parse_datetime`], but a bare `YYYY-MM-DD` expands to the first
/// (or last) instant of that day.
pub fn parse_date_bound(field: &str, raw: &str, end_of_day: bool) -> Result<DateTime<Utc>, ApiError> {
    let Some(date) = parse_bare_date(raw) else {
        return parse_datetime(field, raw);
    };
    let time = if end_of_day {
        NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999)
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)
    }
    .ok_or_else(|| ApiError::InvalidDateFormat(field.to_string()))?;
    Ok(Utc.from_utc_datetime(&date.and_time(time)))
}

/// Trims tags, drops blanks and case-insensitive duplicates. Order is kept.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    tags.into_iter()
        .map(|t| t.as_ref().trim().to_string())
        .filter(|t| !t.is_empty() && seen.insert(t.to_lowercase()))
        .collect()
}

pub fn validate_user_tags(tags: Vec<String>) -> Result<Vec<String>, ApiError> {
    let tags = normalize_tags(tags);
    if tags.len() < MIN_USER_TAGS {
        return Err(ApiError::validation(format!(
            "At least {MIN_USER_TAGS} tags must be selected"
        )));
    }
    if tags.len() > MAX_USER_TAGS {
        return Err(ApiError::validation(format!(
            "Maximum {MAX_USER_TAGS} tags allowed"
        )));
    }
    Ok(tags)
}

/// Tags arrive as a JSON array, or as a single string (JSON array text or
/// comma-separated) when posted through a multipart form.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TagList {
    List(Vec<String>),
    Text(String),
}

impl TagList {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            TagList::List(v) => normalize_tags(v),
            TagList::Text(s) => {
                let trimmed = s.trim();
                if trimmed.starts_with('[') {
                    if let Ok(v) = serde_json::from_str::<Vec<String>>(trimmed) {
                        return normalize_tags(v);
                    }
                }
                normalize_tags(trimmed.split(','))
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Text(String),
}

impl Scalar {
    fn to_i32(&self, field: &str) -> Result<i32, ApiError> {
        let invalid = || ApiError::validation(format!("{field} must be a whole number"));
        match self {
            Scalar::Int(v) => i32::try_from(*v).map_err(|_| invalid()),
            Scalar::Text(s) => s.trim().parse::<i32>().map_err(|_| invalid()),
        }
    }
}

// ---------------------------------------------------------------------------
// Users and auth
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone, Default)]
pub struct NewUserDto {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub tags: Option<Vec<String>>,
    pub major: Option<String>,
    pub year: Option<String>,
    pub bio: Option<String>,
}

/// A registration request that passed validation. The password is still
/// plaintext here; hashing happens in the user service.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub tags: Vec<String>,
    pub major: Option<String>,
    pub year: Option<String>,
    pub bio: Option<String>,
}

impl NewUserDto {
    pub fn validate(self) -> Result<NewUser, ApiError> {
        let email = required_text("email", self.email)?.to_lowercase();
        let password = self
            .password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ApiError::required("password"))?;
        let first_name = required_text("first_name", self.first_name)?;
        let last_name = required_text("last_name", self.last_name)?;
        let tags = self.tags.ok_or_else(|| ApiError::required("tags"))?;

        if !email.contains('@') {
            return Err(ApiError::validation("Invalid email format"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ApiError::validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters long"
            )));
        }
        let tags = validate_user_tags(tags)?;

        Ok(NewUser {
            email,
            password,
            first_name,
            last_name,
            tags,
            major: optional_text(self.major),
            year: optional_text(self.year),
            bio: optional_text(self.bio),
        })
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoginUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct UpdateProfileDto {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub major: Option<String>,
    pub year: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Profile fields to overwrite; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub major: Option<String>,
    pub year: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl UpdateProfileDto {
    pub fn validate(self) -> Result<ProfileChanges, ApiError> {
        let non_blank = |field: &str, v: Option<String>| -> Result<Option<String>, ApiError> {
            match v {
                Some(s) if s.trim().is_empty() => Err(ApiError::validation(format!(
                    "{field} cannot be empty"
                ))),
                Some(s) => Ok(Some(s.trim().to_string())),
                None => Ok(None),
            }
        };
        Ok(ProfileChanges {
            first_name: non_blank("first_name", self.first_name)?,
            last_name: non_blank("last_name", self.last_name)?,
            major: self.major,
            year: self.year,
            bio: self.bio,
            profile_picture: self.profile_picture,
            tags: self.tags.map(validate_user_tags).transpose()?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct AuthUserResponse {
    pub message: String,
    pub token: String,
    pub user: User,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
}

impl Claims {
    pub fn new(user_id: &Uuid, exp: usize) -> Self {
        Self { sub: *user_id, exp }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Raw event fields as posted by a client, either as JSON or as a multipart
/// form. Nothing here is trusted until [`EventForm::into_new_event`] or
/// [`EventForm::into_changes`] accepts it.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct EventForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub max_attendees: Option<Scalar>,
    pub tags: Option<TagList>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub location: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub max_attendees: i32,
    pub tags: Vec<String>,
    pub image: Option<String>,
}

/// Validated partial update. Every present field already satisfies the event
/// invariants when merged with the stored row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub max_attendees: Option<i32>,
    pub tags: Option<Vec<String>>,
    pub image: Option<String>,
}

impl EventChanges {
    pub fn is_empty(&self) -> bool {
        *self == EventChanges::default()
    }
}

impl EventForm {
    /// Builds a form from multipart text fields.
    pub fn from_fields(mut fields: HashMap<String, String>) -> Self {
        Self {
            title: fields.remove("title"),
            description: fields.remove("description"),
            location: fields.remove("location"),
            start_date: fields.remove("start_date"),
            end_date: fields.remove("end_date"),
            max_attendees: fields.remove("max_attendees").map(Scalar::Text),
            tags: fields.remove("tags").map(TagList::Text),
            image: fields.remove("image"),
        }
    }

    pub fn into_new_event(self) -> Result<NewEvent, ApiError> {
        let title = required_text("title", self.title)?;
        let description = required_text("description", self.description)?;
        let location = required_text("location", self.location)?;
        let start_raw = required_text("start_date", self.start_date)?;
        let end_raw = required_text("end_date", self.end_date)?;

        let start_date = parse_datetime("start_date", &start_raw)?;
        let end_date = parse_datetime("end_date", &end_raw)?;
        let max_attendees = match &self.max_attendees {
            Some(v) => v.to_i32("max_attendees")?,
            None => DEFAULT_MAX_ATTENDEES,
        };

        validate_title(&title)?;
        validate_description(&description)?;
        validate_schedule(start_date, end_date)?;
        validate_capacity(max_attendees, 0)?;

        Ok(NewEvent {
            title,
            description,
            location,
            start_date,
            end_date,
            max_attendees,
            tags: self.tags.map(TagList::into_vec).unwrap_or_default(),
            image: optional_text(self.image),
        })
    }

    /// Validates every supplied field against `current` before anything is
    /// applied, so a bad field never leaves earlier ones half-written.
    pub fn into_changes(self, current: &Event) -> Result<EventChanges, ApiError> {
        let title = self.title.map(|t| t.trim().to_string());
        if let Some(t) = &title {
            validate_title(t)?;
        }
        let description = self.description.map(|d| d.trim().to_string());
        if let Some(d) = &description {
            validate_description(d)?;
        }
        let location = match self.location {
            Some(l) if l.trim().is_empty() => return Err(ApiError::validation("location cannot be empty")),
            other => other.map(|l| l.trim().to_string()),
        };
        let start_date = self
            .start_date
            .as_deref()
            .map(|raw| parse_datetime("start_date", raw))
            .transpose()?;
        let end_date = self
            .end_date
            .as_deref()
            .map(|raw| parse_datetime("end_date", raw))
            .transpose()?;
        let max_attendees = self
            .max_attendees
            .as_ref()
            .map(|v| v.to_i32("max_attendees"))
            .transpose()?;

        if start_date.is_some() || end_date.is_some() {
            validate_schedule(
                start_date.unwrap_or(current.start_date),
                end_date.unwrap_or(current.end_date),
            )?;
        }
        if let Some(max) = max_attendees {
            validate_capacity(max, current.current_attendees)?;
        }

        Ok(EventChanges {
            title,
            description,
            location,
            start_date,
            end_date,
            max_attendees,
            tags: self.tags.map(TagList::into_vec),
            image: optional_text(self.image),
        })
    }
}

pub fn validate_title(title: &str) -> Result<(), ApiError> {
    if title.trim().chars().count() < 3 {
        return Err(ApiError::validation("Title must be at least 3 characters long"));
    }
    Ok(())
}

pub fn validate_description(description: &str) -> Result<(), ApiError> {
    if description.trim().chars().count() < 10 {
        return Err(ApiError::validation(
            "Description must be at least 10 characters long",
        ));
    }
    Ok(())
}

pub fn validate_schedule(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), ApiError> {
    if end <= start {
        return Err(ApiError::validation("end_date must be after start_date"));
    }
    Ok(())
}

pub fn validate_capacity(max_attendees: i32, current_attendees: i32) -> Result<(), ApiError> {
    if max_attendees < 1 {
        return Err(ApiError::validation("Maximum attendees must be at least 1"));
    }
    if max_attendees < current_attendees {
        return Err(ApiError::validation(format!(
            "Maximum attendees cannot be lower than the {current_attendees} already registered"
        )));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct EventResponse {
    #[serde(flatten)]
    pub event: Event,
    pub is_full: bool,
    pub can_register: bool,
}

impl From<Event> for EventResponse {
    fn from(event: Event) -> Self {
        Self {
            is_full: event.is_full(),
            can_register: event.can_register(),
            event,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct EventFilterQuery {
    pub tags: Option<String>,
    pub search: Option<String>,
    pub start_date_after: Option<String>,
    pub end_date_before: Option<String>,
}

// ---------------------------------------------------------------------------
// Comments and notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone)]
pub struct NewCommentDto {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DeviceRegistrationDto {
    pub device_token: Option<String>,
    pub platform: Option<String>,
}

fn required_text(field: &str, value: Option<String>) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::required(field))
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::event;
    use chrono::Duration;

    fn form() -> EventForm {
        EventForm {
            title: Some("Career fair".into()),
            description: Some("Meet recruiters from local companies".into()),
            location: Some("Main hall".into()),
            start_date: Some("2030-03-01T10:00:00Z".into()),
            end_date: Some("2030-03-01T14:00:00Z".into()),
            max_attendees: None,
            tags: Some(TagList::List(vec!["Career".into(), "networking".into()])),
            image: None,
        }
    }

    #[test]
    fn parses_rfc3339_and_naive_timestamps() {
        let a = parse_datetime("start_date", "2030-03-01T10:00:00Z").unwrap();
        let b = parse_datetime("start_date", "2030-03-01T12:00:00+02:00").unwrap();
        let c = parse_datetime("start_date", "2030-03-01T10:00:00.000").unwrap();
        let d = parse_datetime("start_date", "2030-03-01 10:00").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a, d);
    }

    #[test]
    fn bare_date_is_midnight_utc() {
        let dt = parse_datetime("start_date", "2030-03-01").unwrap();
        assert_eq!(dt.to_rfc3339(), "2030-03-01T00:00:00+00:00");
        assert!(parse_datetime("start_date", "2030-02-30").is_err());
    }

    #[test]
    fn unparsable_timestamp_names_the_field() {
        let err = parse_datetime("end_date", "next tuesday").unwrap_err();
        assert_eq!(err, ApiError::InvalidDateFormat("end_date".into()));
    }

    #[test]
    fn date_only_bounds_cover_the_whole_day() {
        let lo = parse_date_bound("start_date_after", "2030-03-01", false).unwrap();
        let hi = parse_date_bound("end_date_before", "2030-03-01", true).unwrap();
        assert_eq!(lo.to_rfc3339(), "2030-03-01T00:00:00+00:00");
        assert!(hi > lo + Duration::hours(23));
        assert!(hi < lo + Duration::days(1));
    }

    #[test]
    fn tag_text_accepts_json_or_commas() {
        let json = TagList::Text(r#"["music", "Art"]"#.into()).into_vec();
        let csv = TagList::Text("music, Art, ,music".into()).into_vec();
        assert_eq!(json, vec!["music", "Art"]);
        assert_eq!(csv, vec!["music", "Art"]);
    }

    #[test]
    fn create_requires_fields_in_order() {
        let mut f = form();
        f.title = None;
        f.location = Some("   ".into());
        assert_eq!(f.into_new_event().unwrap_err(), ApiError::required("title"));

        let mut f = form();
        f.location = Some("   ".into());
        assert_eq!(f.into_new_event().unwrap_err(), ApiError::required("location"));
    }

    #[test]
    fn create_defaults_capacity_and_trims() {
        let mut f = form();
        f.title = Some("  Career fair  ".into());
        let ev = f.into_new_event().unwrap();
        assert_eq!(ev.title, "Career fair");
        assert_eq!(ev.max_attendees, DEFAULT_MAX_ATTENDEES);
        assert_eq!(ev.tags, vec!["Career", "networking"]);
    }

    #[test]
    fn create_rejects_end_not_after_start() {
        let mut f = form();
        f.end_date = f.start_date.clone();
        assert!(matches!(f.into_new_event(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn create_rejects_short_title_and_description() {
        let mut f = form();
        f.title = Some(" ab ".into());
        assert!(matches!(f.into_new_event(), Err(ApiError::Validation(_))));

        let mut f = form();
        f.description = Some("too short".into());
        assert!(matches!(f.into_new_event(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn create_rejects_zero_capacity() {
        let mut f = form();
        f.max_attendees = Some(Scalar::Int(0));
        assert!(matches!(f.into_new_event(), Err(ApiError::Validation(_))));

        let mut f = form();
        f.max_attendees = Some(Scalar::Text("twelve".into()));
        assert!(matches!(f.into_new_event(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn update_with_one_bad_field_yields_nothing() {
        let current = event(10, 0);
        let f = EventForm {
            title: Some("A brand new title".into()),
            end_date: Some("not a date".into()),
            ..Default::default()
        };
        assert_eq!(
            f.into_changes(&current).unwrap_err(),
            ApiError::InvalidDateFormat("end_date".into())
        );
    }

    #[test]
    fn update_checks_schedule_against_stored_dates() {
        let current = event(10, 0);
        let f = EventForm {
            end_date: Some((current.start_date - Duration::hours(1)).to_rfc3339()),
            ..Default::default()
        };
        assert!(matches!(f.into_changes(&current), Err(ApiError::Validation(_))));
    }

    #[test]
    fn update_cannot_shrink_below_registered_count() {
        let current = event(10, 6);
        let f = EventForm {
            max_attendees: Some(Scalar::Int(5)),
            ..Default::default()
        };
        assert!(matches!(f.into_changes(&current), Err(ApiError::Validation(_))));

        let f = EventForm {
            max_attendees: Some(Scalar::Text("6".into())),
            ..Default::default()
        };
        assert_eq!(f.into_changes(&current).unwrap().max_attendees, Some(6));
    }

    #[test]
    fn empty_update_is_empty() {
        let current = event(10, 0);
        assert!(EventForm::default().into_changes(&current).unwrap().is_empty());
    }

    #[test]
    fn multipart_fields_become_a_form() {
        let mut fields = HashMap::new();
        fields.insert("title".to_string(), "Career fair".to_string());
        fields.insert("max_attendees".to_string(), "25".to_string());
        fields.insert("tags".to_string(), "career,jobs".to_string());
        let f = EventForm::from_fields(fields);
        let current = event(10, 0);
        let changes = f.into_changes(&current).unwrap();
        assert_eq!(changes.max_attendees, Some(25));
        assert_eq!(changes.tags, Some(vec!["career".to_string(), "jobs".to_string()]));
    }

    #[test]
    fn user_needs_at_least_three_tags() {
        let dto = NewUserDto {
            email: Some("Ada@Uni.edu".into()),
            password: Some("correct-horse".into()),
            first_name: Some("Ada".into()),
            last_name: Some("Lovelace".into()),
            tags: Some(vec!["math".into(), "MATH".into(), "music".into()]),
            ..Default::default()
        };
        assert!(matches!(dto.clone().validate(), Err(ApiError::Validation(_))));

        let ok = NewUserDto {
            tags: Some(vec!["math".into(), "music".into(), "chess".into()]),
            ..dto
        }
        .validate()
        .unwrap();
        assert_eq!(ok.email, "ada@uni.edu");
    }

    #[test]
    fn user_tags_are_capped() {
        let tags: Vec<String> = (0..21).map(|i| format!("tag{i}")).collect();
        assert!(validate_user_tags(tags).is_err());
    }

    #[test]
    fn user_email_must_look_like_one() {
        let dto = NewUserDto {
            email: Some("not-an-email".into()),
            password: Some("correct-horse".into()),
            first_name: Some("Ada".into()),
            last_name: Some("Lovelace".into()),
            tags: Some(vec!["a".into(), "b".into(), "c".into()]),
            ..Default::default()
        };
        assert_eq!(
            dto.validate().unwrap_err(),
            ApiError::validation("Invalid email format")
        );
    }

    #[test]
    fn profile_rejects_blank_names() {
        let dto = UpdateProfileDto {
            first_name: Some("  ".into()),
            ..Default::default()
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn event_response_carries_derived_flags() {
        let json = serde_json::to_value(EventResponse::from(event(1, 1))).unwrap();
        assert_eq!(json["is_full"], true);
        assert_eq!(json["can_register"], false);
        assert_eq!(json["title"], "Jazz night");
    }
}
