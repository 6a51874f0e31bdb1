use chrono::Utc;
use log::{debug, info};
use uuid::Uuid;

use crate::{
    db,
    dto::{EventFilterQuery, EventForm},
    errors::ApiError,
    models::Event,
    service::{
        notification,
        push::PushService,
        query::{self, EventFilter},
    },
    PGPool,
};

pub async fn create(creator: Uuid, form: EventForm, pool: &PGPool) -> Result<Event, ApiError> {
    let new_event = form.into_new_event()?;
    let now = Utc::now();
    let event = Event {
        id: Uuid::new_v4(),
        title: new_event.title,
        description: new_event.description,
        location: new_event.location,
        start_date: new_event.start_date,
        end_date: new_event.end_date,
        max_attendees: new_event.max_attendees,
        current_attendees: 0,
        created_by: creator,
        image: new_event.image,
        tags: new_event.tags,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    let created = db::event::create(&event, pool).await?;
    info!("event {} created by {}", created.id, creator);
    Ok(created)
}

pub async fn get_by_id(id: Uuid, pool: &PGPool) -> Result<Event, ApiError> {
    db::event::get_by_id(id, pool)
        .await?
        .ok_or(ApiError::NotFound("event"))
}

/// Applies the validated changes and writes one `event_edited` notice per
/// attendee in the same transaction. Push goes out after commit.
pub async fn update(
    id: Uuid,
    requester: Uuid,
    form: EventForm,
    pool: &PGPool,
    push: &PushService,
) -> Result<Event, ApiError> {
    let mut tx = pool.begin().await?;
    let current = db::event::lock_by_id(id, &mut *tx)
        .await?
        .filter(|e| e.is_active)
        .ok_or(ApiError::NotFound("event"))?;
    if current.created_by != requester {
        return Err(ApiError::Unauthorized);
    }
    let changes = form.into_changes(&current)?;
    if changes.is_empty() {
        debug!("event {} edit carries no field changes", id);
    }

    let updated = db::event::set_fields(id, &changes, &mut *tx).await?;
    let (recipients, message) = notification::notify_event_edited(&updated, &mut *tx).await?;
    tx.commit().await?;

    info!("event {} updated, {} attendees notified", id, recipients.len());
    push.dispatch(recipients, message);
    Ok(updated)
}

pub async fn delete(id: Uuid, requester: Uuid, pool: &PGPool) -> Result<(), ApiError> {
    let mut tx = pool.begin().await?;
    let event = db::event::lock_by_id(id, &mut *tx)
        .await?
        .ok_or(ApiError::NotFound("event"))?;
    if event.created_by != requester {
        return Err(ApiError::Unauthorized);
    }
    db::event::deactivate(id, &mut *tx).await?;
    tx.commit().await?;
    info!("event {} deactivated by {}", id, requester);
    Ok(())
}

pub async fn list(query: EventFilterQuery, pool: &PGPool) -> Result<Vec<Event>, ApiError> {
    let filter = EventFilter::from_query(query)?;
    let events = db::event::get_active(pool).await?;
    Ok(query::apply(events, &filter))
}

/// The caller's own active events, soonest first.
pub async fn get_own_active(user_id: Uuid, pool: &PGPool) -> Result<Vec<Event>, ApiError> {
    Ok(db::event::get_active_created_by(user_id, pool).await?)
}

pub async fn get_created_by(user_id: Uuid, pool: &PGPool) -> Result<Vec<Event>, ApiError> {
    Ok(db::event::get_created_by(user_id, pool).await?)
}

pub async fn get_user_participations(user_id: Uuid, pool: &PGPool) -> Result<Vec<Event>, ApiError> {
    if db::user::get_by_id(user_id, pool).await?.is_none() {
        return Err(ApiError::NotFound("user"));
    }
    Ok(db::event::get_user_participations(user_id, pool).await?)
}
