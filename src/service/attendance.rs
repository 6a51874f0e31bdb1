use log::info;
use uuid::Uuid;

use crate::{
    db,
    errors::ApiError,
    models::{Attendance, Attendee, Event},
    PGPool,
};

/// Decides whether `event` can take a new registration. Duplicate
/// registrations are reported before capacity so that repeating a
/// successful call always yields `Conflict`.
pub fn check_admission(event: Option<&Event>, already_registered: bool) -> Result<(), ApiError> {
    let event = event
        .filter(|e| e.is_active)
        .ok_or(ApiError::NotFound("event"))?;
    if already_registered {
        return Err(ApiError::Conflict("Already registered for this event".to_string()));
    }
    if event.is_full() {
        return Err(ApiError::CapacityExceeded);
    }
    Ok(())
}

pub async fn register(event_id: Uuid, user_id: Uuid, pool: &PGPool) -> Result<Attendance, ApiError> {
    let mut tx = pool.begin().await?;
    let event = db::event::lock_by_id(event_id, &mut *tx).await?;
    let already_registered = match &event {
        Some(_) => db::attendance::exists(event_id, user_id, &mut *tx).await?,
        None => false,
    };
    check_admission(event.as_ref(), already_registered)?;

    let attendance = db::attendance::create(event_id, user_id, &mut *tx)
        .await?
        .ok_or_else(|| ApiError::Conflict("Already registered for this event".to_string()))?;
    if !db::event::increment_attendees(event_id, &mut *tx).await? {
        return Err(ApiError::CapacityExceeded);
    }
    tx.commit().await?;

    info!("user {} registered for event {}", user_id, event_id);
    Ok(attendance)
}

pub async fn unregister(event_id: Uuid, user_id: Uuid, pool: &PGPool) -> Result<(), ApiError> {
    let mut tx = pool.begin().await?;
    // Lock the event first so the delete and the decrement see the same count.
    db::event::lock_by_id(event_id, &mut *tx).await?;
    db::attendance::delete(event_id, user_id, &mut *tx)
        .await?
        .ok_or(ApiError::NotFound("registration"))?;
    db::event::decrement_attendees(event_id, &mut *tx).await?;
    tx.commit().await?;

    info!("user {} unregistered from event {}", user_id, event_id);
    Ok(())
}

pub async fn list_attendees(event_id: Uuid, pool: &PGPool) -> Result<Vec<Attendee>, ApiError> {
    if db::event::get_by_id(event_id, pool).await?.is_none() {
        return Err(ApiError::NotFound("event"));
    }
    Ok(db::attendance::get_attendees(event_id, pool).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::event;

    #[test]
    fn missing_or_inactive_event_is_not_found() {
        assert_eq!(check_admission(None, false), Err(ApiError::NotFound("event")));
        let mut e = event(10, 0);
        e.is_active = false;
        assert_eq!(check_admission(Some(&e), false), Err(ApiError::NotFound("event")));
    }

    #[test]
    fn duplicate_wins_over_full() {
        let e = event(1, 1);
        assert!(matches!(check_admission(Some(&e), true), Err(ApiError::Conflict(_))));
        assert_eq!(check_admission(Some(&e), false), Err(ApiError::CapacityExceeded));
    }

    #[test]
    fn open_seat_admits() {
        assert_eq!(check_admission(Some(&event(2, 1)), false), Ok(()));
    }
}
