use log::info;
use uuid::Uuid;

use crate::{
    db,
    dto::NewCommentDto,
    errors::ApiError,
    models::Comment,
    service::{notification, push::PushService},
    PGPool,
};

pub async fn list(event_id: Uuid, pool: &PGPool) -> Result<Vec<Comment>, ApiError> {
    if db::event::get_by_id(event_id, pool).await?.is_none() {
        return Err(ApiError::NotFound("event"));
    }
    Ok(db::comment::get_for_event(event_id, pool).await?)
}

pub async fn create(
    event_id: Uuid,
    user_id: Uuid,
    dto: NewCommentDto,
    pool: &PGPool,
    push: &PushService,
) -> Result<Comment, ApiError> {
    let content = dto
        .content
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::validation("Comment content is required"))?;

    let mut tx = pool.begin().await?;
    let event = db::event::get_by_id(event_id, &mut *tx)
        .await?
        .filter(|e| e.is_active)
        .ok_or(ApiError::NotFound("event"))?;
    let author = db::user::get_by_id(user_id, &mut *tx)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    let mut comment = db::comment::create(event_id, user_id, &content, &mut *tx).await?;
    let author_name = author.display_name();
    let (recipients, message) =
        notification::notify_new_comment(&event, user_id, &author_name, &mut *tx).await?;
    tx.commit().await?;

    info!("comment {} on event {} ({} notified)", comment.id, event_id, recipients.len());
    push.dispatch(recipients, message);

    comment.user_name = Some(author_name);
    comment.user_profile_picture = author.profile_picture;
    Ok(comment)
}

/// Only the author may delete a comment.
pub fn can_delete(comment: &Comment, user_id: Uuid) -> bool {
    comment.user_id == user_id
}

pub async fn delete(comment_id: Uuid, user_id: Uuid, pool: &PGPool) -> Result<(), ApiError> {
    let mut tx = pool.begin().await?;
    let comment = db::comment::get_by_id(comment_id, &mut *tx)
        .await?
        .ok_or(ApiError::NotFound("comment"))?;
    if !can_delete(&comment, user_id) {
        return Err(ApiError::Unauthorized);
    }
    db::comment::delete(comment_id, &mut *tx).await?;
    tx.commit().await?;
    Ok(())
}
