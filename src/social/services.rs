use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    state::AppState,
    store::{
        models::{Comment, LikeSummary, NewNotification, NotificationKind, RatingSummary},
        StoreError, StoreResult,
    },
};

pub const MAX_COMMENT_LEN: usize = 2000;

/// Tells the recipe owner about activity by someone else. Failures are logged only.
async fn notify_owner(state: &AppState, actor_id: Uuid, recipe_id: Uuid, kind: NotificationKind) {
    let owner = match state.store.get_recipe(recipe_id).await {
        Ok(Some(r)) => r.owner,
        Ok(None) => return,
        Err(e) => {
            warn!(error = %e, %recipe_id, "owner lookup for notification failed");
            return;
        }
    };
    if owner == actor_id {
        return;
    }
    let n = NewNotification {
        user_id: owner,
        actor_id,
        recipe_id: Some(recipe_id),
        kind,
    };
    if let Err(e) = state.store.create_notification(n).await {
        warn!(error = %e, %recipe_id, kind = kind.as_str(), "failed to create notification");
    }
}

#[instrument(skip(state))]
pub async fn like(state: &AppState, user_id: Uuid, recipe_id: Uuid) -> StoreResult<LikeSummary> {
    if state.store.like(user_id, recipe_id).await? {
        info!(%user_id, %recipe_id, "recipe liked");
        notify_owner(state, user_id, recipe_id, NotificationKind::Like).await;
    }
    state.store.like_summary(recipe_id, Some(user_id)).await
}

#[instrument(skip(state))]
pub async fn unlike(state: &AppState, user_id: Uuid, recipe_id: Uuid) -> StoreResult<LikeSummary> {
    state.store.unlike(user_id, recipe_id).await?;
    state.store.like_summary(recipe_id, Some(user_id)).await
}

#[instrument(skip(state, content))]
pub async fn comment(
    state: &AppState,
    user_id: Uuid,
    recipe_id: Uuid,
    content: &str,
) -> StoreResult<Comment> {
    let content = content.trim();
    if content.is_empty() {
        return Err(StoreError::Invalid("Comment cannot be empty.".into()));
    }
    if content.chars().count() > MAX_COMMENT_LEN {
        return Err(StoreError::Invalid("Comment is too long.".into()));
    }
    let created = state.store.add_comment(recipe_id, user_id, content).await?;
    notify_owner(state, user_id, recipe_id, NotificationKind::Comment).await;
    Ok(created)
}

#[instrument(skip(state))]
pub async fn rate(
    state: &AppState,
    user_id: Uuid,
    recipe_id: Uuid,
    stars: i16,
) -> StoreResult<RatingSummary> {
    if !(1..=5).contains(&stars) {
        return Err(StoreError::Invalid("Rating must be between 1 and 5.".into()));
    }
    state.store.rate(user_id, recipe_id, stars).await?;
    state.store.rating_summary(recipe_id, Some(user_id)).await
}

#[instrument(skip(state))]
pub async fn follow(state: &AppState, follower: Uuid, following: Uuid) -> StoreResult<()> {
    if follower == following {
        return Err(StoreError::Invalid("You cannot follow yourself.".into()));
    }
    state.store.follow(follower, following).await?;
    info!(%follower, %following, "followed");
    Ok(())
}
