use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    models::{
        Collection, Comment, HistoryEntry, LikeSummary, NewNotification, Notification, Profile,
        RatingSummary, StoredRecipe,
    },
    Store, StoreError, StoreResult,
};
use crate::recipes::model::{Author, Recipe};

struct HistoryRecord {
    id: Uuid,
    user: Uuid,
    recipe: Uuid,
    at: OffsetDateTime,
}

struct CollectionRecord {
    id: Uuid,
    user: Uuid,
    name: String,
    at: OffsetDateTime,
}

struct CommentRecord {
    id: Uuid,
    recipe: Uuid,
    user: Uuid,
    content: String,
    at: OffsetDateTime,
}

struct NotificationRecord {
    id: Uuid,
    new: NewNotification,
    read: bool,
    at: OffsetDateTime,
}

/// Link tables keep insertion order, so newest-first reads iterate in reverse.
#[derive(Default)]
struct MemoryState {
    recipes: HashMap<Uuid, StoredRecipe>,
    recipe_order: Vec<Uuid>,
    profiles: HashMap<Uuid, Profile>,
    saved: Vec<(Uuid, Uuid)>,
    history: Vec<HistoryRecord>,
    collections: Vec<CollectionRecord>,
    members: Vec<(Uuid, Uuid)>,
    likes: Vec<(Uuid, Uuid)>,
    comments: Vec<CommentRecord>,
    ratings: HashMap<(Uuid, Uuid), i16>,
    follows: Vec<(Uuid, Uuid)>,
    notifications: Vec<NotificationRecord>,
}

impl MemoryState {
    fn require_recipe(&self, id: Uuid) -> StoreResult<()> {
        if self.recipes.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }

    fn require_collection(&self, user: Uuid, collection: Uuid) -> StoreResult<()> {
        if self
            .collections
            .iter()
            .any(|c| c.id == collection && c.user == user)
        {
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }

    fn recipe(&self, id: Uuid) -> Option<Recipe> {
        self.stored(id).map(|s| s.recipe)
    }

    fn stored(&self, id: Uuid) -> Option<StoredRecipe> {
        let mut stored = self.recipes.get(&id)?.clone();
        stored.recipe.author = self.profiles.get(&stored.owner).and_then(|p| {
            (p.username.is_some() || p.avatar_url.is_some()).then(|| Author {
                username: p.username.clone(),
                avatar_url: p.avatar_url.clone(),
            })
        });
        Some(stored)
    }

    /// Profile for a user id, bare when the user never set one up.
    fn profile(&self, id: Uuid) -> Profile {
        self.profiles.get(&id).cloned().unwrap_or(Profile {
            id,
            username: None,
            avatar_url: None,
        })
    }

    fn joined_profile(&self, id: Uuid) -> Option<Profile> {
        self.profiles
            .get(&id)
            .filter(|p| p.username.is_some() || p.avatar_url.is_some())
            .cloned()
    }
}

/// Process-local [`Store`] used for tests and `STORE_BACKEND=memory`.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert_recipe(&self, recipe: &Recipe, owner: Uuid) -> StoreResult<()> {
        let mut guard = self.state.write().await;
        let s = &mut *guard;
        match s.recipes.get_mut(&recipe.id) {
            Some(existing) if existing.owner == owner => {
                let generated_at = existing.recipe.generated_at;
                existing.recipe = Recipe {
                    author: None,
                    generated_at,
                    ..recipe.clone()
                };
            }
            Some(_) => {}
            None => {
                s.recipes.insert(
                    recipe.id,
                    StoredRecipe {
                        recipe: Recipe {
                            author: None,
                            ..recipe.clone()
                        },
                        owner,
                        public: true,
                    },
                );
                s.recipe_order.push(recipe.id);
            }
        }
        Ok(())
    }

    async fn get_recipe(&self, id: Uuid) -> StoreResult<Option<StoredRecipe>> {
        Ok(self.state.read().await.stored(id))
    }

    async fn list_public_recipes(&self, limit: i64) -> StoreResult<Vec<Recipe>> {
        let s = self.state.read().await;
        Ok(s.recipe_order
            .iter()
            .rev()
            .filter_map(|id| s.stored(*id))
            .filter(|r| r.public)
            .take(limit.max(0) as usize)
            .map(|r| r.recipe)
            .collect())
    }

    async fn update_ingredients(&self, id: Uuid, ingredients: &[String]) -> StoreResult<()> {
        let mut s = self.state.write().await;
        let stored = s.recipes.get_mut(&id).ok_or(StoreError::NotFound)?;
        stored.recipe.ingredients = ingredients.to_vec();
        Ok(())
    }

    async fn save_recipe(&self, user: Uuid, recipe: Uuid) -> StoreResult<()> {
        let mut s = self.state.write().await;
        s.require_recipe(recipe)?;
        if !s.saved.contains(&(user, recipe)) {
            s.saved.push((user, recipe));
        }
        Ok(())
    }

    async fn remove_saved(&self, user: Uuid, recipe: Uuid) -> StoreResult<()> {
        self.state
            .write()
            .await
            .saved
            .retain(|link| *link != (user, recipe));
        Ok(())
    }

    async fn is_saved(&self, user: Uuid, recipe: Uuid) -> StoreResult<bool> {
        Ok(self.state.read().await.saved.contains(&(user, recipe)))
    }

    async fn list_saved(&self, user: Uuid) -> StoreResult<Vec<Recipe>> {
        let s = self.state.read().await;
        Ok(s.saved
            .iter()
            .rev()
            .filter(|(u, _)| *u == user)
            .filter_map(|(_, r)| s.recipe(*r))
            .collect())
    }

    async fn add_history(&self, user: Uuid, recipe: Uuid) -> StoreResult<()> {
        let mut s = self.state.write().await;
        s.require_recipe(recipe)?;
        // One entry per (user, recipe); revisiting moves it to the front.
        let id = match s.history.iter().position(|h| h.user == user && h.recipe == recipe) {
            Some(idx) => s.history.remove(idx).id,
            None => Uuid::new_v4(),
        };
        s.history.push(HistoryRecord {
            id,
            user,
            recipe,
            at: OffsetDateTime::now_utc(),
        });
        Ok(())
    }

    async fn list_history(&self, user: Uuid, limit: i64) -> StoreResult<Vec<HistoryEntry>> {
        let s = self.state.read().await;
        Ok(s.history
            .iter()
            .rev()
            .filter(|h| h.user == user)
            .filter_map(|h| {
                s.recipe(h.recipe).map(|recipe| HistoryEntry {
                    id: h.id,
                    created_at: h.at,
                    recipe,
                })
            })
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn create_collection(&self, user: Uuid, name: &str) -> StoreResult<Collection> {
        let record = CollectionRecord {
            id: Uuid::new_v4(),
            user,
            name: name.to_string(),
            at: OffsetDateTime::now_utc(),
        };
        let created = Collection {
            id: record.id,
            user_id: user,
            name: record.name.clone(),
            recipe_count: 0,
            created_at: record.at,
        };
        self.state.write().await.collections.push(record);
        Ok(created)
    }

    async fn delete_collection(&self, user: Uuid, collection: Uuid) -> StoreResult<()> {
        let mut s = self.state.write().await;
        s.require_collection(user, collection)?;
        s.collections.retain(|c| c.id != collection);
        s.members.retain(|(c, _)| *c != collection);
        Ok(())
    }

    async fn list_collections(&self, user: Uuid) -> StoreResult<Vec<Collection>> {
        let s = self.state.read().await;
        Ok(s.collections
            .iter()
            .rev()
            .filter(|c| c.user == user)
            .map(|c| Collection {
                id: c.id,
                user_id: c.user,
                name: c.name.clone(),
                recipe_count: s.members.iter().filter(|(id, _)| *id == c.id).count() as i64,
                created_at: c.at,
            })
            .collect())
    }

    async fn add_to_collection(
        &self,
        user: Uuid,
        collection: Uuid,
        recipe: Uuid,
    ) -> StoreResult<()> {
        let mut s = self.state.write().await;
        s.require_collection(user, collection)?;
        s.require_recipe(recipe)?;
        if !s.members.contains(&(collection, recipe)) {
            s.members.push((collection, recipe));
        }
        Ok(())
    }

    async fn remove_from_collection(
        &self,
        user: Uuid,
        collection: Uuid,
        recipe: Uuid,
    ) -> StoreResult<()> {
        let mut s = self.state.write().await;
        s.require_collection(user, collection)?;
        s.members.retain(|link| *link != (collection, recipe));
        Ok(())
    }

    async fn collection_recipes(&self, user: Uuid, collection: Uuid) -> StoreResult<Vec<Recipe>> {
        let s = self.state.read().await;
        s.require_collection(user, collection)?;
        Ok(s.members
            .iter()
            .rev()
            .filter(|(c, _)| *c == collection)
            .filter_map(|(_, r)| s.recipe(*r))
            .collect())
    }

    async fn recipe_collections(&self, user: Uuid, recipe: Uuid) -> StoreResult<Vec<Uuid>> {
        let s = self.state.read().await;
        Ok(s.members
            .iter()
            .filter(|(c, r)| {
                *r == recipe && s.collections.iter().any(|x| x.id == *c && x.user == user)
            })
            .map(|(c, _)| *c)
            .collect())
    }

    async fn like(&self, user: Uuid, recipe: Uuid) -> StoreResult<bool> {
        let mut s = self.state.write().await;
        s.require_recipe(recipe)?;
        if s.likes.contains(&(user, recipe)) {
            return Ok(false);
        }
        s.likes.push((user, recipe));
        Ok(true)
    }

    async fn unlike(&self, user: Uuid, recipe: Uuid) -> StoreResult<()> {
        self.state
            .write()
            .await
            .likes
            .retain(|link| *link != (user, recipe));
        Ok(())
    }

    async fn like_summary(&self, recipe: Uuid, viewer: Option<Uuid>) -> StoreResult<LikeSummary> {
        let s = self.state.read().await;
        let likes: Vec<_> = s.likes.iter().filter(|(_, r)| *r == recipe).collect();
        Ok(LikeSummary {
            count: likes.len() as i64,
            liked: viewer.is_some_and(|v| likes.iter().any(|(u, _)| *u == v)),
        })
    }

    async fn add_comment(&self, recipe: Uuid, user: Uuid, content: &str) -> StoreResult<Comment> {
        let mut s = self.state.write().await;
        s.require_recipe(recipe)?;
        let record = CommentRecord {
            id: Uuid::new_v4(),
            recipe,
            user,
            content: content.to_string(),
            at: OffsetDateTime::now_utc(),
        };
        let comment = Comment {
            id: record.id,
            recipe_id: recipe,
            user_id: user,
            content: record.content.clone(),
            created_at: record.at,
            author: s.joined_profile(user),
        };
        s.comments.push(record);
        Ok(comment)
    }

    async fn list_comments(&self, recipe: Uuid) -> StoreResult<Vec<Comment>> {
        let s = self.state.read().await;
        Ok(s.comments
            .iter()
            .filter(|c| c.recipe == recipe)
            .map(|c| Comment {
                id: c.id,
                recipe_id: c.recipe,
                user_id: c.user,
                content: c.content.clone(),
                created_at: c.at,
                author: s.joined_profile(c.user),
            })
            .collect())
    }

    async fn rate(&self, user: Uuid, recipe: Uuid, stars: i16) -> StoreResult<()> {
        if !(1..=5).contains(&stars) {
            return Err(StoreError::Invalid("Rating must be between 1 and 5.".into()));
        }
        let mut s = self.state.write().await;
        s.require_recipe(recipe)?;
        s.ratings.insert((user, recipe), stars);
        Ok(())
    }

    async fn rating_summary(
        &self,
        recipe: Uuid,
        viewer: Option<Uuid>,
    ) -> StoreResult<RatingSummary> {
        let s = self.state.read().await;
        let stars: Vec<i16> = s
            .ratings
            .iter()
            .filter(|((_, r), _)| *r == recipe)
            .map(|(_, v)| *v)
            .collect();
        let count = stars.len() as i64;
        let average = (count > 0)
            .then(|| stars.iter().map(|v| f64::from(*v)).sum::<f64>() / count as f64);
        Ok(RatingSummary {
            average,
            count,
            mine: viewer.and_then(|v| s.ratings.get(&(v, recipe)).copied()),
        })
    }

    async fn follow(&self, follower: Uuid, following: Uuid) -> StoreResult<()> {
        if follower == following {
            return Err(StoreError::Invalid("You cannot follow yourself.".into()));
        }
        let mut s = self.state.write().await;
        if !s.follows.contains(&(follower, following)) {
            s.follows.push((follower, following));
        }
        Ok(())
    }

    async fn unfollow(&self, follower: Uuid, following: Uuid) -> StoreResult<()> {
        self.state
            .write()
            .await
            .follows
            .retain(|edge| *edge != (follower, following));
        Ok(())
    }

    async fn is_following(&self, follower: Uuid, following: Uuid) -> StoreResult<bool> {
        Ok(self
            .state
            .read()
            .await
            .follows
            .contains(&(follower, following)))
    }

    async fn followers(&self, user: Uuid) -> StoreResult<Vec<Profile>> {
        let s = self.state.read().await;
        Ok(s.follows
            .iter()
            .rev()
            .filter(|(_, to)| *to == user)
            .map(|(from, _)| s.profile(*from))
            .collect())
    }

    async fn following(&self, user: Uuid) -> StoreResult<Vec<Profile>> {
        let s = self.state.read().await;
        Ok(s.follows
            .iter()
            .rev()
            .filter(|(from, _)| *from == user)
            .map(|(_, to)| s.profile(*to))
            .collect())
    }

    async fn create_notification(&self, notification: NewNotification) -> StoreResult<()> {
        self.state
            .write()
            .await
            .notifications
            .push(NotificationRecord {
                id: Uuid::new_v4(),
                new: notification,
                read: false,
                at: OffsetDateTime::now_utc(),
            });
        Ok(())
    }

    async fn list_notifications(&self, user: Uuid, limit: i64) -> StoreResult<Vec<Notification>> {
        let s = self.state.read().await;
        Ok(s.notifications
            .iter()
            .rev()
            .filter(|n| n.new.user_id == user)
            .take(limit.max(0) as usize)
            .map(|n| Notification {
                id: n.id,
                user_id: n.new.user_id,
                actor_id: n.new.actor_id,
                recipe_id: n.new.recipe_id,
                kind: n.new.kind,
                read: n.read,
                created_at: n.at,
                actor: s.joined_profile(n.new.actor_id),
                recipe_title: n
                    .new
                    .recipe_id
                    .and_then(|id| s.recipes.get(&id))
                    .map(|r| r.recipe.title.clone()),
            })
            .collect())
    }

    async fn mark_notifications_read(&self, user: Uuid) -> StoreResult<u64> {
        let mut s = self.state.write().await;
        let mut flipped = 0;
        for n in s
            .notifications
            .iter_mut()
            .filter(|n| n.new.user_id == user && !n.read)
        {
            n.read = true;
            flipped += 1;
        }
        Ok(flipped)
    }

    async fn get_profile(&self, user: Uuid) -> StoreResult<Option<Profile>> {
        Ok(self.state.read().await.profiles.get(&user).cloned())
    }

    async fn upsert_profile(&self, profile: &Profile) -> StoreResult<Profile> {
        let mut s = self.state.write().await;
        if let Some(name) = &profile.username {
            let taken = s
                .profiles
                .values()
                .any(|p| p.id != profile.id && p.username.as_deref() == Some(name.as_str()));
            if taken {
                return Err(StoreError::Conflict("Username is already taken.".into()));
            }
        }
        s.profiles.insert(profile.id, profile.clone());
        Ok(profile.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::NotificationKind;

    fn recipe(title: &str) -> Recipe {
        serde_json::from_value(serde_json::json!({
            "id": Uuid::new_v4(),
            "title": title,
            "ingredients": ["rice"],
            "instructions": ["cook"],
        }))
        .unwrap()
    }

    async fn seeded() -> (MemoryStore, Uuid, Recipe) {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let r = recipe("Jollof Rice");
        store.upsert_recipe(&r, owner).await.unwrap();
        (store, owner, r)
    }

    #[tokio::test]
    async fn like_unlike_like_leaves_one_row() {
        let (store, _, r) = seeded().await;
        let user = Uuid::new_v4();
        assert!(store.like(user, r.id).await.unwrap());
        store.unlike(user, r.id).await.unwrap();
        assert!(store.like(user, r.id).await.unwrap());
        assert!(!store.like(user, r.id).await.unwrap());

        let summary = store.like_summary(r.id, Some(user)).await.unwrap();
        assert_eq!(summary.count, 1);
        assert!(summary.liked);
        assert!(!store.like_summary(r.id, None).await.unwrap().liked);
    }

    #[tokio::test]
    async fn save_is_idempotent() {
        let (store, _, r) = seeded().await;
        let user = Uuid::new_v4();
        store.save_recipe(user, r.id).await.unwrap();
        store.save_recipe(user, r.id).await.unwrap();
        assert_eq!(store.list_saved(user).await.unwrap().len(), 1);

        store.remove_saved(user, r.id).await.unwrap();
        assert!(!store.is_saved(user, r.id).await.unwrap());
    }

    #[tokio::test]
    async fn revisiting_moves_history_entry_to_front() {
        let (store, _, first) = seeded().await;
        let second = recipe("Fufu");
        store.upsert_recipe(&second, Uuid::new_v4()).await.unwrap();
        let user = Uuid::new_v4();

        store.add_history(user, first.id).await.unwrap();
        store.add_history(user, second.id).await.unwrap();
        let before = store.list_history(user, 10).await.unwrap();
        store.add_history(user, first.id).await.unwrap();

        let history = store.list_history(user, 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].recipe.id, first.id);
        assert_eq!(history[1].recipe.id, second.id);
        assert_eq!(history[0].id, before[1].id);
    }

    #[tokio::test]
    async fn links_to_unknown_recipe_are_not_found() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        assert!(matches!(
            store.save_recipe(user, Uuid::new_v4()).await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.rate(user, Uuid::new_v4(), 4).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn upsert_by_stranger_keeps_original() {
        let (store, owner, r) = seeded().await;
        let mut hijack = r.clone();
        hijack.title = "Something else".into();
        store.upsert_recipe(&hijack, Uuid::new_v4()).await.unwrap();

        let stored = store.get_recipe(r.id).await.unwrap().unwrap();
        assert_eq!(stored.owner, owner);
        assert_eq!(stored.recipe.title, "Jollof Rice");

        store.upsert_recipe(&hijack, owner).await.unwrap();
        let stored = store.get_recipe(r.id).await.unwrap().unwrap();
        assert_eq!(stored.recipe.title, "Something else");
    }

    #[tokio::test]
    async fn collections_are_scoped_to_their_owner() {
        let (store, owner, r) = seeded().await;
        let c = store.create_collection(owner, "Sunday").await.unwrap();
        store.add_to_collection(owner, c.id, r.id).await.unwrap();
        store.add_to_collection(owner, c.id, r.id).await.unwrap();

        let listed = store.list_collections(owner).await.unwrap();
        assert_eq!(listed[0].recipe_count, 1);
        assert_eq!(store.recipe_collections(owner, r.id).await.unwrap(), vec![c.id]);

        let stranger = Uuid::new_v4();
        assert!(matches!(
            store.collection_recipes(stranger, c.id).await,
            Err(StoreError::NotFound)
        ));
        assert!(store.recipe_collections(stranger, r.id).await.unwrap().is_empty());

        store.delete_collection(owner, c.id).await.unwrap();
        assert!(store.list_collections(owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn follow_edges_are_directed() {
        let store = MemoryStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        store
            .upsert_profile(&Profile {
                id: a,
                username: Some("ama".into()),
                avatar_url: None,
            })
            .await
            .unwrap();
        store.follow(a, b).await.unwrap();
        store.follow(a, b).await.unwrap();

        assert!(store.is_following(a, b).await.unwrap());
        assert!(!store.is_following(b, a).await.unwrap());
        let followers = store.followers(b).await.unwrap();
        assert_eq!(followers.len(), 1);
        assert_eq!(followers[0].username.as_deref(), Some("ama"));
        assert!(matches!(store.follow(a, a).await, Err(StoreError::Invalid(_))));
    }

    #[tokio::test]
    async fn ratings_upsert_and_average() {
        let (store, _, r) = seeded().await;
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        store.rate(a, r.id, 2).await.unwrap();
        store.rate(a, r.id, 4).await.unwrap();
        store.rate(b, r.id, 5).await.unwrap();

        let summary = store.rating_summary(r.id, Some(a)).await.unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.average, Some(4.5));
        assert_eq!(summary.mine, Some(4));
    }

    #[tokio::test]
    async fn notifications_flip_read_once() {
        let (store, owner, r) = seeded().await;
        store
            .create_notification(NewNotification {
                user_id: owner,
                actor_id: Uuid::new_v4(),
                recipe_id: Some(r.id),
                kind: NotificationKind::Like,
            })
            .await
            .unwrap();

        let listed = store.list_notifications(owner, 20).await.unwrap();
        assert_eq!(listed[0].recipe_title.as_deref(), Some("Jollof Rice"));
        assert_eq!(store.mark_notifications_read(owner).await.unwrap(), 1);
        assert_eq!(store.mark_notifications_read(owner).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn usernames_are_unique() {
        let store = MemoryStore::new();
        let name = Some("chef".to_string());
        store
            .upsert_profile(&Profile {
                id: Uuid::new_v4(),
                username: name.clone(),
                avatar_url: None,
            })
            .await
            .unwrap();
        let clash = store
            .upsert_profile(&Profile {
                id: Uuid::new_v4(),
                username: name,
                avatar_url: None,
            })
            .await;
        assert!(matches!(clash, Err(StoreError::Conflict(_))));
    }
}
