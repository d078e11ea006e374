//! In-process `GraphStore`.
//!
//! Each trait method takes the state lock once, so every call is atomic in
//! the same way as its Postgres counterpart. Useful for tests and for
//! embedding the access layer without a database.

use std::collections::{HashMap, HashSet};

use anyhow::anyhow;
use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::app::error::AccessError;
use crate::app::policy::{BlockPolicy, FollowPolicy};
use crate::app::visibility::{decide, VisibilityFacts};
use crate::domain::content::{ContentKind, ContentOwner, Workout};
use crate::domain::engagement::{Comment, Like, LikerDetail};
use crate::domain::social_graph::{BlockEdge, FollowEdge, FollowStatus, Relationship};
use crate::domain::user::Actor;
use crate::infra::store::{FollowWrite, GraphStore, StoreResult};

#[derive(Default)]
struct State {
    last_tick: Option<OffsetDateTime>,
    actors: HashMap<Uuid, Actor>,
    admins: HashSet<Uuid>,
    blocks: HashMap<(Uuid, Uuid), BlockEdge>,
    follows: HashMap<(Uuid, Uuid), FollowEdge>,
    content: HashMap<(ContentKind, Uuid), ContentOwner>,
    workouts: HashMap<Uuid, Workout>,
    likes: HashMap<(Uuid, Uuid), Like>,
    comments: HashMap<Uuid, Comment>,
}

impl State {
    /// Strictly increasing timestamps keep listing order deterministic.
    fn tick(&mut self) -> OffsetDateTime {
        let now = OffsetDateTime::now_utc();
        let next = match self.last_tick {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_tick = Some(next);
        next
    }

    fn blocked(&self, a: Uuid, b: Uuid) -> bool {
        BlockPolicy::separates(
            self.blocks.contains_key(&(a, b)),
            self.blocks.contains_key(&(b, a)),
        )
    }

    fn follow_status(&self, follower: Uuid, target: Uuid) -> Option<FollowStatus> {
        self.follows.get(&(follower, target)).map(|edge| edge.status)
    }

    fn facts(&self, viewer: Uuid, owner: Uuid) -> Option<VisibilityFacts> {
        let owner_actor = self.actors.get(&owner)?;
        Some(VisibilityFacts {
            viewer_blocks_owner: self.blocks.contains_key(&(viewer, owner)),
            owner_blocks_viewer: self.blocks.contains_key(&(owner, viewer)),
            owner_is_private: owner_actor.is_private,
            follow_status: self.follow_status(viewer, owner),
        })
    }

    fn require_actor(&self, id: Uuid) -> StoreResult<()> {
        if self.actors.contains_key(&id) {
            Ok(())
        } else {
            Err(AccessError::Reference(format!("user {} does not exist", id)))
        }
    }

    fn adjust_follow_counts(&mut self, follower: Uuid, following: Uuid, delta: i64) {
        if let Some(actor) = self.actors.get_mut(&follower) {
            actor.following_count += delta;
        }
        if let Some(actor) = self.actors.get_mut(&following) {
            actor.followers_count += delta;
        }
    }

    /// Interaction guard for `actor` on a workout; never applies admin bypass.
    fn may_interact(&self, actor: Uuid, workout: Uuid) -> bool {
        let Some(owner) = self.workouts.get(&workout).map(|w| w.owner_id) else {
            return false;
        };
        let Some(facts) = self.facts(actor, owner) else {
            return false;
        };
        decide(actor, ContentOwner::User(owner), false, &facts).is_allowed()
    }

    fn ghosted(&self, ghost_viewer: Option<Uuid>, author: Uuid) -> bool {
        ghost_viewer.is_some_and(|viewer| self.blocked(viewer, author))
    }

    fn follow_edges<F>(&self, keep: F, limit: i64, offset: i64) -> Vec<FollowEdge>
    where
        F: Fn(&FollowEdge) -> bool,
    {
        let edges: Vec<FollowEdge> = self
            .follows
            .values()
            .filter(|edge| keep(edge) && !self.blocked(edge.follower_id, edge.following_id))
            .cloned()
            .collect();
        page(newest_first(edges, |edge| edge.created_at), limit, offset)
    }
}

fn newest_first<T, F>(mut items: Vec<T>, created_at: F) -> Vec<T>
where
    F: Fn(&T) -> OffsetDateTime,
{
    items.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    items
}

fn page<T>(items: Vec<T>, limit: i64, offset: i64) -> Vec<T> {
    let offset = usize::try_from(offset).unwrap_or(0);
    let limit = usize::try_from(limit).unwrap_or(0);
    items.into_iter().skip(offset).take(limit).collect()
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create_actor(&self, handle: &str, is_private: bool) -> Uuid {
        let mut state = self.state.lock().await;
        let id = Uuid::new_v4();
        let created_at = state.tick();
        state.actors.insert(
            id,
            Actor {
                id,
                handle: handle.to_string(),
                display_name: handle.to_string(),
                is_private,
                followers_count: 0,
                following_count: 0,
                created_at,
            },
        );
        id
    }

    pub async fn grant_admin(&self, id: Uuid) {
        self.state.lock().await.admins.insert(id);
    }

    pub async fn create_workout(&self, owner: Uuid, title: &str) -> StoreResult<Uuid> {
        let mut state = self.state.lock().await;
        state.require_actor(owner)?;
        let id = Uuid::new_v4();
        let created_at = state.tick();
        state.workouts.insert(
            id,
            Workout {
                id,
                owner_id: owner,
                title: title.to_string(),
                notes: None,
                like_count: 0,
                comment_count: 0,
                created_at,
            },
        );
        state
            .content
            .insert((ContentKind::Workout, id), ContentOwner::User(owner));
        Ok(id)
    }

    /// Registers a non-workout content row. `None` owner means system content.
    pub async fn create_content(
        &self,
        kind: ContentKind,
        owner: Option<Uuid>,
    ) -> StoreResult<Uuid> {
        let mut state = self.state.lock().await;
        if let Some(owner) = owner {
            state.require_actor(owner)?;
        }
        let id = Uuid::new_v4();
        state.content.insert((kind, id), ContentOwner::from_db(owner));
        Ok(id)
    }

    /// Stored block rows for the ordered pair, for asserting uniqueness.
    pub async fn block_rows(&self, blocker: Uuid, blocked: Uuid) -> usize {
        let state = self.state.lock().await;
        state
            .blocks
            .keys()
            .filter(|key| **key == (blocker, blocked))
            .count()
    }

    pub async fn like_rows(&self, workout: Uuid) -> usize {
        let state = self.state.lock().await;
        state
            .likes
            .values()
            .filter(|like| like.workout_id == workout)
            .count()
    }
}

#[async_trait]
impl GraphStore for MemoryStore {
    async fn actor(&self, id: Uuid) -> StoreResult<Option<Actor>> {
        Ok(self.state.lock().await.actors.get(&id).cloned())
    }

    async fn is_admin(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.state.lock().await.admins.contains(&id))
    }

    async fn visibility_facts(
        &self,
        viewer: Uuid,
        owner: Uuid,
    ) -> StoreResult<Option<VisibilityFacts>> {
        Ok(self.state.lock().await.facts(viewer, owner))
    }

    async fn relationship(&self, viewer: Uuid, other: Uuid) -> StoreResult<Relationship> {
        let state = self.state.lock().await;
        let is_blocking = state.blocks.contains_key(&(viewer, other));
        let is_blocked_by = state.blocks.contains_key(&(other, viewer));
        if is_blocking || is_blocked_by {
            return Ok(Relationship {
                is_blocking,
                is_blocked_by,
                ..Default::default()
            });
        }
        Ok(Relationship {
            following: state.follow_status(viewer, other),
            followed_by: state.follow_status(other, viewer),
            is_blocking,
            is_blocked_by,
        })
    }

    async fn insert_block(
        &self,
        blocker: Uuid,
        blocked: Uuid,
    ) -> StoreResult<(BlockEdge, bool)> {
        let mut state = self.state.lock().await;
        state.require_actor(blocker)?;
        state.require_actor(blocked)?;
        if blocker == blocked {
            return Err(anyhow!("blocks_distinct_parties: blocker and blocked must differ").into());
        }

        if let Some(existing) = state.blocks.get(&(blocker, blocked)) {
            return Ok((existing.clone(), false));
        }

        let edge = BlockEdge {
            blocker_id: blocker,
            blocked_id: blocked,
            created_at: state.tick(),
        };
        state.blocks.insert((blocker, blocked), edge.clone());

        for key in [(blocker, blocked), (blocked, blocker)] {
            if let Some(removed) = state.follows.remove(&key) {
                if removed.status == FollowStatus::Accepted {
                    state.adjust_follow_counts(removed.follower_id, removed.following_id, -1);
                }
            }
        }

        Ok((edge, true))
    }

    async fn delete_block(&self, blocker: Uuid, blocked: Uuid) -> StoreResult<bool> {
        Ok(self
            .state
            .lock()
            .await
            .blocks
            .remove(&(blocker, blocked))
            .is_some())
    }

    async fn block_exists(&self, a: Uuid, b: Uuid) -> StoreResult<bool> {
        Ok(self.state.lock().await.blocked(a, b))
    }

    async fn list_blocked(
        &self,
        blocker: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<BlockEdge>> {
        let state = self.state.lock().await;
        let edges: Vec<BlockEdge> = state
            .blocks
            .values()
            .filter(|edge| edge.blocker_id == blocker)
            .cloned()
            .collect();
        Ok(page(newest_first(edges, |edge| edge.created_at), limit, offset))
    }

    async fn upsert_follow(&self, follower: Uuid, target: Uuid) -> StoreResult<FollowWrite> {
        let mut state = self.state.lock().await;
        if state.blocked(follower, target) {
            return Ok(FollowWrite::Blocked);
        }
        let Some(target_is_private) = state.actors.get(&target).map(|a| a.is_private) else {
            return Ok(FollowWrite::MissingTarget);
        };
        state.require_actor(follower)?;
        if follower == target {
            return Err(
                anyhow!("follows_distinct_parties: follower and following must differ").into(),
            );
        }

        let before = state.follow_status(follower, target);
        let after = match before {
            Some(current) => FollowPolicy::reissue(current, target_is_private),
            None => FollowPolicy::initial_status(target_is_private),
        };
        if FollowPolicy::counts_transition(before, after) {
            state.adjust_follow_counts(follower, target, 1);
        }

        let created_at = state.tick();
        let edge = state
            .follows
            .entry((follower, target))
            .or_insert_with(|| FollowEdge {
                follower_id: follower,
                following_id: target,
                status: after,
                created_at,
            });
        edge.status = after;
        let edge = edge.clone();

        Ok(match before {
            None => FollowWrite::Created(edge),
            Some(previous) if previous != after => FollowWrite::Upgraded(edge),
            Some(_) => FollowWrite::Unchanged(edge),
        })
    }

    async fn delete_follow(&self, follower: Uuid, target: Uuid) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        let Some(removed) = state.follows.remove(&(follower, target)) else {
            return Ok(false);
        };
        if removed.status == FollowStatus::Accepted {
            state.adjust_follow_counts(follower, target, -1);
        }
        Ok(true)
    }

    async fn accept_follow(
        &self,
        follower: Uuid,
        target: Uuid,
    ) -> StoreResult<Option<FollowEdge>> {
        let mut state = self.state.lock().await;
        if state.blocked(follower, target) {
            return Ok(None);
        }
        let Some(edge) = state.follows.get_mut(&(follower, target)) else {
            return Ok(None);
        };
        let Some(next) = FollowPolicy::accept(edge.status) else {
            return Ok(None);
        };
        edge.status = next;
        let edge = edge.clone();
        state.adjust_follow_counts(follower, target, 1);
        Ok(Some(edge))
    }

    async fn decline_follow(&self, follower: Uuid, target: Uuid) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        if state.follow_status(follower, target) != Some(FollowStatus::Pending) {
            return Ok(false);
        }
        state.follows.remove(&(follower, target));
        Ok(true)
    }

    async fn follow_edge(&self, follower: Uuid, target: Uuid) -> StoreResult<Option<FollowEdge>> {
        let state = self.state.lock().await;
        if state.blocked(follower, target) {
            return Ok(None);
        }
        Ok(state.follows.get(&(follower, target)).cloned())
    }

    async fn list_followers(
        &self,
        of: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<FollowEdge>> {
        let state = self.state.lock().await;
        Ok(state.follow_edges(
            |edge| edge.following_id == of && edge.status == FollowStatus::Accepted,
            limit,
            offset,
        ))
    }

    async fn list_following(
        &self,
        of: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<FollowEdge>> {
        let state = self.state.lock().await;
        Ok(state.follow_edges(
            |edge| edge.follower_id == of && edge.status == FollowStatus::Accepted,
            limit,
            offset,
        ))
    }

    async fn list_follow_requests(
        &self,
        target: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<FollowEdge>> {
        let state = self.state.lock().await;
        Ok(state.follow_edges(
            |edge| edge.following_id == target && edge.status == FollowStatus::Pending,
            limit,
            offset,
        ))
    }

    async fn set_private(&self, id: Uuid, private: bool) -> StoreResult<Option<(Actor, u64)>> {
        let mut state = self.state.lock().await;
        let Some(actor) = state.actors.get_mut(&id) else {
            return Ok(None);
        };
        actor.is_private = private;

        let mut accepted = 0;
        if !private {
            let pending: Vec<Uuid> = state
                .follows
                .values()
                .filter(|edge| edge.following_id == id && edge.status == FollowStatus::Pending)
                .map(|edge| edge.follower_id)
                .filter(|follower| !state.blocked(*follower, id))
                .collect();
            for follower in pending {
                if let Some(edge) = state.follows.get_mut(&(follower, id)) {
                    edge.status = FollowStatus::Accepted;
                }
                state.adjust_follow_counts(follower, id, 1);
                accepted += 1;
            }
        }

        let actor = state.actors.get(&id).cloned();
        Ok(actor.map(|actor| (actor, accepted)))
    }

    async fn content_owner(
        &self,
        kind: ContentKind,
        id: Uuid,
    ) -> StoreResult<Option<ContentOwner>> {
        Ok(self.state.lock().await.content.get(&(kind, id)).copied())
    }

    async fn workout(&self, id: Uuid) -> StoreResult<Option<Workout>> {
        Ok(self.state.lock().await.workouts.get(&id).cloned())
    }

    async fn insert_like(&self, actor: Uuid, workout: Uuid) -> StoreResult<Option<Like>> {
        let mut state = self.state.lock().await;
        if !state.may_interact(actor, workout) {
            return Ok(None);
        }
        state.require_actor(actor)?;
        if state.likes.contains_key(&(actor, workout)) {
            return Ok(None);
        }

        let like = Like {
            id: Uuid::new_v4(),
            user_id: actor,
            workout_id: workout,
            created_at: state.tick(),
        };
        state.likes.insert((actor, workout), like.clone());
        if let Some(row) = state.workouts.get_mut(&workout) {
            row.like_count += 1;
        }
        Ok(Some(like))
    }

    async fn find_like(&self, actor: Uuid, workout: Uuid) -> StoreResult<Option<Like>> {
        Ok(self.state.lock().await.likes.get(&(actor, workout)).cloned())
    }

    async fn delete_like(&self, actor: Uuid, workout: Uuid) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        if state.likes.remove(&(actor, workout)).is_none() {
            return Ok(false);
        }
        if let Some(row) = state.workouts.get_mut(&workout) {
            row.like_count -= 1;
        }
        Ok(true)
    }

    async fn list_likes(
        &self,
        workout: Uuid,
        ghost_viewer: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<LikerDetail>> {
        let state = self.state.lock().await;
        let likers: Vec<LikerDetail> = state
            .likes
            .values()
            .filter(|like| like.workout_id == workout)
            .filter(|like| !state.ghosted(ghost_viewer, like.user_id))
            .filter_map(|like| {
                let user = state.actors.get(&like.user_id)?;
                Some(LikerDetail {
                    like_id: like.id,
                    user_id: like.user_id,
                    handle: user.handle.clone(),
                    display_name: user.display_name.clone(),
                    liked_at: like.created_at,
                })
            })
            .collect();
        Ok(page(newest_first(likers, |liker| liker.liked_at), limit, offset))
    }

    async fn insert_comment(
        &self,
        actor: Uuid,
        workout: Uuid,
        body: &str,
    ) -> StoreResult<Option<Comment>> {
        let mut state = self.state.lock().await;
        if !state.may_interact(actor, workout) {
            return Ok(None);
        }
        state.require_actor(actor)?;

        let comment = Comment {
            id: Uuid::new_v4(),
            user_id: actor,
            workout_id: workout,
            body: body.to_string(),
            created_at: state.tick(),
        };
        state.comments.insert(comment.id, comment.clone());
        if let Some(row) = state.workouts.get_mut(&workout) {
            row.comment_count += 1;
        }
        Ok(Some(comment))
    }

    async fn delete_comment(
        &self,
        comment: Uuid,
        workout: Uuid,
        author: Uuid,
    ) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        let owned = state
            .comments
            .get(&comment)
            .is_some_and(|c| c.workout_id == workout && c.user_id == author);
        if !owned {
            return Ok(false);
        }
        state.comments.remove(&comment);
        if let Some(row) = state.workouts.get_mut(&workout) {
            row.comment_count -= 1;
        }
        Ok(true)
    }

    async fn list_comments(
        &self,
        workout: Uuid,
        ghost_viewer: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Comment>> {
        let state = self.state.lock().await;
        let comments: Vec<Comment> = state
            .comments
            .values()
            .filter(|c| c.workout_id == workout && !state.ghosted(ghost_viewer, c.user_id))
            .cloned()
            .collect();
        Ok(page(newest_first(comments, |c| c.created_at), limit, offset))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
