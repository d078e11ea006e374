use async_trait::async_trait;
use uuid::Uuid;

use crate::app::error::AccessError;
use crate::app::visibility::VisibilityFacts;
use crate::domain::content::{ContentKind, ContentOwner, Workout};
use crate::domain::engagement::{Comment, Like, LikerDetail};
use crate::domain::social_graph::{BlockEdge, FollowEdge, Relationship};
use crate::domain::user::Actor;

pub type StoreResult<T> = Result<T, AccessError>;

/// Result of a follow upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowWrite {
    Created(FollowEdge),
    /// A pending edge became accepted because the target is now public.
    Upgraded(FollowEdge),
    Unchanged(FollowEdge),
    Blocked,
    MissingTarget,
}

/// Persistent relationship graph and the guarded content writes that depend
/// on it.
///
/// Every method is a single atomic unit at the store boundary: either one
/// guarded statement or one transaction. Callers never compose a read and a
/// write to enforce an invariant.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn actor(&self, id: Uuid) -> StoreResult<Option<Actor>>;

    async fn is_admin(&self, id: Uuid) -> StoreResult<bool>;

    /// `None` when `owner` does not exist.
    async fn visibility_facts(
        &self,
        viewer: Uuid,
        owner: Uuid,
    ) -> StoreResult<Option<VisibilityFacts>>;

    async fn relationship(&self, viewer: Uuid, other: Uuid) -> StoreResult<Relationship>;

    /// Insert-or-keep a block edge. A newly created edge removes follow edges
    /// between the pair in both directions and adjusts their counters in the
    /// same transaction. Returns the stored edge and whether it was created.
    async fn insert_block(&self, blocker: Uuid, blocked: Uuid)
        -> StoreResult<(BlockEdge, bool)>;

    async fn delete_block(&self, blocker: Uuid, blocked: Uuid) -> StoreResult<bool>;

    async fn block_exists(&self, a: Uuid, b: Uuid) -> StoreResult<bool>;

    async fn list_blocked(
        &self,
        blocker: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<BlockEdge>>;

    async fn upsert_follow(&self, follower: Uuid, target: Uuid) -> StoreResult<FollowWrite>;

    async fn delete_follow(&self, follower: Uuid, target: Uuid) -> StoreResult<bool>;

    /// Moves exactly a pending edge to accepted.
    async fn accept_follow(&self, follower: Uuid, target: Uuid)
        -> StoreResult<Option<FollowEdge>>;

    /// Removes exactly a pending edge.
    async fn decline_follow(&self, follower: Uuid, target: Uuid) -> StoreResult<bool>;

    /// Edges hidden by a block are reported as absent.
    async fn follow_edge(&self, follower: Uuid, target: Uuid) -> StoreResult<Option<FollowEdge>>;

    async fn list_followers(
        &self,
        of: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<FollowEdge>>;

    async fn list_following(
        &self,
        of: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<FollowEdge>>;

    async fn list_follow_requests(
        &self,
        target: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<FollowEdge>>;

    /// Flips account privacy. Going public accepts outstanding requests.
    /// Returns the updated actor and how many requests were accepted.
    async fn set_private(&self, id: Uuid, private: bool) -> StoreResult<Option<(Actor, u64)>>;

    /// `None` when the row is missing.
    async fn content_owner(&self, kind: ContentKind, id: Uuid)
        -> StoreResult<Option<ContentOwner>>;

    async fn workout(&self, id: Uuid) -> StoreResult<Option<Workout>>;

    /// Insert gated by the interaction guard; `None` when either the guard
    /// rejected the row or it already existed.
    async fn insert_like(&self, actor: Uuid, workout: Uuid) -> StoreResult<Option<Like>>;

    async fn find_like(&self, actor: Uuid, workout: Uuid) -> StoreResult<Option<Like>>;

    async fn delete_like(&self, actor: Uuid, workout: Uuid) -> StoreResult<bool>;

    /// `ghost_viewer` hides likes by actors on either side of a block with it.
    async fn list_likes(
        &self,
        workout: Uuid,
        ghost_viewer: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<LikerDetail>>;

    async fn insert_comment(
        &self,
        actor: Uuid,
        workout: Uuid,
        body: &str,
    ) -> StoreResult<Option<Comment>>;

    async fn delete_comment(
        &self,
        comment: Uuid,
        workout: Uuid,
        author: Uuid,
    ) -> StoreResult<bool>;

    async fn list_comments(
        &self,
        workout: Uuid,
        ghost_viewer: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Comment>>;

    async fn ping(&self) -> StoreResult<()>;
}
