use std::sync::Arc;

use uuid::Uuid;

use crate::app::error::AccessError;
use crate::app::visibility::VisibilityEvaluator;
use crate::domain::social_graph::{BlockEdge, FollowEdge, FollowStatus, Relationship};
use crate::infra::store::{FollowWrite, GraphStore};

/// Executes block, follow and interaction mutations against the graph.
///
/// Holds no state besides the store handle; every invariant is enforced by a
/// single atomic store call.
#[derive(Clone)]
pub struct RelationshipMutator {
    pub(crate) store: Arc<dyn GraphStore>,
    pub(crate) visibility: VisibilityEvaluator,
}

impl RelationshipMutator {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        let visibility = VisibilityEvaluator::new(store.clone());
        Self { store, visibility }
    }

    pub fn visibility(&self) -> &VisibilityEvaluator {
        &self.visibility
    }

    /// Idempotent: a repeated block returns the edge stored by the first one.
    pub async fn block(&self, blocker: Uuid, blocked: Uuid) -> Result<BlockEdge, AccessError> {
        let (edge, created) = self.store.insert_block(blocker, blocked).await?;
        if created {
            tracing::debug!(blocker_id = %blocker, blocked_id = %blocked, "block created");
        }
        Ok(edge)
    }

    pub async fn unblock(&self, blocker: Uuid, blocked: Uuid) -> Result<(), AccessError> {
        if self.store.delete_block(blocker, blocked).await? {
            tracing::debug!(blocker_id = %blocker, blocked_id = %blocked, "block removed");
            Ok(())
        } else {
            Err(AccessError::NotFound)
        }
    }

    pub async fn is_blocked(&self, a: Uuid, b: Uuid) -> Result<bool, AccessError> {
        self.store.block_exists(a, b).await
    }

    pub async fn blocked_users(
        &self,
        blocker: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BlockEdge>, AccessError> {
        self.store.list_blocked(blocker, limit, offset).await
    }

    /// Creates the edge, or re-issues it without ever downgrading an
    /// accepted edge. Self-follow is rejected by callers.
    pub async fn follow(&self, follower: Uuid, target: Uuid) -> Result<FollowEdge, AccessError> {
        match self.store.upsert_follow(follower, target).await? {
            FollowWrite::Created(edge) => {
                tracing::debug!(
                    follower_id = %follower,
                    following_id = %target,
                    status = edge.status.as_db(),
                    "follow created"
                );
                Ok(edge)
            }
            FollowWrite::Upgraded(edge) => {
                tracing::debug!(
                    follower_id = %follower,
                    following_id = %target,
                    "pending follow upgraded"
                );
                Ok(edge)
            }
            FollowWrite::Unchanged(edge) => Ok(edge),
            FollowWrite::Blocked => Err(AccessError::Blocked),
            FollowWrite::MissingTarget => {
                Err(AccessError::Reference(format!("user {} does not exist", target)))
            }
        }
    }

    pub async fn unfollow(&self, follower: Uuid, target: Uuid) -> Result<(), AccessError> {
        if self.store.delete_follow(follower, target).await? {
            Ok(())
        } else {
            Err(AccessError::NotFound)
        }
    }

    /// Only a pending edge can be accepted; accepted and missing edges are
    /// both `NotFound`.
    pub async fn accept_follow(&self, follower: Uuid, target: Uuid) -> Result<(), AccessError> {
        match self.store.accept_follow(follower, target).await? {
            Some(_) => {
                tracing::debug!(follower_id = %follower, following_id = %target, "follow accepted");
                Ok(())
            }
            None => Err(AccessError::NotFound),
        }
    }

    pub async fn decline_follow(&self, follower: Uuid, target: Uuid) -> Result<(), AccessError> {
        if self.store.decline_follow(follower, target).await? {
            Ok(())
        } else {
            Err(AccessError::NotFound)
        }
    }

    pub async fn follow_status(
        &self,
        follower: Uuid,
        target: Uuid,
    ) -> Result<FollowStatus, AccessError> {
        self.store
            .follow_edge(follower, target)
            .await?
            .map(|edge| edge.status)
            .ok_or(AccessError::NotFound)
    }

    pub async fn list_followers(
        &self,
        of: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<FollowEdge>, AccessError> {
        self.store.list_followers(of, limit, offset).await
    }

    pub async fn list_following(
        &self,
        of: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<FollowEdge>, AccessError> {
        self.store.list_following(of, limit, offset).await
    }

    pub async fn list_follow_requests(
        &self,
        target: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<FollowEdge>, AccessError> {
        self.store.list_follow_requests(target, limit, offset).await
    }

    pub async fn relationship(
        &self,
        viewer: Uuid,
        other: Uuid,
    ) -> Result<Relationship, AccessError> {
        if viewer == other {
            return Ok(Relationship::default());
        }
        self.store.relationship(viewer, other).await
    }
}
