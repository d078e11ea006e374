use std::sync::Arc;

use uuid::Uuid;

use crate::app::error::AccessError;
use crate::app::policy::{BlockPolicy, FollowPolicy};
use crate::domain::content::{ContentKind, ContentOwner};
use crate::domain::social_graph::FollowStatus;
use crate::infra::store::GraphStore;

/// Graph facts about a (viewer, owner) pair, gathered in one read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisibilityFacts {
    pub viewer_blocks_owner: bool,
    pub owner_blocks_viewer: bool,
    pub owner_is_private: bool,
    pub follow_status: Option<FollowStatus>,
}

impl VisibilityFacts {
    pub fn blocked(&self) -> bool {
        BlockPolicy::separates(self.viewer_blocks_owner, self.owner_blocks_viewer)
    }
}

/// Why a viewer may or may not see an owner's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    System,
    Admin,
    Owner,
    Public,
    Follower,
    Blocked,
    Private,
    Missing,
}

impl Visibility {
    pub fn is_allowed(&self) -> bool {
        matches!(
            self,
            Self::System | Self::Admin | Self::Owner | Self::Public | Self::Follower
        )
    }

    /// Ghost filtering is skipped only when the admin bypass granted access.
    pub fn ghost_viewer(&self, viewer: Uuid) -> Option<Uuid> {
        match self {
            Self::Admin => None,
            _ => Some(viewer),
        }
    }
}

/// Fixed-precedence decision: admin, ownership, block, privacy.
///
/// `viewer_is_admin` must be `false` for interaction guards; the admin bypass
/// only ever applies to reads.
pub fn decide(
    viewer: Uuid,
    owner: ContentOwner,
    viewer_is_admin: bool,
    facts: &VisibilityFacts,
) -> Visibility {
    let owner = match owner {
        ContentOwner::System => return Visibility::System,
        ContentOwner::User(owner) => owner,
    };
    if viewer_is_admin {
        return Visibility::Admin;
    }
    if viewer == owner {
        return Visibility::Owner;
    }
    if facts.blocked() {
        return Visibility::Blocked;
    }
    if !facts.owner_is_private {
        return Visibility::Public;
    }
    if FollowPolicy::grants_access(facts.follow_status) {
        Visibility::Follower
    } else {
        Visibility::Private
    }
}

/// Single entry point for read authorization across content types.
#[derive(Clone)]
pub struct VisibilityEvaluator {
    store: Arc<dyn GraphStore>,
}

impl VisibilityEvaluator {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    pub async fn evaluate(
        &self,
        viewer: Uuid,
        owner: ContentOwner,
    ) -> Result<Visibility, AccessError> {
        let owner_id = match owner {
            ContentOwner::System => return Ok(Visibility::System),
            ContentOwner::User(owner_id) => owner_id,
        };
        if self.store.is_admin(viewer).await? {
            return Ok(Visibility::Admin);
        }
        if viewer == owner_id {
            return Ok(Visibility::Owner);
        }
        let facts = match self.store.visibility_facts(viewer, owner_id).await? {
            Some(facts) => facts,
            None => return Ok(Visibility::Missing),
        };
        Ok(decide(viewer, owner, false, &facts))
    }

    pub async fn can_view(&self, viewer: Uuid, owner: Uuid) -> Result<bool, AccessError> {
        let visibility = self.evaluate(viewer, ContentOwner::User(owner)).await?;
        Ok(visibility.is_allowed())
    }

    /// Like `evaluate`, but a denial surfaces as `NotFound`.
    pub async fn require(
        &self,
        viewer: Uuid,
        owner: ContentOwner,
    ) -> Result<Visibility, AccessError> {
        let visibility = self.evaluate(viewer, owner).await?;
        if visibility.is_allowed() {
            Ok(visibility)
        } else {
            tracing::debug!(viewer_id = %viewer, ?owner, ?visibility, "read denied");
            Err(AccessError::NotFound)
        }
    }

    /// Resolves a content row's owner and applies `require` to it.
    pub async fn require_content(
        &self,
        kind: ContentKind,
        id: Uuid,
        viewer: Uuid,
    ) -> Result<Visibility, AccessError> {
        let owner = self
            .store
            .content_owner(kind, id)
            .await?
            .ok_or(AccessError::NotFound)?;
        self.require(viewer, owner).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (Uuid, Uuid) {
        (Uuid::new_v4(), Uuid::new_v4())
    }

    #[test]
    fn system_content_always_passes() {
        let (viewer, _) = ids();
        let facts = VisibilityFacts {
            owner_is_private: true,
            viewer_blocks_owner: true,
            ..Default::default()
        };
        assert_eq!(
            decide(viewer, ContentOwner::System, false, &facts),
            Visibility::System
        );
    }

    #[test]
    fn admin_precedes_block() {
        let (viewer, owner) = ids();
        let facts = VisibilityFacts {
            owner_blocks_viewer: true,
            owner_is_private: true,
            ..Default::default()
        };
        assert_eq!(
            decide(viewer, ContentOwner::User(owner), true, &facts),
            Visibility::Admin
        );
        assert_eq!(
            decide(viewer, ContentOwner::User(owner), false, &facts),
            Visibility::Blocked
        );
    }

    #[test]
    fn owner_sees_own_private_content() {
        let (viewer, _) = ids();
        let facts = VisibilityFacts {
            owner_is_private: true,
            ..Default::default()
        };
        assert_eq!(
            decide(viewer, ContentOwner::User(viewer), false, &facts),
            Visibility::Owner
        );
    }

    #[test]
    fn block_beats_accepted_follow() {
        let (viewer, owner) = ids();
        let facts = VisibilityFacts {
            viewer_blocks_owner: true,
            follow_status: Some(FollowStatus::Accepted),
            ..Default::default()
        };
        assert_eq!(
            decide(viewer, ContentOwner::User(owner), false, &facts),
            Visibility::Blocked
        );
    }

    #[test]
    fn private_owner_requires_accepted_follow() {
        let (viewer, owner) = ids();
        let mut facts = VisibilityFacts {
            owner_is_private: true,
            ..Default::default()
        };
        assert_eq!(
            decide(viewer, ContentOwner::User(owner), false, &facts),
            Visibility::Private
        );

        facts.follow_status = Some(FollowStatus::Pending);
        assert!(!decide(viewer, ContentOwner::User(owner), false, &facts).is_allowed());

        facts.follow_status = Some(FollowStatus::Accepted);
        assert_eq!(
            decide(viewer, ContentOwner::User(owner), false, &facts),
            Visibility::Follower
        );
    }

    #[test]
    fn admin_grant_disables_ghost_filter() {
        let viewer = Uuid::new_v4();
        assert_eq!(Visibility::Admin.ghost_viewer(viewer), None);
        assert_eq!(Visibility::Public.ghost_viewer(viewer), Some(viewer));
    }
}
