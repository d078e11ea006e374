use uuid::Uuid;

use crate::app::error::AccessError;
use crate::app::social::RelationshipMutator;
use crate::domain::content::ContentKind;
use crate::domain::engagement::{Comment, Like, LikerDetail};

impl RelationshipMutator {
    /// Guarded idempotent like.
    ///
    /// A rejected guard and an existing row both leave the insert empty; the
    /// follow-up read only classifies that outcome.
    pub async fn like(&self, actor: Uuid, workout: Uuid) -> Result<Like, AccessError> {
        if let Some(like) = self.store.insert_like(actor, workout).await? {
            tracing::debug!(user_id = %actor, workout_id = %workout, "like created");
            return Ok(like);
        }

        match self.store.find_like(actor, workout).await? {
            Some(existing) => Ok(existing),
            None => Err(AccessError::InteractionNotAllowed),
        }
    }

    pub async fn unlike(&self, actor: Uuid, workout: Uuid) -> Result<(), AccessError> {
        if self.store.delete_like(actor, workout).await? {
            Ok(())
        } else {
            Err(AccessError::NotFound)
        }
    }

    /// `NotFound` when the workout is missing or hidden from `actor`, even if
    /// a like row from before a block or privacy change remains.
    pub async fn is_liked(&self, actor: Uuid, workout: Uuid) -> Result<bool, AccessError> {
        self.visibility
            .require_content(ContentKind::Workout, workout, actor)
            .await?;
        Ok(self.store.find_like(actor, workout).await?.is_some())
    }

    /// Likers of a visible workout, minus anyone on either side of a block
    /// with the viewer.
    pub async fn list_likers(
        &self,
        workout: Uuid,
        viewer: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LikerDetail>, AccessError> {
        let visibility = self
            .visibility
            .require_content(ContentKind::Workout, workout, viewer)
            .await?;
        self.store
            .list_likes(workout, visibility.ghost_viewer(viewer), limit, offset)
            .await
    }

    pub async fn add_comment(
        &self,
        actor: Uuid,
        workout: Uuid,
        body: &str,
    ) -> Result<Comment, AccessError> {
        let comment = self
            .store
            .insert_comment(actor, workout, body)
            .await?
            .ok_or(AccessError::InteractionNotAllowed)?;
        tracing::debug!(
            user_id = %actor,
            workout_id = %workout,
            comment_id = %comment.id,
            "comment created"
        );
        Ok(comment)
    }

    pub async fn delete_comment(
        &self,
        actor: Uuid,
        workout: Uuid,
        comment: Uuid,
    ) -> Result<(), AccessError> {
        if self.store.delete_comment(comment, workout, actor).await? {
            Ok(())
        } else {
            Err(AccessError::NotFound)
        }
    }

    pub async fn list_comments(
        &self,
        workout: Uuid,
        viewer: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Comment>, AccessError> {
        let visibility = self
            .visibility
            .require_content(ContentKind::Workout, workout, viewer)
            .await?;
        self.store
            .list_comments(workout, visibility.ghost_viewer(viewer), limit, offset)
            .await
    }
}
