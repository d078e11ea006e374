use std::sync::Arc;

use uuid::Uuid;

use crate::app::error::AccessError;
use crate::app::visibility::{Visibility, VisibilityEvaluator};
use crate::domain::content::{ContentKind, ContentOwner, Workout};
use crate::infra::store::GraphStore;

/// Per-resource reads that must pass the visibility check before any row
/// is returned. Denied and missing rows are indistinguishable.
#[derive(Clone)]
pub struct ContentAccessor {
    store: Arc<dyn GraphStore>,
    visibility: VisibilityEvaluator,
}

impl ContentAccessor {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        let visibility = VisibilityEvaluator::new(store.clone());
        Self { store, visibility }
    }

    pub async fn get_workout(&self, id: Uuid, viewer: Uuid) -> Result<Workout, AccessError> {
        let workout = self.store.workout(id).await?.ok_or(AccessError::NotFound)?;
        self.visibility
            .require(viewer, ContentOwner::User(workout.owner_id))
            .await?;
        Ok(workout)
    }

    pub async fn authorize_read(
        &self,
        kind: ContentKind,
        id: Uuid,
        viewer: Uuid,
    ) -> Result<Visibility, AccessError> {
        self.visibility.require_content(kind, id, viewer).await
    }
}
