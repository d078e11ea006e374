use std::sync::Arc;

use uuid::Uuid;

use crate::app::error::AccessError;
use crate::domain::user::Actor;
use crate::infra::store::GraphStore;

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn GraphStore>,
}

impl AccountService {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    pub async fn get_actor(&self, id: Uuid) -> Result<Actor, AccessError> {
        self.store.actor(id).await?.ok_or(AccessError::NotFound)
    }

    /// Going public accepts every outstanding follow request; going private
    /// leaves accepted followers in place.
    pub async fn set_privacy(&self, id: Uuid, private: bool) -> Result<Actor, AccessError> {
        let (actor, accepted) = self
            .store
            .set_private(id, private)
            .await?
            .ok_or(AccessError::NotFound)?;
        tracing::info!(
            user_id = %id,
            private,
            accepted_requests = accepted,
            "account privacy updated"
        );
        Ok(actor)
    }
}
