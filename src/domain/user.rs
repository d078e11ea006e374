use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// An account as the access layer sees it. Admin capability is looked up
/// separately and never carried here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub handle: String,
    pub display_name: String,
    pub is_private: bool,
    pub followers_count: i64,
    pub following_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
