use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workout {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub notes: Option<String>,
    pub like_count: i64,
    pub comment_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Content types whose privacy is inherited from the owning account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Workout,
    Routine,
    Exercise,
    Device,
    Subscription,
}

impl ContentKind {
    pub fn table(&self) -> &'static str {
        match self {
            Self::Workout => "workouts",
            Self::Routine => "routines",
            Self::Exercise => "exercises",
            Self::Device => "devices",
            Self::Subscription => "subscriptions",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentOwner {
    /// System-provided content, visible to everyone.
    System,
    User(Uuid),
}

impl ContentOwner {
    pub fn from_db(owner_id: Option<Uuid>) -> Self {
        match owner_id {
            Some(id) => Self::User(id),
            None => Self::System,
        }
    }
}
