use thiserror::Error;

/// Outcome kinds of every access-layer operation.
///
/// `NotFound` covers both absence and denied visibility so callers cannot
/// probe across a block or privacy boundary.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("not found")]
    NotFound,

    #[error("referenced record does not exist: {0}")]
    Reference(String),

    #[error("blocked")]
    Blocked,

    #[error("interaction not allowed")]
    InteractionNotAllowed,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

const FOREIGN_KEY_VIOLATION: &str = "23503";

impl From<sqlx::Error> for AccessError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) {
                return Self::Reference(db_err.message().to_string());
            }
        }
        Self::Internal(err.into())
    }
}

impl AccessError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}
