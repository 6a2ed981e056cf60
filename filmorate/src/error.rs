//! Error kinds surfaced by the catalog services.

use crate::persistence::PersistenceError;
use thiserror::Error;

pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Error, Debug)]
pub enum CatalogError {
    /// Malformed or out-of-range input. Nothing was mutated.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Well-formed input naming a relation that cannot exist, e.g. a user befriending themselves.
    #[error("Invalid relation: {0}")]
    InvalidRelation(String),

    #[error("Storage failure: {0}")]
    Storage(PersistenceError),
}

impl CatalogError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn invalid_relation(message: impl Into<String>) -> Self {
        Self::InvalidRelation(message.into())
    }

    /// Only storage failures may succeed when retried unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

impl From<PersistenceError> for CatalogError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound { entity, id } => Self::NotFound { entity, id },
            PersistenceError::SelfFriendship(id) => {
                Self::InvalidRelation(format!("user {id} cannot be their own friend"))
            }
            other => Self::Storage(other),
        }
    }
}
