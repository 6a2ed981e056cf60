//! Storage for films, users and their relations.
//!
//! Two backends implement the repository traits in [`traits`]:
//! [`memory::MemoryStore`] (process-local, for tests and development) and the
//! [`sqlite`] repositories. Both must behave identically; the shared
//! scenarios in `contract_tests` run against each of them.

pub mod memory;
pub mod sqlite;
pub mod traits;

#[cfg(test)]
mod contract_tests;

pub use memory::MemoryStore;
pub use traits::{FilmRepository, GenreRepository, MpaRepository, UserRepository};

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(String),
    /// A by-id operation or a relation named an entity that does not exist.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("user {0} cannot be their own friend")]
    SelfFriendship(i64),
}

impl PersistenceError {
    pub(crate) fn film_not_found(id: crate::model::FilmId) -> Self {
        Self::NotFound {
            entity: "film",
            id: id.0,
        }
    }

    pub(crate) fn user_not_found(id: crate::model::UserId) -> Self {
        Self::NotFound {
            entity: "user",
            id: id.0,
        }
    }

    pub(crate) fn genre_not_found(id: crate::model::GenreId) -> Self {
        Self::NotFound {
            entity: "genre",
            id: i64::from(id.0),
        }
    }

    pub(crate) fn mpa_not_found(id: crate::model::MpaId) -> Self {
        Self::NotFound {
            entity: "mpa rating",
            id: i64::from(id.0),
        }
    }
}
