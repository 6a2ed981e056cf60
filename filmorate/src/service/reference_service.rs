//! Read-only lookups in the genre and MPA rating catalogs.

use std::sync::Arc;

use super::validation::require_positive_id;
use crate::error::{CatalogError, CatalogResult};
use crate::model::{Genre, GenreId, Mpa, MpaId};
use crate::persistence::{GenreRepository, MpaRepository};

pub struct ReferenceService<G, M> {
    genres: Arc<G>,
    ratings: Arc<M>,
}

impl<G: GenreRepository, M: MpaRepository> ReferenceService<G, M> {
    pub fn new(genres: Arc<G>, ratings: Arc<M>) -> Self {
        Self { genres, ratings }
    }

    pub async fn list_genres(&self) -> CatalogResult<Vec<Genre>> {
        Ok(self.genres.list_genres().await?)
    }

    pub async fn get_genre(&self, id: GenreId) -> CatalogResult<Genre> {
        require_positive_id("genre", i64::from(id.0))?;
        self.genres
            .get_genre(id)
            .await?
            .ok_or(CatalogError::NotFound {
                entity: "genre",
                id: i64::from(id.0),
            })
    }

    pub async fn list_mpa(&self) -> CatalogResult<Vec<Mpa>> {
        Ok(self.ratings.list_mpa().await?)
    }

    pub async fn get_mpa(&self, id: MpaId) -> CatalogResult<Mpa> {
        require_positive_id("mpa rating", i64::from(id.0))?;
        self.ratings
            .get_mpa(id)
            .await?
            .ok_or(CatalogError::NotFound {
                entity: "mpa rating",
                id: i64::from(id.0),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{genre_catalog, mpa_catalog};
    use crate::persistence::MemoryStore;

    fn service() -> ReferenceService<MemoryStore, MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        ReferenceService::new(store.clone(), store)
    }

    #[tokio::test]
    async fn test_lists_full_catalogs() {
        let service = service();
        assert_eq!(service.list_genres().await.unwrap(), genre_catalog());
        assert_eq!(service.list_mpa().await.unwrap(), mpa_catalog());
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found() {
        let service = service();
        assert_eq!(service.get_genre(GenreId(6)).await.unwrap().name, "Action");
        assert!(matches!(
            service.get_genre(GenreId(7)).await,
            Err(CatalogError::NotFound { entity: "genre", id: 7 })
        ));
        assert_eq!(service.get_mpa(MpaId(5)).await.unwrap().name, "NC-17");
        assert!(matches!(
            service.get_mpa(MpaId(6)).await,
            Err(CatalogError::NotFound { entity: "mpa rating", id: 6 })
        ));
    }

    #[tokio::test]
    async fn test_non_positive_ids_are_invalid() {
        let service = service();
        assert!(matches!(
            service.get_genre(GenreId(0)).await,
            Err(CatalogError::Validation(_))
        ));
        assert!(matches!(
            service.get_mpa(MpaId(-2)).await,
            Err(CatalogError::Validation(_))
        ));
    }
}
