//! Film catalog operations: CRUD, likes and the popularity ranking.

use std::sync::Arc;

use super::validation::{require_positive_id, top_count, validate_film};
use crate::error::{CatalogError, CatalogResult};
use crate::model::{Film, FilmId, UserId};
use crate::persistence::{FilmRepository, GenreRepository, MpaRepository, UserRepository};

pub struct FilmService<F, U, G, M> {
    films: Arc<F>,
    users: Arc<U>,
    genres: Arc<G>,
    ratings: Arc<M>,
}

impl<F, U, G, M> FilmService<F, U, G, M>
where
    F: FilmRepository,
    U: UserRepository,
    G: GenreRepository,
    M: MpaRepository,
{
    pub fn new(films: Arc<F>, users: Arc<U>, genres: Arc<G>, ratings: Arc<M>) -> Self {
        Self {
            films,
            users,
            genres,
            ratings,
        }
    }

    pub async fn list_films(&self) -> CatalogResult<Vec<Film>> {
        Ok(self.films.list_films().await?)
    }

    pub async fn get_film(&self, id: FilmId) -> CatalogResult<Film> {
        self.require_film(id)
            .await
            .inspect_err(|e| tracing::debug!(film_id = %id, error = %e, "get_film rejected"))
    }

    pub async fn create_film(&self, film: Film) -> CatalogResult<Film> {
        self.try_create(film)
            .await
            .inspect(|created| {
                tracing::info!(film_id = ?created.id, name = %created.name, "film created")
            })
            .inspect_err(|e| tracing::debug!(error = %e, "create_film rejected"))
    }

    /// Replace a film's scalar fields, rating and genres. Likes carried by
    /// `film` are ignored; use [`Self::add_like`] and [`Self::remove_like`].
    pub async fn update_film(&self, film: Film) -> CatalogResult<Film> {
        let requested = film.id;
        self.try_update(film)
            .await
            .inspect(|updated| tracing::info!(film_id = ?updated.id, "film updated"))
            .inspect_err(|e| {
                tracing::debug!(film_id = ?requested, error = %e, "update_film rejected")
            })
    }

    pub async fn delete_film(&self, id: FilmId) -> CatalogResult<()> {
        self.require_film(id).await?;
        self.films.delete_film(id).await?;
        tracing::info!(film_id = %id, "film deleted");
        Ok(())
    }

    /// Record a like and return the film as it is afterwards.
    pub async fn add_like(&self, film_id: FilmId, user_id: UserId) -> CatalogResult<Film> {
        self.require_film(film_id).await?;
        self.require_user(user_id).await?;
        self.films.add_like(film_id, user_id).await?;
        tracing::info!(film_id = %film_id, user_id = %user_id, "like added");
        self.require_film(film_id).await
    }

    /// Drop a like and return the film as it is afterwards. Removing a like
    /// that does not exist succeeds.
    pub async fn remove_like(&self, film_id: FilmId, user_id: UserId) -> CatalogResult<Film> {
        self.require_film(film_id).await?;
        self.require_user(user_id).await?;
        self.films.remove_like(film_id, user_id).await?;
        tracing::info!(film_id = %film_id, user_id = %user_id, "like removed");
        self.require_film(film_id).await
    }

    /// Most liked films first. `None` asks for the default count of 10.
    pub async fn top_films(&self, count: Option<i64>) -> CatalogResult<Vec<Film>> {
        let limit = top_count(count)
            .inspect_err(|e| tracing::debug!(?count, error = %e, "top_films rejected"))?;
        Ok(self.films.top_popular_films(limit).await?)
    }

    async fn try_create(&self, film: Film) -> CatalogResult<Film> {
        if let Some(id) = film.id {
            return Err(CatalogError::validation(format!(
                "a new film must not carry an id, got {id}"
            )));
        }
        validate_film(&film)?;
        self.check_references(&film).await?;
        Ok(self.films.create_film(&film).await?)
    }

    async fn try_update(&self, film: Film) -> CatalogResult<Film> {
        let id = film
            .id
            .ok_or_else(|| CatalogError::validation("film id must be provided for update"))?;
        require_positive_id("film", id.0)?;
        validate_film(&film)?;
        self.require_film(id).await?;
        self.check_references(&film).await?;
        Ok(self.films.update_film(id, &film).await?)
    }

    async fn require_film(&self, id: FilmId) -> CatalogResult<Film> {
        require_positive_id("film", id.0)?;
        self.films
            .get_film(id)
            .await?
            .ok_or(CatalogError::NotFound {
                entity: "film",
                id: id.0,
            })
    }

    async fn require_user(&self, id: UserId) -> CatalogResult<()> {
        require_positive_id("user", id.0)?;
        match self.users.get_user(id).await? {
            Some(_) => Ok(()),
            None => Err(CatalogError::NotFound {
                entity: "user",
                id: id.0,
            }),
        }
    }

    /// The rating and genres named by `film` must exist. Likers are checked by storage.
    async fn check_references(&self, film: &Film) -> CatalogResult<()> {
        if let Some(mpa) = &film.mpa {
            require_positive_id("mpa rating", i64::from(mpa.id.0))?;
            if self.ratings.get_mpa(mpa.id).await?.is_none() {
                return Err(CatalogError::NotFound {
                    entity: "mpa rating",
                    id: i64::from(mpa.id.0),
                });
            }
        }
        for genre_id in film.genre_ids() {
            require_positive_id("genre", i64::from(genre_id.0))?;
            if self.genres.get_genre(genre_id).await?.is_none() {
                return Err(CatalogError::NotFound {
                    entity: "genre",
                    id: i64::from(genre_id.0),
                });
            }
        }
        Ok(())
    }
}
