//! SQLite-backed read-only catalogs: genres and MPA ratings.

use sqlx::SqlitePool;

use crate::model::{Genre, GenreId, Mpa, MpaId};
use crate::persistence::traits::{GenreRepository, MpaRepository};
use crate::persistence::PersistenceError;

pub struct SqliteGenreRepository {
    pool: SqlitePool,
}

impl SqliteGenreRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl GenreRepository for SqliteGenreRepository {
    async fn list_genres(&self) -> Result<Vec<Genre>, PersistenceError> {
        let rows: Vec<(i32, String)> = sqlx::query_as("SELECT id, name FROM genres ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(id, name)| Genre {
                id: GenreId(id),
                name,
            })
            .collect())
    }

    async fn get_genre(&self, id: GenreId) -> Result<Option<Genre>, PersistenceError> {
        let row: Option<(i32, String)> = sqlx::query_as("SELECT id, name FROM genres WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(id, name)| Genre {
            id: GenreId(id),
            name,
        }))
    }
}

pub struct SqliteMpaRepository {
    pool: SqlitePool,
}

impl SqliteMpaRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl MpaRepository for SqliteMpaRepository {
    async fn list_mpa(&self) -> Result<Vec<Mpa>, PersistenceError> {
        let rows: Vec<(i32, String)> = sqlx::query_as("SELECT id, name FROM mpa ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(id, name)| Mpa { id: MpaId(id), name })
            .collect())
    }

    async fn get_mpa(&self, id: MpaId) -> Result<Option<Mpa>, PersistenceError> {
        let row: Option<(i32, String)> = sqlx::query_as("SELECT id, name FROM mpa WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(id, name)| Mpa { id: MpaId(id), name }))
    }
}
