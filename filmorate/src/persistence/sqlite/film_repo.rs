//! SQLite-backed repository for films, their genres and likes.

use std::collections::BTreeSet;
use std::num::NonZeroU32;

use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};

use super::helpers::{begin_write, require_film, require_genre, require_mpa, require_user};
use crate::model::{Film, FilmId, Genre, GenreId, Mpa, MpaId, UserId};
use crate::persistence::traits::FilmRepository;
use crate::persistence::PersistenceError;

/// Row type for film queries, mapped via `sqlx::FromRow`.
#[derive(sqlx::FromRow)]
struct FilmRow {
    id: i64,
    name: String,
    description: String,
    release_date: NaiveDate,
    duration: i32,
    mpa_id: Option<i32>,
    mpa_name: Option<String>,
}

impl FilmRow {
    fn into_film(self, genres: Vec<Genre>, likes: BTreeSet<UserId>) -> Film {
        let mpa = match (self.mpa_id, self.mpa_name) {
            (Some(id), Some(name)) => Some(Mpa { id: MpaId(id), name }),
            _ => None,
        };
        Film {
            id: Some(FilmId(self.id)),
            name: self.name,
            description: self.description,
            release_date: self.release_date,
            duration: self.duration,
            mpa,
            genres,
            likes,
        }
    }
}

/// SQLite implementation of [`FilmRepository`].
pub struct SqliteFilmRepository {
    pool: SqlitePool,
}

impl SqliteFilmRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl FilmRepository for SqliteFilmRepository {
    async fn list_films(&self) -> Result<Vec<Film>, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        let rows: Vec<FilmRow> = sqlx::query_as(
            r#"
            SELECT f.id, f.name, f.description, f.release_date, f.duration,
                   f.mpa_id, m.name AS mpa_name
            FROM films f
            LEFT JOIN mpa m ON m.id = f.mpa_id
            ORDER BY f.id
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;

        with_relations(&mut conn, rows).await
    }

    async fn get_film(&self, id: FilmId) -> Result<Option<Film>, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        load_film(&mut conn, id).await
    }

    async fn create_film(&self, film: &Film) -> Result<Film, PersistenceError> {
        let genre_ids = film.genre_ids();
        let mpa_id = film.mpa.as_ref().map(|m| m.id);

        let mut tx = begin_write(&self.pool).await?;

        if let Some(mpa_id) = mpa_id {
            require_mpa(&mut tx, mpa_id).await?;
        }
        for genre_id in &genre_ids {
            require_genre(&mut tx, *genre_id).await?;
        }
        for user_id in &film.likes {
            require_user(&mut tx, *user_id).await?;
        }

        let result = sqlx::query(
            r#"
            INSERT INTO films (name, description, release_date, duration, mpa_id)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&film.name)
        .bind(&film.description)
        .bind(film.release_date)
        .bind(film.duration)
        .bind(mpa_id.map(|m| m.0))
        .execute(&mut *tx)
        .await?;
        let id = FilmId(result.last_insert_rowid());

        insert_genres(&mut tx, id, &genre_ids).await?;
        for user_id in &film.likes {
            sqlx::query("INSERT INTO film_likes (film_id, user_id) VALUES (?, ?)")
                .bind(id.0)
                .bind(user_id.0)
                .execute(&mut *tx)
                .await?;
        }

        let created = load_film(&mut tx, id)
            .await?
            .ok_or(PersistenceError::film_not_found(id))?;
        tx.commit().await?;
        Ok(created)
    }

    async fn update_film(&self, id: FilmId, film: &Film) -> Result<Film, PersistenceError> {
        let genre_ids = film.genre_ids();
        let mpa_id = film.mpa.as_ref().map(|m| m.id);

        let mut tx = begin_write(&self.pool).await?;

        if let Some(mpa_id) = mpa_id {
            require_mpa(&mut tx, mpa_id).await?;
        }
        for genre_id in &genre_ids {
            require_genre(&mut tx, *genre_id).await?;
        }

        let result = sqlx::query(
            r#"
            UPDATE films
            SET name = ?, description = ?, release_date = ?, duration = ?, mpa_id = ?
            WHERE id = ?
            "#,
        )
        .bind(&film.name)
        .bind(&film.description)
        .bind(film.release_date)
        .bind(film.duration)
        .bind(mpa_id.map(|m| m.0))
        .bind(id.0)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(PersistenceError::film_not_found(id));
        }

        // Genres are replaced wholesale; likes are only touched by add/remove_like.
        sqlx::query("DELETE FROM film_genres WHERE film_id = ?")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;
        insert_genres(&mut tx, id, &genre_ids).await?;

        let updated = load_film(&mut tx, id)
            .await?
            .ok_or(PersistenceError::film_not_found(id))?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_film(&self, id: FilmId) -> Result<(), PersistenceError> {
        let mut tx = begin_write(&self.pool).await?;

        sqlx::query("DELETE FROM film_likes WHERE film_id = ?")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM film_genres WHERE film_id = ?")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM films WHERE id = ?")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(PersistenceError::film_not_found(id));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn add_like(&self, film_id: FilmId, user_id: UserId) -> Result<(), PersistenceError> {
        let mut tx = begin_write(&self.pool).await?;
        require_film(&mut tx, film_id).await?;
        require_user(&mut tx, user_id).await?;

        sqlx::query("INSERT OR IGNORE INTO film_likes (film_id, user_id) VALUES (?, ?)")
            .bind(film_id.0)
            .bind(user_id.0)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn remove_like(&self, film_id: FilmId, user_id: UserId) -> Result<(), PersistenceError> {
        let mut tx = begin_write(&self.pool).await?;
        require_film(&mut tx, film_id).await?;
        require_user(&mut tx, user_id).await?;

        sqlx::query("DELETE FROM film_likes WHERE film_id = ? AND user_id = ?")
            .bind(film_id.0)
            .bind(user_id.0)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn has_like(&self, film_id: FilmId, user_id: UserId) -> Result<bool, PersistenceError> {
        let (exists,): (i64,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM film_likes WHERE film_id = ? AND user_id = ?)",
        )
        .bind(film_id.0)
        .bind(user_id.0)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists != 0)
    }

    async fn top_popular_films(&self, limit: NonZeroU32) -> Result<Vec<Film>, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        let rows: Vec<FilmRow> = sqlx::query_as(
            r#"
            SELECT f.id, f.name, f.description, f.release_date, f.duration,
                   f.mpa_id, m.name AS mpa_name
            FROM films f
            LEFT JOIN mpa m ON m.id = f.mpa_id
            LEFT JOIN film_likes l ON l.film_id = f.id
            GROUP BY f.id
            ORDER BY COUNT(l.user_id) DESC, f.id ASC
            LIMIT ?
            "#,
        )
        .bind(i64::from(limit.get()))
        .fetch_all(&mut *conn)
        .await?;

        with_relations(&mut conn, rows).await
    }

    async fn clear_films(&self) -> Result<(), PersistenceError> {
        let mut tx = begin_write(&self.pool).await?;
        for sql in [
            "DELETE FROM film_likes",
            "DELETE FROM film_genres",
            "DELETE FROM films",
        ] {
            sqlx::query(sql).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

/// Load one film with its genres and likes.
async fn load_film(
    conn: &mut SqliteConnection,
    id: FilmId,
) -> Result<Option<Film>, PersistenceError> {
    let row: Option<FilmRow> = sqlx::query_as(
        r#"
        SELECT f.id, f.name, f.description, f.release_date, f.duration,
               f.mpa_id, m.name AS mpa_name
        FROM films f
        LEFT JOIN mpa m ON m.id = f.mpa_id
        WHERE f.id = ?
        "#,
    )
    .bind(id.0)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        None => Ok(None),
        Some(r) => {
            let genres = load_genres(conn, id).await?;
            let likes = load_likes(conn, id).await?;
            Ok(Some(r.into_film(genres, likes)))
        }
    }
}

/// Attach genres and likes to each row, preserving row order.
async fn with_relations(
    conn: &mut SqliteConnection,
    rows: Vec<FilmRow>,
) -> Result<Vec<Film>, PersistenceError> {
    let mut films = Vec::with_capacity(rows.len());
    for row in rows {
        let id = FilmId(row.id);
        let genres = load_genres(conn, id).await?;
        let likes = load_likes(conn, id).await?;
        films.push(row.into_film(genres, likes));
    }
    Ok(films)
}

async fn load_genres(
    conn: &mut SqliteConnection,
    film_id: FilmId,
) -> Result<Vec<Genre>, PersistenceError> {
    let rows: Vec<(i32, String)> = sqlx::query_as(
        r#"
        SELECT g.id, g.name
        FROM genres g
        JOIN film_genres fg ON fg.genre_id = g.id
        WHERE fg.film_id = ?
        ORDER BY g.id
        "#,
    )
    .bind(film_id.0)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, name)| Genre {
            id: GenreId(id),
            name,
        })
        .collect())
}

async fn load_likes(
    conn: &mut SqliteConnection,
    film_id: FilmId,
) -> Result<BTreeSet<UserId>, PersistenceError> {
    let rows: Vec<(i64,)> = sqlx::query_as("SELECT user_id FROM film_likes WHERE film_id = ?")
        .bind(film_id.0)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows.into_iter().map(|(id,)| UserId(id)).collect())
}

async fn insert_genres(
    conn: &mut SqliteConnection,
    film_id: FilmId,
    genre_ids: &BTreeSet<GenreId>,
) -> Result<(), PersistenceError> {
    for genre_id in genre_ids {
        sqlx::query("INSERT INTO film_genres (film_id, genre_id) VALUES (?, ?)")
            .bind(film_id.0)
            .bind(genre_id.0)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}
