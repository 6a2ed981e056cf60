//! Existence probes shared by the SQLite repositories.
//!
//! Each `require_*` runs on the caller's connection (usually an open
//! transaction) and turns a missing row into [`PersistenceError::NotFound`],
//! so referential failures surface the same way they do in the memory backend
//! instead of as foreign-key violations.

use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};

use crate::model::{FilmId, GenreId, MpaId, UserId};
use crate::persistence::PersistenceError;

/// Start a transaction that takes the write lock up front.
///
/// Writers read before they write. In WAL mode a deferred transaction fails
/// with `SQLITE_BUSY` when it tries to upgrade, while `BEGIN IMMEDIATE`
/// waits on the busy timeout.
pub async fn begin_write(
    pool: &SqlitePool,
) -> Result<Transaction<'static, Sqlite>, PersistenceError> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

async fn row_exists(
    conn: &mut SqliteConnection,
    sql: &'static str,
    id: i64,
) -> Result<bool, PersistenceError> {
    let (exists,): (i64,) = sqlx::query_as(sql).bind(id).fetch_one(&mut *conn).await?;
    Ok(exists != 0)
}

pub async fn require_film(conn: &mut SqliteConnection, id: FilmId) -> Result<(), PersistenceError> {
    if row_exists(conn, "SELECT EXISTS(SELECT 1 FROM films WHERE id = ?)", id.0).await? {
        Ok(())
    } else {
        Err(PersistenceError::film_not_found(id))
    }
}

pub async fn require_user(conn: &mut SqliteConnection, id: UserId) -> Result<(), PersistenceError> {
    if row_exists(conn, "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)", id.0).await? {
        Ok(())
    } else {
        Err(PersistenceError::user_not_found(id))
    }
}

pub async fn require_genre(
    conn: &mut SqliteConnection,
    id: GenreId,
) -> Result<(), PersistenceError> {
    let found = row_exists(
        conn,
        "SELECT EXISTS(SELECT 1 FROM genres WHERE id = ?)",
        i64::from(id.0),
    )
    .await?;
    if found {
        Ok(())
    } else {
        Err(PersistenceError::genre_not_found(id))
    }
}

pub async fn require_mpa(conn: &mut SqliteConnection, id: MpaId) -> Result<(), PersistenceError> {
    let found = row_exists(
        conn,
        "SELECT EXISTS(SELECT 1 FROM mpa WHERE id = ?)",
        i64::from(id.0),
    )
    .await?;
    if found {
        Ok(())
    } else {
        Err(PersistenceError::mpa_not_found(id))
    }
}
