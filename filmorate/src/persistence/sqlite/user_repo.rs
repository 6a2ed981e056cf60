//! SQLite-backed repository for users and friendships.
//!
//! A friendship is stored as two rows of `friendships`, one per direction.
//! Both rows are always inserted or deleted inside the same transaction.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};

use super::helpers::{begin_write, require_user};
use crate::model::{User, UserId};
use crate::persistence::traits::UserRepository;
use crate::persistence::PersistenceError;

/// Row type for user queries, mapped via `sqlx::FromRow`.
#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    login: String,
    name: String,
    birthday: NaiveDate,
}

impl UserRow {
    fn into_user(self, friends: BTreeSet<UserId>) -> User {
        User {
            id: Some(UserId(self.id)),
            email: self.email,
            login: self.login,
            name: self.name,
            birthday: self.birthday,
            friends,
        }
    }
}

/// SQLite implementation of [`UserRepository`].
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl UserRepository for SqliteUserRepository {
    async fn list_users(&self) -> Result<Vec<User>, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        let rows: Vec<UserRow> =
            sqlx::query_as("SELECT id, email, login, name, birthday FROM users ORDER BY id")
                .fetch_all(&mut *conn)
                .await?;
        with_friends(&mut conn, rows).await
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        load_user(&mut conn, id).await
    }

    async fn create_user(&self, user: &User) -> Result<User, PersistenceError> {
        let mut tx = begin_write(&self.pool).await?;

        for friend_id in &user.friends {
            require_user(&mut tx, *friend_id).await?;
        }

        let result = sqlx::query(
            "INSERT INTO users (email, login, name, birthday) VALUES (?, ?, ?, ?)",
        )
        .bind(&user.email)
        .bind(&user.login)
        .bind(&user.name)
        .bind(user.birthday)
        .execute(&mut *tx)
        .await?;
        let id = UserId(result.last_insert_rowid());

        for friend_id in &user.friends {
            link_friends(&mut tx, id, *friend_id).await?;
        }

        let created = load_user(&mut tx, id)
            .await?
            .ok_or(PersistenceError::user_not_found(id))?;
        tx.commit().await?;
        Ok(created)
    }

    async fn update_user(&self, id: UserId, user: &User) -> Result<User, PersistenceError> {
        let mut tx = begin_write(&self.pool).await?;

        let result = sqlx::query(
            "UPDATE users SET email = ?, login = ?, name = ?, birthday = ? WHERE id = ?",
        )
        .bind(&user.email)
        .bind(&user.login)
        .bind(&user.name)
        .bind(user.birthday)
        .bind(id.0)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(PersistenceError::user_not_found(id));
        }

        let updated = load_user(&mut tx, id)
            .await?
            .ok_or(PersistenceError::user_not_found(id))?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_user(&self, id: UserId) -> Result<(), PersistenceError> {
        let mut tx = begin_write(&self.pool).await?;

        sqlx::query("DELETE FROM film_likes WHERE user_id = ?")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM friendships WHERE user_id = ? OR friend_id = ?")
            .bind(id.0)
            .bind(id.0)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(PersistenceError::user_not_found(id));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn add_friend(&self, user_id: UserId, friend_id: UserId) -> Result<(), PersistenceError> {
        if user_id == friend_id {
            return Err(PersistenceError::SelfFriendship(user_id.0));
        }

        let mut tx = begin_write(&self.pool).await?;
        require_user(&mut tx, user_id).await?;
        require_user(&mut tx, friend_id).await?;
        link_friends(&mut tx, user_id, friend_id).await?;
        tx.commit().await?;

        Ok(())
    }

    async fn remove_friend(
        &self,
        user_id: UserId,
        friend_id: UserId,
    ) -> Result<(), PersistenceError> {
        if user_id == friend_id {
            return Err(PersistenceError::SelfFriendship(user_id.0));
        }

        let mut tx = begin_write(&self.pool).await?;
        require_user(&mut tx, user_id).await?;
        require_user(&mut tx, friend_id).await?;
        sqlx::query(
            r#"
            DELETE FROM friendships
            WHERE (user_id = ? AND friend_id = ?) OR (user_id = ? AND friend_id = ?)
            "#,
        )
        .bind(user_id.0)
        .bind(friend_id.0)
        .bind(friend_id.0)
        .bind(user_id.0)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(())
    }

    async fn are_friends(
        &self,
        user_id: UserId,
        friend_id: UserId,
    ) -> Result<bool, PersistenceError> {
        let (exists,): (i64,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM friendships WHERE user_id = ? AND friend_id = ?)",
        )
        .bind(user_id.0)
        .bind(friend_id.0)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists != 0)
    }

    async fn friends_of(&self, id: UserId) -> Result<Vec<User>, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        require_user(&mut conn, id).await?;

        let rows: Vec<UserRow> = sqlx::query_as(
            r#"
            SELECT u.id, u.email, u.login, u.name, u.birthday
            FROM users u
            JOIN friendships f ON f.friend_id = u.id
            WHERE f.user_id = ?
            ORDER BY u.id
            "#,
        )
        .bind(id.0)
        .fetch_all(&mut *conn)
        .await?;

        with_friends(&mut conn, rows).await
    }

    async fn common_friends(
        &self,
        id: UserId,
        other_id: UserId,
    ) -> Result<Vec<User>, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        require_user(&mut conn, id).await?;
        require_user(&mut conn, other_id).await?;

        let rows: Vec<UserRow> = sqlx::query_as(
            r#"
            SELECT u.id, u.email, u.login, u.name, u.birthday
            FROM users u
            WHERE u.id IN (SELECT friend_id FROM friendships WHERE user_id = ?)
              AND u.id IN (SELECT friend_id FROM friendships WHERE user_id = ?)
            ORDER BY u.id
            "#,
        )
        .bind(id.0)
        .bind(other_id.0)
        .fetch_all(&mut *conn)
        .await?;

        with_friends(&mut conn, rows).await
    }

    async fn clear_users(&self) -> Result<(), PersistenceError> {
        let mut tx = begin_write(&self.pool).await?;
        for sql in [
            "DELETE FROM film_likes",
            "DELETE FROM friendships",
            "DELETE FROM users",
        ] {
            sqlx::query(sql).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

/// Insert both directions of a friendship. Existing rows are kept.
async fn link_friends(
    conn: &mut SqliteConnection,
    user_id: UserId,
    friend_id: UserId,
) -> Result<(), PersistenceError> {
    sqlx::query(
        "INSERT OR IGNORE INTO friendships (user_id, friend_id) VALUES (?, ?), (?, ?)",
    )
    .bind(user_id.0)
    .bind(friend_id.0)
    .bind(friend_id.0)
    .bind(user_id.0)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn load_user(
    conn: &mut SqliteConnection,
    id: UserId,
) -> Result<Option<User>, PersistenceError> {
    let row: Option<UserRow> =
        sqlx::query_as("SELECT id, email, login, name, birthday FROM users WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&mut *conn)
            .await?;

    match row {
        None => Ok(None),
        Some(r) => {
            let friends = load_friend_ids(conn, id).await?;
            Ok(Some(r.into_user(friends)))
        }
    }
}

async fn with_friends(
    conn: &mut SqliteConnection,
    rows: Vec<UserRow>,
) -> Result<Vec<User>, PersistenceError> {
    let mut users = Vec::with_capacity(rows.len());
    for row in rows {
        let friends = load_friend_ids(conn, UserId(row.id)).await?;
        users.push(row.into_user(friends));
    }
    Ok(users)
}

async fn load_friend_ids(
    conn: &mut SqliteConnection,
    id: UserId,
) -> Result<BTreeSet<UserId>, PersistenceError> {
    let rows: Vec<(i64,)> = sqlx::query_as("SELECT friend_id FROM friendships WHERE user_id = ?")
        .bind(id.0)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows.into_iter().map(|(id,)| UserId(id)).collect())
}
