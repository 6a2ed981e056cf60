//! Async repository trait definitions for the persistence layer.
//!
//! Each trait abstracts over one aggregate, allowing the in-memory and SQLite
//! backends to be used interchangeably via static dispatch (generic service
//! types).
//!
//! Methods return `impl Future + Send` rather than using `async fn` so that
//! the futures are guaranteed `Send` and can be driven from `tokio::spawn`.
//!
//! Lookups return `Ok(None)` for a missing id. Every other by-id operation on
//! a missing entity fails with [`PersistenceError::NotFound`].

use super::PersistenceError;
use crate::model::{Film, FilmId, Genre, GenreId, Mpa, MpaId, User, UserId};
use std::future::Future;
use std::num::NonZeroU32;

/// Repository for films and the like relation.
///
/// Implementations must keep likes consistent with both entity sets: a like
/// never references a missing film or user.
pub trait FilmRepository: Send + Sync {
    /// All films in id order.
    fn list_films(&self) -> impl Future<Output = Result<Vec<Film>, PersistenceError>> + Send;
    fn get_film(
        &self,
        id: FilmId,
    ) -> impl Future<Output = Result<Option<Film>, PersistenceError>> + Send;
    /// Insert a film under the next film id, together with its genres and any
    /// likes it already carries. `film.id` is ignored.
    fn create_film(&self, film: &Film)
        -> impl Future<Output = Result<Film, PersistenceError>> + Send;
    /// Replace scalar fields, rating and genres of film `id`. Likes are left untouched.
    fn update_film(
        &self,
        id: FilmId,
        film: &Film,
    ) -> impl Future<Output = Result<Film, PersistenceError>> + Send;
    /// Delete a film along with its likes and genre links.
    fn delete_film(&self, id: FilmId) -> impl Future<Output = Result<(), PersistenceError>> + Send;
    /// Record that `user_id` likes `film_id`. Liking twice is a no-op.
    fn add_like(
        &self,
        film_id: FilmId,
        user_id: UserId,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
    /// Drop a like. Removing an absent like is a no-op.
    fn remove_like(
        &self,
        film_id: FilmId,
        user_id: UserId,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
    fn has_like(
        &self,
        film_id: FilmId,
        user_id: UserId,
    ) -> impl Future<Output = Result<bool, PersistenceError>> + Send;
    /// Films by descending like count, ties in id order.
    fn top_popular_films(
        &self,
        limit: NonZeroU32,
    ) -> impl Future<Output = Result<Vec<Film>, PersistenceError>> + Send;
    /// Delete every film and every like.
    fn clear_films(&self) -> impl Future<Output = Result<(), PersistenceError>> + Send;
}

/// Repository for users and the friendship relation.
///
/// Friendship is symmetric: implementations write and remove both directions
/// as one atomic unit, so a half-applied edge is never observable.
pub trait UserRepository: Send + Sync {
    /// All users in id order.
    fn list_users(&self) -> impl Future<Output = Result<Vec<User>, PersistenceError>> + Send;
    fn get_user(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<Option<User>, PersistenceError>> + Send;
    /// Insert a user under the next user id. Friends it already carries are
    /// linked in both directions. `user.id` is ignored.
    fn create_user(&self, user: &User)
        -> impl Future<Output = Result<User, PersistenceError>> + Send;
    /// Replace scalar fields of user `id`. Friendships are left untouched.
    fn update_user(
        &self,
        id: UserId,
        user: &User,
    ) -> impl Future<Output = Result<User, PersistenceError>> + Send;
    /// Delete a user along with their friendships and likes.
    fn delete_user(&self, id: UserId) -> impl Future<Output = Result<(), PersistenceError>> + Send;
    fn add_friend(
        &self,
        user_id: UserId,
        friend_id: UserId,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
    fn remove_friend(
        &self,
        user_id: UserId,
        friend_id: UserId,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
    fn are_friends(
        &self,
        user_id: UserId,
        friend_id: UserId,
    ) -> impl Future<Output = Result<bool, PersistenceError>> + Send;
    /// Friends of `id` in id order.
    fn friends_of(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<Vec<User>, PersistenceError>> + Send;
    /// Users who are friends of both `id` and `other_id`, in id order.
    fn common_friends(
        &self,
        id: UserId,
        other_id: UserId,
    ) -> impl Future<Output = Result<Vec<User>, PersistenceError>> + Send;
    /// Delete every user, every friendship and every like.
    fn clear_users(&self) -> impl Future<Output = Result<(), PersistenceError>> + Send;
}

/// Read-only genre catalog.
pub trait GenreRepository: Send + Sync {
    fn list_genres(&self) -> impl Future<Output = Result<Vec<Genre>, PersistenceError>> + Send;
    fn get_genre(
        &self,
        id: GenreId,
    ) -> impl Future<Output = Result<Option<Genre>, PersistenceError>> + Send;
}

/// Read-only MPA rating catalog.
pub trait MpaRepository: Send + Sync {
    fn list_mpa(&self) -> impl Future<Output = Result<Vec<Mpa>, PersistenceError>> + Send;
    fn get_mpa(
        &self,
        id: MpaId,
    ) -> impl Future<Output = Result<Option<Mpa>, PersistenceError>> + Send;
}
