//! Process-local backend.
//!
//! All entities live in one [`State`] behind a single `RwLock`. Every mutating
//! call holds the write guard from its first check to its last write, which
//! gives the same all-or-nothing behaviour the SQLite backend gets from
//! transactions.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::num::NonZeroU32;

use tokio::sync::RwLock;

use super::traits::{FilmRepository, GenreRepository, MpaRepository, UserRepository};
use super::PersistenceError;
use crate::model::{
    genre_catalog, mpa_catalog, Film, FilmId, Genre, GenreId, Mpa, MpaId, User, UserId,
};

#[derive(Default)]
struct State {
    films: BTreeMap<FilmId, Film>,
    users: BTreeMap<UserId, User>,
    last_film_id: i64,
    last_user_id: i64,
}

impl State {
    fn user_exists(&self, id: UserId) -> Result<(), PersistenceError> {
        if self.users.contains_key(&id) {
            Ok(())
        } else {
            Err(PersistenceError::user_not_found(id))
        }
    }

    fn film_mut(&mut self, id: FilmId) -> Result<&mut Film, PersistenceError> {
        self.films
            .get_mut(&id)
            .ok_or(PersistenceError::film_not_found(id))
    }

    fn users_by_id(&self, ids: impl IntoIterator<Item = UserId>) -> Vec<User> {
        ids.into_iter()
            .filter_map(|id| self.users.get(&id).cloned())
            .collect()
    }
}

/// In-memory implementation of every repository trait.
pub struct MemoryStore {
    state: RwLock<State>,
    genres: Vec<Genre>,
    ratings: Vec<Mpa>,
}

impl MemoryStore {
    /// An empty store seeded with the genre and rating catalogs.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
            genres: genre_catalog(),
            ratings: mpa_catalog(),
        }
    }

    fn resolve_mpa(&self, mpa: Option<&Mpa>) -> Result<Option<Mpa>, PersistenceError> {
        mpa.map(|m| {
            self.ratings
                .iter()
                .find(|r| r.id == m.id)
                .cloned()
                .ok_or(PersistenceError::mpa_not_found(m.id))
        })
        .transpose()
    }

    fn resolve_genres(&self, film: &Film) -> Result<Vec<Genre>, PersistenceError> {
        film.genre_ids()
            .into_iter()
            .map(|id| {
                self.genres
                    .iter()
                    .find(|g| g.id == id)
                    .cloned()
                    .ok_or(PersistenceError::genre_not_found(id))
            })
            .collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FilmRepository for MemoryStore {
    async fn list_films(&self) -> Result<Vec<Film>, PersistenceError> {
        Ok(self.state.read().await.films.values().cloned().collect())
    }

    async fn get_film(&self, id: FilmId) -> Result<Option<Film>, PersistenceError> {
        Ok(self.state.read().await.films.get(&id).cloned())
    }

    async fn create_film(&self, film: &Film) -> Result<Film, PersistenceError> {
        let mpa = self.resolve_mpa(film.mpa.as_ref())?;
        let genres = self.resolve_genres(film)?;

        let mut state = self.state.write().await;
        for user_id in &film.likes {
            state.user_exists(*user_id)?;
        }

        state.last_film_id += 1;
        let id = FilmId(state.last_film_id);
        let stored = Film {
            id: Some(id),
            mpa,
            genres,
            ..film.clone()
        };
        state.films.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update_film(&self, id: FilmId, film: &Film) -> Result<Film, PersistenceError> {
        let mpa = self.resolve_mpa(film.mpa.as_ref())?;
        let genres = self.resolve_genres(film)?;

        let mut state = self.state.write().await;
        let stored = state.film_mut(id)?;
        stored.name = film.name.clone();
        stored.description = film.description.clone();
        stored.release_date = film.release_date;
        stored.duration = film.duration;
        stored.mpa = mpa;
        stored.genres = genres;
        Ok(stored.clone())
    }

    async fn delete_film(&self, id: FilmId) -> Result<(), PersistenceError> {
        self.state
            .write()
            .await
            .films
            .remove(&id)
            .map(|_| ())
            .ok_or(PersistenceError::film_not_found(id))
    }

    async fn add_like(&self, film_id: FilmId, user_id: UserId) -> Result<(), PersistenceError> {
        let mut state = self.state.write().await;
        state.film_mut(film_id)?;
        state.user_exists(user_id)?;
        state.film_mut(film_id)?.likes.insert(user_id);
        Ok(())
    }

    async fn remove_like(&self, film_id: FilmId, user_id: UserId) -> Result<(), PersistenceError> {
        let mut state = self.state.write().await;
        state.film_mut(film_id)?;
        state.user_exists(user_id)?;
        state.film_mut(film_id)?.likes.remove(&user_id);
        Ok(())
    }

    async fn has_like(&self, film_id: FilmId, user_id: UserId) -> Result<bool, PersistenceError> {
        Ok(self
            .state
            .read()
            .await
            .films
            .get(&film_id)
            .is_some_and(|f| f.likes.contains(&user_id)))
    }

    async fn top_popular_films(&self, limit: NonZeroU32) -> Result<Vec<Film>, PersistenceError> {
        let state = self.state.read().await;
        // Values come out in id order and the sort is stable, so ties stay in id order.
        let mut films: Vec<&Film> = state.films.values().collect();
        films.sort_by_key(|f| Reverse(f.likes.len()));
        Ok(films
            .into_iter()
            .take(limit.get() as usize)
            .cloned()
            .collect())
    }

    async fn clear_films(&self) -> Result<(), PersistenceError> {
        self.state.write().await.films.clear();
        Ok(())
    }
}

impl UserRepository for MemoryStore {
    async fn list_users(&self) -> Result<Vec<User>, PersistenceError> {
        Ok(self.state.read().await.users.values().cloned().collect())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, PersistenceError> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn create_user(&self, user: &User) -> Result<User, PersistenceError> {
        let mut state = self.state.write().await;
        for friend_id in &user.friends {
            state.user_exists(*friend_id)?;
        }

        state.last_user_id += 1;
        let id = UserId(state.last_user_id);
        let stored = User {
            id: Some(id),
            ..user.clone()
        };
        for friend_id in &stored.friends {
            if let Some(friend) = state.users.get_mut(friend_id) {
                friend.friends.insert(id);
            }
        }
        state.users.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update_user(&self, id: UserId, user: &User) -> Result<User, PersistenceError> {
        let mut state = self.state.write().await;
        let stored = state
            .users
            .get_mut(&id)
            .ok_or(PersistenceError::user_not_found(id))?;
        stored.email = user.email.clone();
        stored.login = user.login.clone();
        stored.name = user.name.clone();
        stored.birthday = user.birthday;
        Ok(stored.clone())
    }

    async fn delete_user(&self, id: UserId) -> Result<(), PersistenceError> {
        let mut state = self.state.write().await;
        state
            .users
            .remove(&id)
            .ok_or(PersistenceError::user_not_found(id))?;
        for other in state.users.values_mut() {
            other.friends.remove(&id);
        }
        for film in state.films.values_mut() {
            film.likes.remove(&id);
        }
        Ok(())
    }

    async fn add_friend(&self, user_id: UserId, friend_id: UserId) -> Result<(), PersistenceError> {
        if user_id == friend_id {
            return Err(PersistenceError::SelfFriendship(user_id.0));
        }
        let mut state = self.state.write().await;
        state.user_exists(user_id)?;
        state.user_exists(friend_id)?;
        if let Some(user) = state.users.get_mut(&user_id) {
            user.friends.insert(friend_id);
        }
        if let Some(friend) = state.users.get_mut(&friend_id) {
            friend.friends.insert(user_id);
        }
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
        let mut state = self.state.write().await;
        state.user_exists(user_id)?;
        state.user_exists(friend_id)?;
        if let Some(user) = state.users.get_mut(&user_id) {
            user.friends.remove(&friend_id);
        }
        if let Some(friend) = state.users.get_mut(&friend_id) {
            friend.friends.remove(&user_id);
        }
        Ok(())
    }

    async fn are_friends(
        &self,
        user_id: UserId,
        friend_id: UserId,
    ) -> Result<bool, PersistenceError> {
        Ok(self
            .state
            .read()
            .await
            .users
            .get(&user_id)
            .is_some_and(|u| u.friends.contains(&friend_id)))
    }

    async fn friends_of(&self, id: UserId) -> Result<Vec<User>, PersistenceError> {
        let state = self.state.read().await;
        let user = state
            .users
            .get(&id)
            .ok_or(PersistenceError::user_not_found(id))?;
        Ok(state.users_by_id(user.friends.iter().copied()))
    }

    async fn common_friends(
        &self,
        id: UserId,
        other_id: UserId,
    ) -> Result<Vec<User>, PersistenceError> {
        let state = self.state.read().await;
        let user = state
            .users
            .get(&id)
            .ok_or(PersistenceError::user_not_found(id))?;
        let other = state
            .users
            .get(&other_id)
            .ok_or(PersistenceError::user_not_found(other_id))?;
        Ok(state.users_by_id(user.friends.intersection(&other.friends).copied()))
    }

    async fn clear_users(&self) -> Result<(), PersistenceError> {
        let mut state = self.state.write().await;
        state.users.clear();
        for film in state.films.values_mut() {
            film.likes.clear();
        }
        Ok(())
    }
}

impl GenreRepository for MemoryStore {
    async fn list_genres(&self) -> Result<Vec<Genre>, PersistenceError> {
        Ok(self.genres.clone())
    }

    async fn get_genre(&self, id: GenreId) -> Result<Option<Genre>, PersistenceError> {
        Ok(self.genres.iter().find(|g| g.id == id).cloned())
    }
}

impl MpaRepository for MemoryStore {
    async fn list_mpa(&self) -> Result<Vec<Mpa>, PersistenceError> {
        Ok(self.ratings.clone())
    }

    async fn get_mpa(&self, id: MpaId) -> Result<Option<Mpa>, PersistenceError> {
        Ok(self.ratings.iter().find(|r| r.id == id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_user(login: &str) -> User {
        User::new(format!("{login}@example.com"), login, login, date(1990, 5, 17))
    }

    #[tokio::test]
    async fn test_ids_are_not_reused_after_delete() {
        let store = MemoryStore::new();
        let first = store
            .create_film(&Film::new("Alien", "", date(1979, 5, 25), 117))
            .await
            .unwrap();
        store.delete_film(first.id.unwrap()).await.unwrap();
        let second = store
            .create_film(&Film::new("Aliens", "", date(1986, 7, 18), 137))
            .await
            .unwrap();
        assert_eq!(first.id, Some(FilmId(1)));
        assert_eq!(second.id, Some(FilmId(2)));
    }

    #[tokio::test]
    async fn test_create_ignores_supplied_id() {
        let store = MemoryStore::new();
        let mut user = sample_user("ripley");
        user.id = Some(UserId(99));
        let created = store.create_user(&user).await.unwrap();
        assert_eq!(created.id, Some(UserId(1)));
        assert!(store.get_user(UserId(99)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_create_leaves_no_trace() {
        let store = MemoryStore::new();
        let mut user = sample_user("dallas");
        user.friends.insert(UserId(5));
        let err = store.create_user(&user).await.unwrap_err();
        assert!(matches!(err, PersistenceError::NotFound { entity: "user", id: 5 }));
        assert!(store.list_users().await.unwrap().is_empty());

        // The rejected insert did not consume an id.
        let created = store.create_user(&sample_user("kane")).await.unwrap();
        assert_eq!(created.id, Some(UserId(1)));
    }

    #[tokio::test]
    async fn test_catalog_names_are_resolved() {
        let store = MemoryStore::new();
        let mut film = Film::new("Up", "", date(2009, 5, 29), 96);
        film.mpa = Some(Mpa::reference(1));
        film.genres = vec![Genre::reference(3), Genre::reference(1)];
        let created = store.create_film(&film).await.unwrap();
        assert_eq!(created.mpa.unwrap().name, "G");
        let names: Vec<_> = created.genres.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Comedy", "Animation"]);
    }
}
