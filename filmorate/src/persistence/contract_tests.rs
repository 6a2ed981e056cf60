//! Behaviour both backends must share.
//!
//! Each scenario is written once against the repository traits and run
//! against a fresh [`MemoryStore`] and a fresh in-memory SQLite database.

use std::num::NonZeroU32;

use chrono::NaiveDate;

use super::traits::{FilmRepository, UserRepository};
use super::PersistenceError;
use crate::model::{Film, FilmId, User, UserId};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn user<U: UserRepository>(users: &U, login: &str) -> UserId {
    users
        .create_user(&User::new(
            format!("{login}@example.com"),
            login,
            login,
            date(1992, 6, 1),
        ))
        .await
        .unwrap()
        .id
        .unwrap()
}

async fn film<F: FilmRepository>(films: &F, name: &str) -> FilmId {
    films
        .create_film(&Film::new(name, "", date(2010, 7, 16), 148))
        .await
        .unwrap()
        .id
        .unwrap()
}

fn ids(users: &[User]) -> Vec<UserId> {
    users.iter().filter_map(|u| u.id).collect()
}

fn film_ids(films: &[Film]) -> Vec<FilmId> {
    films.iter().filter_map(|f| f.id).collect()
}

async fn listing_is_in_id_order<F: FilmRepository, U: UserRepository>(films: &F, users: &U) {
    let a = film(films, "Inception").await;
    let b = film(films, "Interstellar").await;
    let c = film(films, "Tenet").await;
    assert_eq!(film_ids(&films.list_films().await.unwrap()), vec![a, b, c]);

    let x = user(users, "x").await;
    let y = user(users, "y").await;
    assert_eq!(ids(&users.list_users().await.unwrap()), vec![x, y]);
}

async fn friendship_is_symmetric<F: FilmRepository, U: UserRepository>(_films: &F, users: &U) {
    let ann = user(users, "ann").await;
    let bob = user(users, "bob").await;

    users.add_friend(ann, bob).await.unwrap();
    assert!(users.are_friends(ann, bob).await.unwrap());
    assert!(users.are_friends(bob, ann).await.unwrap());
    assert_eq!(ids(&users.friends_of(ann).await.unwrap()), vec![bob]);
    assert_eq!(ids(&users.friends_of(bob).await.unwrap()), vec![ann]);

    // Removing from either side removes both directions.
    users.remove_friend(bob, ann).await.unwrap();
    assert!(!users.are_friends(ann, bob).await.unwrap());
    assert!(!users.are_friends(bob, ann).await.unwrap());
    assert!(users.friends_of(ann).await.unwrap().is_empty());

    // Removing an absent friendship is a no-op.
    users.remove_friend(ann, bob).await.unwrap();
}

async fn friendship_is_idempotent<F: FilmRepository, U: UserRepository>(_films: &F, users: &U) {
    let ann = user(users, "ann").await;
    let bob = user(users, "bob").await;
    users.add_friend(ann, bob).await.unwrap();
    users.add_friend(ann, bob).await.unwrap();
    users.add_friend(bob, ann).await.unwrap();

    let ann_user = users.get_user(ann).await.unwrap().unwrap();
    assert_eq!(ann_user.friends.len(), 1);
    assert_eq!(users.friends_of(bob).await.unwrap().len(), 1);
}

async fn self_friendship_is_rejected<F: FilmRepository, U: UserRepository>(_films: &F, users: &U) {
    let ann = user(users, "ann").await;
    assert!(matches!(
        users.add_friend(ann, ann).await,
        Err(PersistenceError::SelfFriendship(_))
    ));
    assert!(!users.are_friends(ann, ann).await.unwrap());
}

async fn common_friends_is_intersection<F: FilmRepository, U: UserRepository>(
    _films: &F,
    users: &U,
) {
    let ann = user(users, "ann").await;
    let bob = user(users, "bob").await;
    let cid = user(users, "cid").await;
    let dan = user(users, "dan").await;
    let eve = user(users, "eve").await;

    assert!(users.common_friends(ann, bob).await.unwrap().is_empty());

    users.add_friend(ann, cid).await.unwrap();
    users.add_friend(ann, dan).await.unwrap();
    users.add_friend(ann, eve).await.unwrap();
    users.add_friend(bob, eve).await.unwrap();
    users.add_friend(bob, cid).await.unwrap();

    assert_eq!(ids(&users.common_friends(ann, bob).await.unwrap()), vec![cid, eve]);
    assert_eq!(ids(&users.common_friends(bob, ann).await.unwrap()), vec![cid, eve]);
    assert_eq!(ids(&users.common_friends(cid, eve).await.unwrap()), vec![ann, bob]);
}

async fn like_is_idempotent<F: FilmRepository, U: UserRepository>(films: &F, users: &U) {
    let f = film(films, "Memento").await;
    let u = user(users, "leonard").await;

    films.add_like(f, u).await.unwrap();
    films.add_like(f, u).await.unwrap();
    let liked = films.get_film(f).await.unwrap().unwrap();
    assert_eq!(liked.likes.len(), 1);
    assert!(films.has_like(f, u).await.unwrap());

    films.remove_like(f, u).await.unwrap();
    assert!(!films.has_like(f, u).await.unwrap());
    // Unliking again is a no-op, not an error.
    films.remove_like(f, u).await.unwrap();
    assert!(films.get_film(f).await.unwrap().unwrap().likes.is_empty());
}

async fn ranking_orders_by_like_count<F: FilmRepository, U: UserRepository>(films: &F, users: &U) {
    let none = film(films, "Nobody").await;
    let three = film(films, "Popular").await;
    let one = film(films, "Niche").await;
    let a = user(users, "a").await;
    let b = user(users, "b").await;
    let c = user(users, "c").await;
    for u in [a, b, c] {
        films.add_like(three, u).await.unwrap();
    }
    films.add_like(one, b).await.unwrap();

    let top = films
        .top_popular_films(NonZeroU32::new(2).unwrap())
        .await
        .unwrap();
    assert_eq!(film_ids(&top), vec![three, one]);

    let all = films
        .top_popular_films(NonZeroU32::new(10).unwrap())
        .await
        .unwrap();
    assert_eq!(film_ids(&all), vec![three, one, none]);
}

async fn ranking_ties_keep_id_order<F: FilmRepository, U: UserRepository>(films: &F, users: &U) {
    let first = film(films, "First").await;
    let second = film(films, "Second").await;
    let third = film(films, "Third").await;
    let u = user(users, "u").await;
    films.add_like(third, u).await.unwrap();

    let top = films
        .top_popular_films(NonZeroU32::new(3).unwrap())
        .await
        .unwrap();
    assert_eq!(film_ids(&top), vec![third, first, second]);
}

async fn delete_user_cascades<F: FilmRepository, U: UserRepository>(films: &F, users: &U) {
    let gone = user(users, "gone").await;
    let stay = user(users, "stay").await;
    let other = user(users, "other").await;
    let f1 = film(films, "One").await;
    let f2 = film(films, "Two").await;
    films.add_like(f1, gone).await.unwrap();
    films.add_like(f2, gone).await.unwrap();
    films.add_like(f2, stay).await.unwrap();
    users.add_friend(gone, stay).await.unwrap();
    users.add_friend(other, gone).await.unwrap();

    users.delete_user(gone).await.unwrap();

    assert!(users.get_user(gone).await.unwrap().is_none());
    for f in films.list_films().await.unwrap() {
        assert!(!f.likes.contains(&gone));
    }
    for u in users.list_users().await.unwrap() {
        assert!(!u.friends.contains(&gone));
    }
    assert_eq!(
        films.get_film(f2).await.unwrap().unwrap().likes.into_iter().collect::<Vec<_>>(),
        vec![stay]
    );
    assert!(matches!(
        users.delete_user(gone).await,
        Err(PersistenceError::NotFound { entity: "user", .. })
    ));
}

async fn missing_ids_are_not_found<F: FilmRepository, U: UserRepository>(films: &F, users: &U) {
    let u = user(users, "solo").await;
    let f = film(films, "Solo").await;

    assert!(films.get_film(FilmId(999)).await.unwrap().is_none());
    assert!(users.get_user(UserId(999)).await.unwrap().is_none());

    assert!(matches!(
        films.add_like(FilmId(999), u).await,
        Err(PersistenceError::NotFound { entity: "film", id: 999 })
    ));
    assert!(matches!(
        films.add_like(f, UserId(999)).await,
        Err(PersistenceError::NotFound { entity: "user", id: 999 })
    ));
    assert!(matches!(
        films.remove_like(FilmId(999), u).await,
        Err(PersistenceError::NotFound { entity: "film", id: 999 })
    ));
    assert!(matches!(
        users.update_user(UserId(999), &User::new("a@b.c", "a", "a", date(2000, 1, 1))).await,
        Err(PersistenceError::NotFound { entity: "user", id: 999 })
    ));
    assert!(matches!(
        users.friends_of(UserId(999)).await,
        Err(PersistenceError::NotFound { entity: "user", id: 999 })
    ));
    assert!(matches!(
        users.common_friends(u, UserId(999)).await,
        Err(PersistenceError::NotFound { entity: "user", id: 999 })
    ));
    assert!(matches!(
        films.delete_film(FilmId(999)).await,
        Err(PersistenceError::NotFound { entity: "film", id: 999 })
    ));
}

async fn create_film_with_missing_liker_writes_nothing<F: FilmRepository, U: UserRepository>(
    films: &F,
    users: &U,
) {
    let u = user(users, "real").await;
    let mut draft = Film::new("Draft", "", date(2001, 1, 1), 90);
    draft.likes.insert(u);
    draft.likes.insert(UserId(404));

    assert!(matches!(
        films.create_film(&draft).await,
        Err(PersistenceError::NotFound { entity: "user", id: 404 })
    ));
    assert!(films.list_films().await.unwrap().is_empty());

    draft.likes.remove(&UserId(404));
    let created = films.create_film(&draft).await.unwrap();
    assert_eq!(created.id, Some(FilmId(1)));
    assert!(films.has_like(FilmId(1), u).await.unwrap());
}

async fn clear_users_drops_their_likes<F: FilmRepository, U: UserRepository>(films: &F, users: &U) {
    let f = film(films, "Kept").await;
    let u = user(users, "fan").await;
    films.add_like(f, u).await.unwrap();

    users.clear_users().await.unwrap();

    assert!(users.list_users().await.unwrap().is_empty());
    let kept = films.get_film(f).await.unwrap().unwrap();
    assert!(kept.likes.is_empty());

    // Ids keep increasing after a clear.
    let next = user(users, "next").await;
    assert_eq!(next, UserId(2));
}

macro_rules! contract {
    ($($scenario:ident),* $(,)?) => {
        mod memory_backend {
            use crate::persistence::MemoryStore;
            $(
                #[tokio::test]
                async fn $scenario() {
                    let store = MemoryStore::new();
                    super::$scenario(&store, &store).await;
                }
            )*
        }

        mod sqlite_backend {
            use crate::persistence::sqlite::{Database, SqliteFilmRepository, SqliteUserRepository};
            $(
                #[tokio::test]
                async fn $scenario() {
                    let db = Database::new_in_memory().await.unwrap();
                    let films = SqliteFilmRepository::new(db.pool().clone());
                    let users = SqliteUserRepository::new(db.pool().clone());
                    super::$scenario(&films, &users).await;
                }
            )*
        }
    };
}

contract!(
    listing_is_in_id_order,
    friendship_is_symmetric,
    friendship_is_idempotent,
    self_friendship_is_rejected,
    common_friends_is_intersection,
    like_is_idempotent,
    ranking_orders_by_like_count,
    ranking_ties_keep_id_order,
    delete_user_cascades,
    missing_ids_are_not_found,
    create_film_with_missing_liker_writes_nothing,
    clear_users_drops_their_likes,
);
