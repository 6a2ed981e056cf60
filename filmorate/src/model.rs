//! Catalog entities and the fixed reference data they point at.
//!
//! A [`Film`] or [`User`] carries `id: None` until storage assigns one.
//! Relation sets (`likes`, `friends`) are plain id sets; genres and the
//! rating are carried as catalog entries whose names are resolved by storage.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Earliest admissible film release date (the first public film screening).
pub const EARLIEST_RELEASE_DATE: NaiveDate = match NaiveDate::from_ymd_opt(1895, 12, 28) {
    Some(date) => date,
    None => panic!("invalid earliest release date"),
};

/// Maximum film description length, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 200;

/// Number of films returned by the popularity ranking when the caller omits a count.
pub const DEFAULT_TOP_COUNT: u32 = 10;

/// MPA rating catalog, `(id, name)`.
pub const MPA_RATINGS: [(i32, &str); 5] = [
    (1, "G"),
    (2, "PG"),
    (3, "PG-13"),
    (4, "R"),
    (5, "NC-17"),
];

/// Genre catalog, `(id, name)`.
pub const GENRES: [(i32, &str); 6] = [
    (1, "Comedy"),
    (2, "Drama"),
    (3, "Animation"),
    (4, "Thriller"),
    (5, "Documentary"),
    (6, "Action"),
];

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident($inner:ty)) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$inner> for $name {
            fn from(id: $inner) -> Self {
                Self(id)
            }
        }
    };
}

id_type!(
    /// Storage-assigned film identifier.
    FilmId(i64)
);
id_type!(
    /// Storage-assigned user identifier.
    UserId(i64)
);
id_type!(GenreId(i32));
id_type!(MpaId(i32));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: GenreId,
    #[serde(default)]
    pub name: String,
}

impl Genre {
    /// A reference to a catalog genre by id only.
    pub fn reference(id: i32) -> Self {
        Self {
            id: GenreId(id),
            name: String::new(),
        }
    }
}

/// MPA rating classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mpa {
    pub id: MpaId,
    #[serde(default)]
    pub name: String,
}

impl Mpa {
    /// A reference to a catalog rating by id only.
    pub fn reference(id: i32) -> Self {
        Self {
            id: MpaId(id),
            name: String::new(),
        }
    }
}

/// Full genre catalog as entities, ordered by id.
pub fn genre_catalog() -> Vec<Genre> {
    GENRES
        .iter()
        .map(|&(id, name)| Genre {
            id: GenreId(id),
            name: name.to_string(),
        })
        .collect()
}

/// Full MPA catalog as entities, ordered by id.
pub fn mpa_catalog() -> Vec<Mpa> {
    MPA_RATINGS
        .iter()
        .map(|&(id, name)| Mpa {
            id: MpaId(id),
            name: name.to_string(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Film {
    #[serde(default)]
    pub id: Option<FilmId>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub release_date: NaiveDate,
    pub duration: i32,
    #[serde(default)]
    pub mpa: Option<Mpa>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    /// Users who liked this film.
    #[serde(default)]
    pub likes: BTreeSet<UserId>,
}

impl Film {
    /// A film without id, rating, genres or likes.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        release_date: NaiveDate,
        duration: i32,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: description.into(),
            release_date,
            duration,
            mpa: None,
            genres: Vec::new(),
            likes: BTreeSet::new(),
        }
    }

    /// Genre ids in ascending order without duplicates.
    pub fn genre_ids(&self) -> BTreeSet<GenreId> {
        self.genres.iter().map(|g| g.id).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: Option<UserId>,
    pub email: String,
    pub login: String,
    /// Display name. Blank input is replaced by the login.
    #[serde(default)]
    pub name: String,
    pub birthday: NaiveDate,
    #[serde(default)]
    pub friends: BTreeSet<UserId>,
}

impl User {
    /// A user without id or friends.
    pub fn new(
        email: impl Into<String>,
        login: impl Into<String>,
        name: impl Into<String>,
        birthday: NaiveDate,
    ) -> Self {
        Self {
            id: None,
            email: email.into(),
            login: login.into(),
            name: name.into(),
            birthday,
            friends: BTreeSet::new(),
        }
    }
}
