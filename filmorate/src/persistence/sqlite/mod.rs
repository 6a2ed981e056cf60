//! SQLite-backed repository implementations.
//!
//! ## Database setup
//!
//! [`Database`] wraps a `sqlx::SqlitePool` configured with:
//! - **WAL mode**: allows one writer and multiple concurrent readers.
//! - **Foreign keys enabled**: enforced at the connection level.
//! - **Embedded migrations**: `sqlx::migrate!` runs `migrations/001_initial_schema.sql`
//!   and `migrations/002_reference_data.sql` when [`Database::open`] is called.
//!
//! ## Repository types
//!
//! Each `Sqlite*Repository` holds a clone of the pool and implements the
//! corresponding trait from [`crate::persistence::traits`]:
//!
//! | Type | Trait |
//! |------|-------|
//! | [`SqliteFilmRepository`] | `FilmRepository` |
//! | [`SqliteUserRepository`] | `UserRepository` |
//! | [`SqliteGenreRepository`] | `GenreRepository` |
//! | [`SqliteMpaRepository`] | `MpaRepository` |
//!
//! Every mutation that touches more than one row runs in a single
//! transaction. Dates are stored as ISO-8601 `TEXT`.

mod database;
mod film_repo;
pub(crate) mod helpers;
mod reference_repo;
mod user_repo;

pub use database::Database;
pub use film_repo::SqliteFilmRepository;
pub use reference_repo::{SqliteGenreRepository, SqliteMpaRepository};
pub use user_repo::SqliteUserRepository;
