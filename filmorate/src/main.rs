//! Filmorate command-line front end.
//!
//! Opens the configured backend, runs one catalog command and prints the
//! result as pretty JSON on stdout. Logs go to stderr (`RUST_LOG` controls
//! the level).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::{json, Value};

use filmorate::config::{self, StorageKind};
use filmorate::model::{Film, FilmId, Genre, GenreId, Mpa, MpaId, User, UserId};
use filmorate::persistence::sqlite::{
    Database, SqliteFilmRepository, SqliteGenreRepository, SqliteMpaRepository,
    SqliteUserRepository,
};
use filmorate::persistence::{
    FilmRepository, GenreRepository, MemoryStore, MpaRepository, UserRepository,
};
use filmorate::service::{FilmService, ReferenceService, UserService};

#[derive(Parser)]
#[command(name = "filmorate", about = "Film catalog with likes, friendships and rankings")]
struct Cli {
    /// Storage backend. Overrides FILMORATE_STORAGE.
    #[arg(long)]
    storage: Option<StorageKind>,

    /// SQLite database file. Overrides FILMORATE_DB_PATH and FILMORATE_DATA_DIR.
    #[arg(long)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage films, likes and the popularity ranking.
    Films {
        #[command(subcommand)]
        action: FilmAction,
    },
    /// Manage users and friendships.
    Users {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Browse the genre catalog.
    Genres {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Browse the MPA rating catalog.
    Mpa {
        #[command(subcommand)]
        action: CatalogAction,
    },
}

#[derive(Args)]
struct FilmArgs {
    #[arg(long)]
    name: String,
    #[arg(long, default_value = "")]
    description: String,
    /// ISO date, e.g. 1999-03-31.
    #[arg(long)]
    release_date: NaiveDate,
    /// Minutes.
    #[arg(long, allow_negative_numbers = true)]
    duration: i32,
    /// MPA rating id.
    #[arg(long)]
    mpa: Option<i32>,
    /// Genre id; repeat for several.
    #[arg(long = "genre")]
    genres: Vec<i32>,
}

impl FilmArgs {
    fn into_film(self) -> Film {
        let mut film = Film::new(self.name, self.description, self.release_date, self.duration);
        film.mpa = self.mpa.map(Mpa::reference);
        film.genres = self.genres.into_iter().map(Genre::reference).collect();
        film
    }
}

#[derive(Subcommand)]
enum FilmAction {
    List,
    Get {
        #[arg(allow_negative_numbers = true)]
        id: i64,
    },
    Create {
        #[command(flatten)]
        film: FilmArgs,
        /// Id of a user who likes the film; repeat for several.
        #[arg(long = "like")]
        likes: Vec<i64>,
    },
    /// Replace a film's fields, rating and genres. Likes are kept.
    Update {
        #[arg(allow_negative_numbers = true)]
        id: i64,
        #[command(flatten)]
        film: FilmArgs,
    },
    Delete {
        #[arg(allow_negative_numbers = true)]
        id: i64,
    },
    Like {
        #[arg(allow_negative_numbers = true)]
        film_id: i64,
        #[arg(allow_negative_numbers = true)]
        user_id: i64,
    },
    Unlike {
        #[arg(allow_negative_numbers = true)]
        film_id: i64,
        #[arg(allow_negative_numbers = true)]
        user_id: i64,
    },
    /// Most liked films first.
    Top {
        #[arg(long, allow_negative_numbers = true)]
        count: Option<i64>,
    },
}

#[derive(Args)]
struct UserArgs {
    #[arg(long)]
    email: String,
    #[arg(long)]
    login: String,
    /// Display name; defaults to the login.
    #[arg(long, default_value = "")]
    name: String,
    #[arg(long)]
    birthday: NaiveDate,
}

impl UserArgs {
    fn into_user(self) -> User {
        User::new(self.email, self.login, self.name, self.birthday)
    }
}

#[derive(Subcommand)]
enum UserAction {
    List,
    Get {
        #[arg(allow_negative_numbers = true)]
        id: i64,
    },
    Create {
        #[command(flatten)]
        user: UserArgs,
        /// Id of an existing user to befriend; repeat for several.
        #[arg(long = "friend")]
        friends: Vec<i64>,
    },
    /// Replace a user's fields. Friendships are kept.
    Update {
        #[arg(allow_negative_numbers = true)]
        id: i64,
        #[command(flatten)]
        user: UserArgs,
    },
    Delete {
        #[arg(allow_negative_numbers = true)]
        id: i64,
    },
    Friend {
        #[arg(allow_negative_numbers = true)]
        id: i64,
        #[arg(allow_negative_numbers = true)]
        friend_id: i64,
    },
    Unfriend {
        #[arg(allow_negative_numbers = true)]
        id: i64,
        #[arg(allow_negative_numbers = true)]
        friend_id: i64,
    },
    Friends {
        #[arg(allow_negative_numbers = true)]
        id: i64,
    },
    /// Friends shared by two users.
    Common {
        #[arg(allow_negative_numbers = true)]
        id: i64,
        #[arg(allow_negative_numbers = true)]
        other_id: i64,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    List,
    Get { id: i32 },
}

fn to_json(value: impl Serialize) -> anyhow::Result<Value> {
    Ok(serde_json::to_value(value)?)
}

struct App<F, U, G, M> {
    films: FilmService<F, U, G, M>,
    users: UserService<U>,
    reference: ReferenceService<G, M>,
}

impl<F, U, G, M> App<F, U, G, M>
where
    F: FilmRepository,
    U: UserRepository,
    G: GenreRepository,
    M: MpaRepository,
{
    fn new(films: Arc<F>, users: Arc<U>, genres: Arc<G>, ratings: Arc<M>) -> Self {
        Self {
            films: FilmService::new(films, users.clone(), genres.clone(), ratings.clone()),
            users: UserService::new(users),
            reference: ReferenceService::new(genres, ratings),
        }
    }

    async fn run(&self, command: Command) -> anyhow::Result<Value> {
        match command {
            Command::Films { action } => self.run_films(action).await,
            Command::Users { action } => self.run_users(action).await,
            Command::Genres { action } => Ok(match action {
                CatalogAction::List => to_json(self.reference.list_genres().await?)?,
                CatalogAction::Get { id } => to_json(self.reference.get_genre(GenreId(id)).await?)?,
            }),
            Command::Mpa { action } => Ok(match action {
                CatalogAction::List => to_json(self.reference.list_mpa().await?)?,
                CatalogAction::Get { id } => to_json(self.reference.get_mpa(MpaId(id)).await?)?,
            }),
        }
    }

    async fn run_films(&self, action: FilmAction) -> anyhow::Result<Value> {
        let films = &self.films;
        let value = match action {
            FilmAction::List => to_json(films.list_films().await?)?,
            FilmAction::Get { id } => to_json(films.get_film(FilmId(id)).await?)?,
            FilmAction::Create { film, likes } => {
                let mut film = film.into_film();
                film.likes = likes.into_iter().map(UserId).collect();
                to_json(films.create_film(film).await?)?
            }
            FilmAction::Update { id, film } => {
                let mut film = film.into_film();
                film.id = Some(FilmId(id));
                to_json(films.update_film(film).await?)?
            }
            FilmAction::Delete { id } => {
                films.delete_film(FilmId(id)).await?;
                json!({ "deleted": id })
            }
            FilmAction::Like { film_id, user_id } => {
                to_json(films.add_like(FilmId(film_id), UserId(user_id)).await?)?
            }
            FilmAction::Unlike { film_id, user_id } => {
                to_json(films.remove_like(FilmId(film_id), UserId(user_id)).await?)?
            }
            FilmAction::Top { count } => to_json(films.top_films(count).await?)?,
        };
        Ok(value)
    }

    async fn run_users(&self, action: UserAction) -> anyhow::Result<Value> {
        let users = &self.users;
        let value = match action {
            UserAction::List => to_json(users.list_users().await?)?,
            UserAction::Get { id } => to_json(users.get_user(UserId(id)).await?)?,
            UserAction::Create { user, friends } => {
                let mut user = user.into_user();
                user.friends = friends.into_iter().map(UserId).collect();
                to_json(users.create_user(user).await?)?
            }
            UserAction::Update { id, user } => {
                let mut user = user.into_user();
                user.id = Some(UserId(id));
                to_json(users.update_user(user).await?)?
            }
            UserAction::Delete { id } => {
                users.delete_user(UserId(id)).await?;
                json!({ "deleted": id })
            }
            UserAction::Friend { id, friend_id } => {
                to_json(users.add_friend(UserId(id), UserId(friend_id)).await?)?
            }
            UserAction::Unfriend { id, friend_id } => {
                to_json(users.remove_friend(UserId(id), UserId(friend_id)).await?)?
            }
            UserAction::Friends { id } => to_json(users.friends(UserId(id)).await?)?,
            UserAction::Common { id, other_id } => {
                to_json(users.common_friends(UserId(id), UserId(other_id)).await?)?
            }
        };
        Ok(value)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use tracing_subscriber::fmt::format::FmtSpan;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let storage = cli.storage.unwrap_or_else(config::get_storage_kind);

    let value = match storage {
        StorageKind::Memory => {
            tracing::debug!("Using in-memory storage");
            let store = Arc::new(MemoryStore::new());
            App::new(store.clone(), store.clone(), store.clone(), store)
                .run(cli.command)
                .await?
        }
        StorageKind::Sqlite => {
            let path = cli.db.unwrap_or_else(config::get_db_path);
            tracing::debug!("Using database: {}", path.display());
            let db = Database::open(&path)
                .await
                .with_context(|| format!("failed to open database at {}", path.display()))?;
            let pool = db.pool().clone();
            App::new(
                Arc::new(SqliteFilmRepository::new(pool.clone())),
                Arc::new(SqliteUserRepository::new(pool.clone())),
                Arc::new(SqliteGenreRepository::new(pool.clone())),
                Arc::new(SqliteMpaRepository::new(pool)),
            )
            .run(cli.command)
            .await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
