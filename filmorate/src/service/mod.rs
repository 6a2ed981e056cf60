//! Business rules on top of the repositories.
//!
//! Services validate input, check that referenced entities exist, and map
//! storage failures into [`crate::error::CatalogError`]. They are generic
//! over the repository traits so the same rules run against either backend.

mod film_service;
mod reference_service;
mod user_service;
pub mod validation;

pub use film_service::FilmService;
pub use reference_service::ReferenceService;
pub use user_service::UserService;
