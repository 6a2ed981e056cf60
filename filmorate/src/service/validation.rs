//! Scalar checks applied before anything reaches storage.

use std::num::NonZeroU32;

use chrono::NaiveDate;

use crate::error::{CatalogError, CatalogResult};
use crate::model::{Film, User, DEFAULT_TOP_COUNT, EARLIEST_RELEASE_DATE, MAX_DESCRIPTION_LEN};

pub fn validate_film(film: &Film) -> CatalogResult<()> {
    if film.name.trim().is_empty() {
        return Err(CatalogError::validation("film name must not be blank"));
    }
    if film.description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(CatalogError::validation(format!(
            "film description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    if film.release_date < EARLIEST_RELEASE_DATE {
        return Err(CatalogError::validation(format!(
            "release date must not be before {EARLIEST_RELEASE_DATE}"
        )));
    }
    if film.duration < 0 {
        return Err(CatalogError::validation("film duration must not be negative"));
    }
    Ok(())
}

/// Check a user and fill in a blank display name from the login.
pub fn validate_user(user: &mut User, today: NaiveDate) -> CatalogResult<()> {
    if user.email.trim().is_empty() || !user.email.contains('@') {
        return Err(CatalogError::validation("email must contain '@'"));
    }
    if user.login.is_empty() || user.login.chars().any(char::is_whitespace) {
        return Err(CatalogError::validation(
            "login must not be empty or contain whitespace",
        ));
    }
    if user.birthday > today {
        return Err(CatalogError::validation("birthday must not be in the future"));
    }
    if user.name.trim().is_empty() {
        user.name = user.login.clone();
    }
    Ok(())
}

/// Resolve the requested ranking size, defaulting to [`DEFAULT_TOP_COUNT`].
/// Counts above `u32::MAX` are clamped; no catalog holds that many films.
pub fn top_count(count: Option<i64>) -> CatalogResult<NonZeroU32> {
    let count = count.unwrap_or(i64::from(DEFAULT_TOP_COUNT));
    u32::try_from(count.min(i64::from(u32::MAX)))
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or_else(|| {
            CatalogError::validation(format!("count must be a positive integer, got {count}"))
        })
}

pub fn require_positive_id(entity: &str, id: i64) -> CatalogResult<()> {
    if id > 0 {
        Ok(())
    } else {
        Err(CatalogError::validation(format!("{entity} id must be positive, got {id}")))
    }
}
