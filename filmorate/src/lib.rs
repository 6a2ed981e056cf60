//! Filmorate: a catalog of films and users with likes, friendships and a
//! popularity ranking, backed by SQLite or process memory.

pub mod config;
pub mod error;
pub mod model;
pub mod persistence;
pub mod service;
