pub mod config;
pub mod db;
pub mod dto;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod service;

use sqlx::{postgres::Postgres, Pool};

pub type PGPool = Pool<Postgres>;

/// Bearer token lifetime in seconds.
pub const ACCESS_TOKEN_EXP: usize = 7 * 24 * 60 * 60;
