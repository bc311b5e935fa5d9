//! Data layer module
//!
//! Handles all data persistence:
//! - Admins and login sessions
//! - Game analytics (users, play sessions, levels, scores)

mod database;
mod models;
pub mod seed;

pub use database::Database;
pub use models::*;
