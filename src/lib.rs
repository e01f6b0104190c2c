//! Book inventory manager
//!
//! A catalog of books with stock counts, served as a REST API and a console
//! menu: search, pagination, registration with restocking of duplicates,
//! stock updates, deletion and spreadsheet export.

use std::sync::Arc;

pub mod api;
pub mod catalog;
pub mod config;
pub mod console;
pub mod error;
pub mod logging;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<services::Services>,
}
