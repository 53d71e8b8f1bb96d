//! Henhouse - search and sort query core for a story publishing backend.
//!
//! This library provides the compact `search`/`sort` query DSL, the
//! per-resource registries for stories, chapters, tags and categories, and
//! the SQLite adapter that executes the resulting predicates and orderings.

pub mod art;
pub mod config;
pub mod db;
pub mod logging;
pub mod query;

use thiserror::Error;

use crate::query::{QueryError, RegistryError};

/// Henhouse error types covering all failure modes.
#[derive(Error, Debug)]
pub enum HenhouseError {
    /// Database errors (SQLite operations)
    #[error("Database error: {0}")]
    Database(String),

    /// Configuration file errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Bulk loader errors
    #[error("Load error: {0}")]
    Load(String),

    /// Search/sort errors caused by the request
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Registry construction errors
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// I/O errors (file operations)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using HenhouseError
pub type Result<T> = std::result::Result<T, HenhouseError>;
