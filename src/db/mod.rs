//! Database module - SQLite with WAL mode for the story store.
//!
//! This module provides connection management, the schema, row operations
//! and the bulk loaders.

pub mod load;
mod ops;
mod schema;

pub use ops::*;

use rusqlite::Connection;
use std::path::Path;

use crate::{HenhouseError, Result};

/// Database wrapper providing connection management.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Get a mutable reference to the underlying connection.
    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

/// Open a database connection with WAL mode and tuned PRAGMAs.
///
/// This function:
/// 1. Creates parent directory if it doesn't exist
/// 2. Opens connection with rusqlite
/// 3. Configures WAL mode and foreign keys
/// 4. Initializes schema (creates tables if needed)
///
/// # Arguments
/// * `path` - Path to the SQLite database file
///
/// # Returns
/// * `Result<Database>` - Wrapped database connection
pub fn open_database(path: &Path) -> Result<Database> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let conn = Connection::open(path).map_err(|e| HenhouseError::Database(e.to_string()))?;

    conn.pragma_update(None, "journal_mode", "WAL")
        .map_err(|e| HenhouseError::Database(format!("Failed to set journal_mode: {}", e)))?;

    // NORMAL synchronous is safe in WAL mode
    conn.pragma_update(None, "synchronous", "NORMAL")
        .map_err(|e| HenhouseError::Database(format!("Failed to set synchronous: {}", e)))?;

    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(|e| HenhouseError::Database(format!("Failed to set foreign_keys: {}", e)))?;

    conn.pragma_update(None, "temp_store", "MEMORY")
        .map_err(|e| HenhouseError::Database(format!("Failed to set temp_store: {}", e)))?;

    conn.pragma_update(None, "busy_timeout", 5000i32)
        .map_err(|e| HenhouseError::Database(format!("Failed to set busy_timeout: {}", e)))?;

    schema::init(&conn)?;

    tracing::debug!("Opened database at {}", path.display());
    Ok(Database { conn })
}

/// Open a private in-memory database with the full schema.
pub fn open_in_memory() -> Result<Database> {
    let conn = Connection::open_in_memory().map_err(|e| HenhouseError::Database(e.to_string()))?;

    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(|e| HenhouseError::Database(format!("Failed to set foreign_keys: {}", e)))?;

    schema::init(&conn)?;
    Ok(Database { conn })
}
