//! Database schema module - table definitions.
//!
//! This module contains the SQL schema for the Henhouse database: users,
//! categories, tags, stories with their chapters, and content reports.

use rusqlite::Connection;
use crate::{HenhouseError, Result};

/// Initialize the database schema.
///
/// Creates all tables and indexes if they don't already exist. This is called
/// on every database open to ensure the schema is up to date.
///
/// # Schema
///
/// Timestamps are Unix seconds, UUIDs are lowercase hyphenated text and
/// booleans are 0/1 integers.
///
/// ## stories table
/// - `uuid`: Primary key
/// - `creator_uuid`: Author, foreign key to users
/// - `category_name`: Foreign key to categories, NULL when uncategorized
/// - `is_nsfw`: Whether the story is marked not safe for work
///
/// ## chapters table
/// - `idx`: Position within the story, unique per story
/// - `published_at`: NULL while the chapter is a draft
///
/// ## story_reports / chapter_reports tables
/// - `kind`: 0 = other, 1 = DMCA, 2 = abuse
pub fn init(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            uuid TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            is_staff INTEGER NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL,
            attributes TEXT NOT NULL DEFAULT '{}'
        );

        CREATE TABLE IF NOT EXISTS categories (
            name TEXT PRIMARY KEY,
            pretty_name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            sort_key INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS tags (
            name TEXT PRIMARY KEY,
            pretty_name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS stories (
            uuid TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            synopsis TEXT NOT NULL DEFAULT '',
            creator_uuid TEXT NOT NULL REFERENCES users(uuid),
            category_name TEXT REFERENCES categories(name),
            created_at INTEGER NOT NULL,
            is_nsfw INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS story_tags (
            story_uuid TEXT NOT NULL REFERENCES stories(uuid) ON DELETE CASCADE,
            tag_name TEXT NOT NULL REFERENCES tags(name) ON DELETE CASCADE,
            PRIMARY KEY (story_uuid, tag_name)
        );

        CREATE TABLE IF NOT EXISTS chapters (
            uuid TEXT PRIMARY KEY,
            story_uuid TEXT NOT NULL REFERENCES stories(uuid) ON DELETE CASCADE,
            name TEXT NOT NULL,
            synopsis TEXT NOT NULL DEFAULT '',
            idx INTEGER NOT NULL,
            markdown TEXT NOT NULL DEFAULT '',
            created_at INTEGER NOT NULL,
            published_at INTEGER,
            UNIQUE(story_uuid, idx)
        );

        CREATE TABLE IF NOT EXISTS story_reports (
            uuid TEXT PRIMARY KEY,
            story_uuid TEXT NOT NULL REFERENCES stories(uuid) ON DELETE CASCADE,
            submitter_uuid TEXT NOT NULL REFERENCES users(uuid),
            kind INTEGER NOT NULL DEFAULT 0,
            details TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS chapter_reports (
            uuid TEXT PRIMARY KEY,
            chapter_uuid TEXT NOT NULL REFERENCES chapters(uuid) ON DELETE CASCADE,
            submitter_uuid TEXT NOT NULL REFERENCES users(uuid),
            kind INTEGER NOT NULL DEFAULT 0,
            details TEXT NOT NULL DEFAULT ''
        );

        -- Case-insensitive title and username lookups
        CREATE INDEX IF NOT EXISTS idx_stories_title ON stories(title COLLATE NOCASE);
        CREATE INDEX IF NOT EXISTS idx_users_username ON users(username COLLATE NOCASE);

        -- Foreign key lookups used by the story filters
        CREATE INDEX IF NOT EXISTS idx_stories_creator ON stories(creator_uuid);
        CREATE INDEX IF NOT EXISTS idx_chapters_story ON chapters(story_uuid, published_at);
        CREATE INDEX IF NOT EXISTS idx_story_tags_tag ON story_tags(tag_name);
        "#,
    )
    .map_err(|e| HenhouseError::Database(format!("Failed to initialize schema: {}", e)))?;

    Ok(())
}
