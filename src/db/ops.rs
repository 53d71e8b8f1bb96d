//! Database operations module - inserts, lookups and filtered listing.
//!
//! Listing runs predicate and ordering trees through the SQL builder in
//! [`crate::query::sql`] against any row type implementing [`Listable`].

use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::art::models::{timestamp_column, uuid_column, Category, Chapter, Report, Story, Tag, User};
use crate::query::sql::{build_count, build_select, Page};
use crate::query::{OrderTerm, Predicate};
use crate::{HenhouseError, Result};

/// A row type that can be listed with search predicates and orderings.
pub trait Listable: Sized {
    /// Table the registries' columns are qualified with
    const TABLE: &'static str;
    /// Selected columns, in the order `from_row` reads them
    const COLUMNS: &'static [&'static str];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

/// List one page of `T` rows matching all `predicates`, in `ordering`.
///
/// # Arguments
/// * `conn` - Database connection
/// * `predicates` - Filters, ANDed
/// * `ordering` - ORDER BY terms, primary first
/// * `page` - Limit and offset
pub fn list<T: Listable>(
    conn: &Connection,
    predicates: &[Predicate],
    ordering: &[OrderTerm],
    page: Page,
) -> Result<Vec<T>> {
    let (sql, params) = build_select(T::TABLE, T::COLUMNS, predicates, ordering, page);

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| HenhouseError::Database(format!("Failed to prepare list query: {}", e)))?;

    let rows = stmt
        .query_map(params_from_iter(params.iter()), T::from_row)
        .map_err(|e| HenhouseError::Database(format!("Failed to execute list query: {}", e)))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row.map_err(|e| HenhouseError::Database(format!("Failed to read row: {}", e)))?);
    }

    Ok(results)
}

/// Count the `T` rows matching all `predicates`.
pub fn count<T: Listable>(conn: &Connection, predicates: &[Predicate]) -> Result<i64> {
    let (sql, params) = build_count(T::TABLE, predicates);

    conn.query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))
        .map_err(|e| HenhouseError::Database(format!("Failed to count {}: {}", T::TABLE, e)))
}

fn uuid_text(uuid: &Uuid) -> String {
    uuid.hyphenated().to_string()
}

pub fn insert_user(conn: &Connection, user: &User) -> Result<()> {
    let attributes = serde_json::to_string(&user.attributes)
        .map_err(|e| HenhouseError::Database(format!("Failed to encode user attributes: {}", e)))?;

    conn.execute(
        "INSERT INTO users (uuid, username, email, is_staff, is_active, created_at, attributes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            uuid_text(&user.uuid),
            user.username,
            user.email,
            user.is_staff,
            user.is_active,
            user.created_at.timestamp(),
            attributes,
        ],
    )
    .map_err(|e| HenhouseError::Database(format!("Failed to insert user: {}", e)))?;

    Ok(())
}

/// Look up a user by exact username.
pub fn get_user_by_username(conn: &Connection, username: &str) -> Result<Option<User>> {
    conn.query_row(
        "SELECT uuid, username, email, is_staff, is_active, created_at, attributes
         FROM users WHERE username = ?1",
        params![username],
        |row| {
            let attributes: String = row.get(6)?;
            Ok(User {
                uuid: uuid_column(row, 0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                is_staff: row.get(3)?,
                is_active: row.get(4)?,
                created_at: timestamp_column(row, 5)?,
                attributes: serde_json::from_str(&attributes).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e))
                })?,
            })
        },
    )
    .optional()
    .map_err(|e| HenhouseError::Database(format!("Failed to get user: {}", e)))
}

pub fn insert_category(conn: &Connection, category: &Category) -> Result<()> {
    conn.execute(
        "INSERT INTO categories (name, pretty_name, description, sort_key) VALUES (?1, ?2, ?3, ?4)",
        params![
            category.name,
            category.pretty_name,
            category.description,
            category.sort_key
        ],
    )
    .map_err(|e| HenhouseError::Database(format!("Failed to insert category: {}", e)))?;

    Ok(())
}

/// Update the display fields of an existing category; `sort_key` is kept.
///
/// # Returns
/// Whether a category with that name existed.
pub fn update_category(conn: &Connection, category: &Category) -> Result<bool> {
    let updated = conn
        .execute(
            "UPDATE categories SET pretty_name = ?1, description = ?2 WHERE name = ?3",
            params![category.pretty_name, category.description, category.name],
        )
        .map_err(|e| HenhouseError::Database(format!("Failed to update category: {}", e)))?;

    Ok(updated > 0)
}

pub fn get_category(conn: &Connection, name: &str) -> Result<Option<Category>> {
    conn.query_row(
        "SELECT name, pretty_name, description, sort_key FROM categories WHERE name = ?1",
        params![name],
        Category::from_row,
    )
    .optional()
    .map_err(|e| HenhouseError::Database(format!("Failed to get category: {}", e)))
}

/// Highest category `sort_key`, if any category exists.
pub fn max_category_sort_key(conn: &Connection) -> Result<Option<i64>> {
    conn.query_row("SELECT MAX(sort_key) FROM categories", [], |row| row.get(0))
        .map_err(|e| HenhouseError::Database(format!("Failed to get max sort key: {}", e)))
}

/// Insert a tag unless one with the same name exists.
///
/// # Returns
/// Whether the tag was created.
pub fn ensure_tag(conn: &Connection, tag: &Tag) -> Result<bool> {
    let inserted = conn
        .execute(
            "INSERT OR IGNORE INTO tags (name, pretty_name) VALUES (?1, ?2)",
            params![tag.name, tag.pretty_name],
        )
        .map_err(|e| HenhouseError::Database(format!("Failed to insert tag: {}", e)))?;

    Ok(inserted > 0)
}

pub fn insert_story(conn: &Connection, story: &Story) -> Result<()> {
    conn.execute(
        "INSERT INTO stories (uuid, title, synopsis, creator_uuid, category_name, created_at, is_nsfw)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            uuid_text(&story.uuid),
            story.title,
            story.synopsis,
            uuid_text(&story.creator_uuid),
            story.category_name,
            story.created_at.timestamp(),
            story.is_nsfw,
        ],
    )
    .map_err(|e| HenhouseError::Database(format!("Failed to insert story: {}", e)))?;

    Ok(())
}

/// Attach tags (by name) to a story. Already attached tags are skipped.
pub fn add_story_tags(conn: &Connection, story_uuid: &Uuid, tag_names: &[String]) -> Result<()> {
    let mut stmt = conn
        .prepare_cached("INSERT OR IGNORE INTO story_tags (story_uuid, tag_name) VALUES (?1, ?2)")
        .map_err(|e| HenhouseError::Database(format!("Failed to prepare statement: {}", e)))?;

    let story_uuid = uuid_text(story_uuid);
    for name in tag_names {
        stmt.execute(params![story_uuid, name])
            .map_err(|e| HenhouseError::Database(format!("Failed to tag story: {}", e)))?;
    }

    Ok(())
}

pub fn insert_chapter(conn: &Connection, chapter: &Chapter) -> Result<()> {
    conn.execute(
        "INSERT INTO chapters (uuid, story_uuid, name, synopsis, idx, markdown, created_at, published_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            uuid_text(&chapter.uuid),
            uuid_text(&chapter.story_uuid),
            chapter.name,
            chapter.synopsis,
            chapter.index,
            chapter.markdown,
            chapter.created_at.timestamp(),
            chapter.published_at.map(|t| t.timestamp()),
        ],
    )
    .map_err(|e| HenhouseError::Database(format!("Failed to insert chapter: {}", e)))?;

    Ok(())
}

pub fn insert_story_report(conn: &Connection, report: &Report) -> Result<()> {
    insert_report(conn, "story_reports", "story_uuid", report)
}

pub fn insert_chapter_report(conn: &Connection, report: &Report) -> Result<()> {
    insert_report(conn, "chapter_reports", "chapter_uuid", report)
}

fn insert_report(conn: &Connection, table: &str, target_column: &str, report: &Report) -> Result<()> {
    let sql = format!(
        "INSERT INTO {} (uuid, {}, submitter_uuid, kind, details) VALUES (?1, ?2, ?3, ?4, ?5)",
        table, target_column
    );

    conn.execute(
        &sql,
        params![
            uuid_text(&report.uuid),
            uuid_text(&report.target_uuid),
            uuid_text(&report.submitter_uuid),
            report.kind as i64,
            report.details,
        ],
    )
    .map_err(|e| HenhouseError::Database(format!("Failed to insert report: {}", e)))?;

    Ok(())
}
