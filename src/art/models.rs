//! Rows of the story store.

use rusqlite::types::Type;
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::Listable;
use crate::query::Timestamp;

/// Read a hyphenated UUID stored as text.
pub(crate) fn uuid_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::try_parse(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Read Unix seconds as a UTC timestamp.
pub(crate) fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Timestamp> {
    let secs: i64 = row.get(idx)?;
    Timestamp::from_timestamp(secs, 0).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, secs))
}

fn optional_timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Timestamp>> {
    let secs: Option<i64> = row.get(idx)?;
    secs.map(|secs| {
        Timestamp::from_timestamp(secs, 0).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, secs))
    })
    .transpose()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub uuid: Uuid,
    pub username: String,
    pub email: String,
    pub is_staff: bool,
    pub is_active: bool,
    pub created_at: Timestamp,
    /// Free-form profile attributes
    pub attributes: serde_json::Value,
}

impl User {
    pub fn new(username: impl Into<String>, email: impl Into<String>, now: Timestamp) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            username: username.into(),
            email: email.into(),
            is_staff: false,
            is_active: true,
            created_at: now,
            attributes: serde_json::Value::Object(serde_json::Map::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub pretty_name: String,
    pub description: String,
    /// Position in category listings
    pub sort_key: i64,
}

impl Listable for Category {
    const TABLE: &'static str = "categories";
    const COLUMNS: &'static [&'static str] = &[
        "categories.name",
        "categories.pretty_name",
        "categories.description",
        "categories.sort_key",
    ];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get(0)?,
            pretty_name: row.get(1)?,
            description: row.get(2)?,
            sort_key: row.get(3)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub pretty_name: String,
}

impl Tag {
    /// Tag keyed by the slug of `pretty_name`.
    pub fn from_pretty_name(pretty_name: &str) -> Self {
        Self {
            name: tag_name(pretty_name),
            pretty_name: pretty_name.to_string(),
        }
    }
}

/// Lowercase, spaces to `_`, slashes to `-`.
pub fn tag_name(pretty_name: &str) -> String {
    pretty_name.to_lowercase().replace(' ', "_").replace('/', "-")
}

impl Listable for Tag {
    const TABLE: &'static str = "tags";
    const COLUMNS: &'static [&'static str] = &["tags.name", "tags.pretty_name"];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get(0)?,
            pretty_name: row.get(1)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub uuid: Uuid,
    pub title: String,
    pub synopsis: String,
    pub creator_uuid: Uuid,
    pub category_name: Option<String>,
    pub created_at: Timestamp,
    pub is_nsfw: bool,
}

impl Listable for Story {
    const TABLE: &'static str = "stories";
    const COLUMNS: &'static [&'static str] = &[
        "stories.uuid",
        "stories.title",
        "stories.synopsis",
        "stories.creator_uuid",
        "stories.category_name",
        "stories.created_at",
        "stories.is_nsfw",
    ];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            uuid: uuid_column(row, 0)?,
            title: row.get(1)?,
            synopsis: row.get(2)?,
            creator_uuid: uuid_column(row, 3)?,
            category_name: row.get(4)?,
            created_at: timestamp_column(row, 5)?,
            is_nsfw: row.get(6)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub uuid: Uuid,
    pub story_uuid: Uuid,
    pub name: String,
    pub synopsis: String,
    /// Zero-based position within the story
    pub index: i64,
    pub markdown: String,
    pub created_at: Timestamp,
    /// `None` while unpublished
    pub published_at: Option<Timestamp>,
}

impl Listable for Chapter {
    const TABLE: &'static str = "chapters";
    const COLUMNS: &'static [&'static str] = &[
        "chapters.uuid",
        "chapters.story_uuid",
        "chapters.name",
        "chapters.synopsis",
        "chapters.idx",
        "chapters.markdown",
        "chapters.created_at",
        "chapters.published_at",
    ];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            uuid: uuid_column(row, 0)?,
            story_uuid: uuid_column(row, 1)?,
            name: row.get(2)?,
            synopsis: row.get(3)?,
            index: row.get(4)?,
            markdown: row.get(5)?,
            created_at: timestamp_column(row, 6)?,
            published_at: optional_timestamp_column(row, 7)?,
        })
    }
}

/// Reason a story or chapter was reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Other = 0,
    Dmca = 1,
    Abuse = 2,
}

/// A report against a story or chapter; `target_uuid` names which.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub uuid: Uuid,
    pub target_uuid: Uuid,
    pub submitter_uuid: Uuid,
    pub kind: ReportKind,
    pub details: String,
}
