//! Bulk loaders for categories and stories exported as JSON.

use std::collections::{BTreeSet, HashMap};

use rusqlite::Connection;
use serde::Deserialize;
use uuid::Uuid;

use super::ops;
use crate::art::models::{tag_name, Category, Chapter, Story, Tag, User};
use crate::query::Timestamp;
use crate::{HenhouseError, Result};

/// Synopses longer than this many characters are cut.
pub const MAX_SYNOPSIS_CHARS: usize = 256;

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    pub pretty_name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChapterInput {
    pub name: String,
    #[serde(default)]
    pub synopsis: String,
    pub markdown: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoryInput {
    pub title: String,
    #[serde(default)]
    pub synopsis: String,
    /// Author username; the default author when absent or unknown
    #[serde(default)]
    pub author: Option<String>,
    /// Category name; the default category when absent or unknown
    #[serde(default)]
    pub category: Option<String>,
    /// Tag pretty names
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub chapters: Vec<ChapterInput>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryLoadSummary {
    pub created: usize,
    pub updated: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoryLoadSummary {
    pub stories: usize,
    pub chapters: usize,
    pub tags_created: usize,
}

/// Upsert categories by name.
///
/// Existing categories keep their `sort_key` and only get `pretty_name` and
/// `description` updated; new ones are numbered after the current maximum.
pub fn load_categories(conn: &mut Connection, categories: &[CategoryInput]) -> Result<CategoryLoadSummary> {
    let tx = conn
        .transaction()
        .map_err(|e| HenhouseError::Database(format!("Failed to start transaction: {}", e)))?;

    let mut next_sort_key = ops::max_category_sort_key(&tx)?.map_or(0, |max| max + 1);
    let mut summary = CategoryLoadSummary::default();

    for input in categories {
        let category = Category {
            name: input.name.clone(),
            pretty_name: input.pretty_name.clone(),
            description: input.description.clone(),
            sort_key: next_sort_key,
        };

        if ops::update_category(&tx, &category)? {
            summary.updated += 1;
            continue;
        }

        ops::insert_category(&tx, &category)?;
        next_sort_key += 1;
        summary.created += 1;
    }

    tx.commit()
        .map_err(|e| HenhouseError::Database(format!("Failed to commit transaction: {}", e)))?;

    tracing::info!(
        "Loaded categories: {} created, {} updated",
        summary.created,
        summary.updated
    );
    Ok(summary)
}

/// Cut an over-long synopsis to 255 characters plus an ellipsis.
fn clamp_synopsis(synopsis: &str) -> String {
    let synopsis = synopsis.trim();
    if synopsis.chars().count() <= MAX_SYNOPSIS_CHARS {
        return synopsis.to_string();
    }

    let mut clamped: String = synopsis.chars().take(MAX_SYNOPSIS_CHARS - 1).collect();
    clamped.push('…');
    tracing::warn!("'{}' rewritten to '{}'", synopsis, clamped);
    clamped
}

/// Resolves author usernames and category names, caching lookups.
struct Resolver {
    default_author: User,
    default_category: Category,
    authors: HashMap<String, Uuid>,
    categories: HashMap<String, String>,
}

impl Resolver {
    fn author(&mut self, conn: &Connection, username: Option<&str>) -> Result<Uuid> {
        let Some(username) = username else {
            return Ok(self.default_author.uuid);
        };
        if let Some(uuid) = self.authors.get(username) {
            return Ok(*uuid);
        }

        let uuid = match ops::get_user_by_username(conn, username)? {
            Some(user) => user.uuid,
            None => {
                tracing::warn!(
                    "Unknown author '{}', using '{}'",
                    username,
                    self.default_author.username
                );
                self.default_author.uuid
            }
        };
        self.authors.insert(username.to_string(), uuid);
        Ok(uuid)
    }

    fn category(&mut self, conn: &Connection, name: Option<&str>) -> Result<String> {
        let Some(name) = name else {
            return Ok(self.default_category.name.clone());
        };
        if let Some(resolved) = self.categories.get(name) {
            return Ok(resolved.clone());
        }

        let resolved = match ops::get_category(conn, name)? {
            Some(category) => category.name,
            None => {
                tracing::warn!(
                    "Unknown category '{}', using '{}'",
                    name,
                    self.default_category.name
                );
                self.default_category.name.clone()
            }
        };
        self.categories.insert(name.to_string(), resolved.clone());
        Ok(resolved)
    }
}

/// Create stories with their chapters and tags.
///
/// # Arguments
/// * `conn` - Database connection
/// * `stories` - Parsed story export
/// * `default_author_username` - Author for stories without a known author
/// * `default_category` - Category for stories without a known category
/// * `now` - Creation and publication time of everything loaded
fn require_text(value: &str, story: usize, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(HenhouseError::Load(format!("story {}: empty {}", story, what)));
    }
    Ok(())
}

pub fn load_stories(
    conn: &mut Connection,
    stories: &[StoryInput],
    default_author_username: &str,
    default_category: &str,
    now: Timestamp,
) -> Result<StoryLoadSummary> {
    let tx = conn
        .transaction()
        .map_err(|e| HenhouseError::Database(format!("Failed to start transaction: {}", e)))?;

    let default_author = ops::get_user_by_username(&tx, default_author_username)?
        .ok_or_else(|| HenhouseError::Load("default author not found".to_string()))?;
    let default_category = ops::get_category(&tx, default_category)?
        .ok_or_else(|| HenhouseError::Load("default category not found".to_string()))?;

    for (i, input) in stories.iter().enumerate() {
        require_text(&input.title, i, "title")?;
        require_text(&input.synopsis, i, "synopsis")?;
        for chapter in &input.chapters {
            require_text(&chapter.name, i, "chapter name")?;
            require_text(&chapter.markdown, i, "chapter markdown")?;
        }
    }

    let mut resolver = Resolver {
        default_author,
        default_category,
        authors: HashMap::new(),
        categories: HashMap::new(),
    };
    let mut summary = StoryLoadSummary::default();

    let pretty_names: BTreeSet<&str> = stories
        .iter()
        .flat_map(|s| s.tags.iter().map(String::as_str))
        .collect();
    for pretty_name in pretty_names {
        if ops::ensure_tag(&tx, &Tag::from_pretty_name(pretty_name))? {
            summary.tags_created += 1;
        }
    }

    for input in stories {
        let story = Story {
            uuid: Uuid::new_v4(),
            title: input.title.clone(),
            synopsis: clamp_synopsis(&input.synopsis),
            creator_uuid: resolver.author(&tx, input.author.as_deref())?,
            category_name: Some(resolver.category(&tx, input.category.as_deref())?),
            created_at: now,
            is_nsfw: false,
        };
        ops::insert_story(&tx, &story)?;

        let tag_names: Vec<String> = input
            .tags
            .iter()
            .map(|t| tag_name(t))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        ops::add_story_tags(&tx, &story.uuid, &tag_names)?;

        for (index, chapter_input) in input.chapters.iter().enumerate() {
            let synopsis = if chapter_input.synopsis == story.synopsis {
                String::new()
            } else {
                clamp_synopsis(&chapter_input.synopsis)
            };

            let chapter = Chapter {
                uuid: Uuid::new_v4(),
                story_uuid: story.uuid,
                name: chapter_input.name.clone(),
                synopsis,
                index: index as i64,
                markdown: chapter_input.markdown.clone(),
                created_at: now,
                published_at: Some(now),
            };
            ops::insert_chapter(&tx, &chapter)?;
            summary.chapters += 1;
        }

        summary.stories += 1;
    }

    tx.commit()
        .map_err(|e| HenhouseError::Database(format!("Failed to commit transaction: {}", e)))?;

    tracing::info!(
        "Loaded {} stories with {} chapters ({} new tags)",
        summary.stories,
        summary.chapters,
        summary.tags_created
    );
    Ok(summary)
}
