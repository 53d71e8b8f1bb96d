//! Art module - the listable resources of the story store.
//!
//! Holds the row types and the search and sort registries of every
//! resource, and runs list requests against them.

pub mod models;
pub mod searches;
pub mod sorts;

use std::fmt;
use std::str::FromStr;

use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::db::{self, Listable};
use crate::query::sql::{build_count, build_select, SqlParam};
use crate::query::{
    ListParams, OrderTerm, Page, Predicate, QueryError, SearchRegistry, SortRegistry, Timestamp,
};
use crate::Result;
use models::{Category, Chapter, Story, Tag};

/// Per-request data handed to every search function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    /// Requesting user, if authenticated
    pub user: Option<Uuid>,
    /// Evaluation time for relative searches
    pub now: Timestamp,
}

impl RequestContext {
    pub fn anonymous(now: Timestamp) -> Self {
        Self { user: None, now }
    }
}

/// A listable resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Story,
    Chapter,
    Tag,
    Category,
}

impl Resource {
    pub const ALL: [Resource; 4] = [
        Resource::Story,
        Resource::Chapter,
        Resource::Tag,
        Resource::Category,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Story => "story",
            Resource::Chapter => "chapter",
            Resource::Tag => "tag",
            Resource::Category => "category",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = QueryError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Resource::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| QueryError::UnknownResource(s.to_string()))
    }
}

/// Rows of one resource type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Rows {
    Stories(Vec<Story>),
    Chapters(Vec<Chapter>),
    Tags(Vec<Tag>),
    Categories(Vec<Category>),
}

impl Rows {
    pub fn len(&self) -> usize {
        match self {
            Rows::Stories(rows) => rows.len(),
            Rows::Chapters(rows) => rows.len(),
            Rows::Tags(rows) => rows.len(),
            Rows::Categories(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One page of a list request plus the unpaginated match count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    pub total: i64,
    pub rows: Rows,
}

/// Compiled form of a list request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledList {
    pub predicates: Vec<Predicate>,
    pub ordering: Vec<OrderTerm>,
}

/// SQL a list request runs, with parameters in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Explained {
    pub select_sql: String,
    pub select_params: Vec<SqlParam>,
    pub count_sql: String,
    pub count_params: Vec<SqlParam>,
}

/// Search and sort registries of every resource, built once at startup.
#[derive(Debug)]
pub struct ArtRegistries {
    story_search: SearchRegistry<RequestContext>,
    chapter_search: SearchRegistry<RequestContext>,
    tag_search: SearchRegistry<RequestContext>,
    category_search: SearchRegistry<RequestContext>,
    story_sort: SortRegistry,
    chapter_sort: SortRegistry,
    tag_sort: SortRegistry,
    category_sort: SortRegistry,
}

impl ArtRegistries {
    pub fn new() -> Result<Self> {
        Ok(Self {
            story_search: searches::story_searches()?,
            chapter_search: searches::chapter_searches()?,
            tag_search: searches::tag_searches()?,
            category_search: searches::category_searches()?,
            story_sort: sorts::story_sorts()?,
            chapter_sort: sorts::chapter_sorts()?,
            tag_sort: sorts::tag_sorts()?,
            category_sort: sorts::category_sorts()?,
        })
    }

    pub fn search(&self, resource: Resource) -> &SearchRegistry<RequestContext> {
        match resource {
            Resource::Story => &self.story_search,
            Resource::Chapter => &self.chapter_search,
            Resource::Tag => &self.tag_search,
            Resource::Category => &self.category_search,
        }
    }

    pub fn sort(&self, resource: Resource) -> &SortRegistry {
        match resource {
            Resource::Story => &self.story_sort,
            Resource::Chapter => &self.chapter_sort,
            Resource::Tag => &self.tag_sort,
            Resource::Category => &self.category_sort,
        }
    }

    /// Parse the search and sort of `params` for `resource`.
    pub fn compile(
        &self,
        resource: Resource,
        params: &ListParams,
        ctx: &RequestContext,
    ) -> std::result::Result<CompiledList, QueryError> {
        Ok(CompiledList {
            predicates: params.get_filter_args(self.search(resource), ctx)?,
            ordering: params.get_order_by_args(self.sort(resource))?,
        })
    }

    /// Compile a list request down to SQL without running it.
    pub fn explain(
        &self,
        resource: Resource,
        params: &ListParams,
        ctx: &RequestContext,
        page: Page,
    ) -> std::result::Result<Explained, QueryError> {
        let compiled = self.compile(resource, params, ctx)?;

        Ok(match resource {
            Resource::Story => explain::<Story>(&compiled, page),
            Resource::Chapter => explain::<Chapter>(&compiled, page),
            Resource::Tag => explain::<Tag>(&compiled, page),
            Resource::Category => explain::<Category>(&compiled, page),
        })
    }

    /// Run a list request for `resource`.
    pub fn list(
        &self,
        conn: &Connection,
        resource: Resource,
        params: &ListParams,
        ctx: &RequestContext,
        page: Page,
    ) -> Result<Listing> {
        let compiled = self.compile(resource, params, ctx)?;

        match resource {
            Resource::Story => fetch(conn, &compiled, page, Rows::Stories),
            Resource::Chapter => fetch(conn, &compiled, page, Rows::Chapters),
            Resource::Tag => fetch(conn, &compiled, page, Rows::Tags),
            Resource::Category => fetch(conn, &compiled, page, Rows::Categories),
        }
    }
}

fn explain<T: Listable>(compiled: &CompiledList, page: Page) -> Explained {
    let (select_sql, select_params) = build_select(
        T::TABLE,
        T::COLUMNS,
        &compiled.predicates,
        &compiled.ordering,
        page,
    );
    let (count_sql, count_params) = build_count(T::TABLE, &compiled.predicates);
    Explained {
        select_sql,
        select_params,
        count_sql,
        count_params,
    }
}

fn fetch<T: Listable>(
    conn: &Connection,
    compiled: &CompiledList,
    page: Page,
    wrap: fn(Vec<T>) -> Rows,
) -> Result<Listing> {
    let rows = db::list::<T>(conn, &compiled.predicates, &compiled.ordering, page)?;
    let total = db::count::<T>(conn, &compiled.predicates)?;
    Ok(Listing {
        total,
        rows: wrap(rows),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::art::models::User;

    fn ctx() -> RequestContext {
        RequestContext::anonymous(Timestamp::from_timestamp(0, 0).unwrap())
    }

    #[test]
    fn test_resource_from_str() {
        assert_eq!("story".parse::<Resource>().unwrap(), Resource::Story);
        assert_eq!("category".parse::<Resource>().unwrap(), Resource::Category);

        let err = "stories".parse::<Resource>().unwrap_err();
        assert_eq!(err, QueryError::UnknownResource("stories".to_string()));
        assert_eq!(err.status_code(), 422);
    }

    #[test]
    fn test_resource_names_round_trip() {
        for resource in Resource::ALL {
            assert_eq!(resource.to_string().parse::<Resource>().unwrap(), resource);
        }
    }

    #[test]
    fn test_compile_unknown_field() {
        let registries = ArtRegistries::new().unwrap();
        let params = ListParams {
            search: Some("bogusfield:1".to_string()),
            ..Default::default()
        };

        let err = registries.compile(Resource::Story, &params, &ctx()).unwrap_err();
        assert!(matches!(err, QueryError::UnknownSearchField { .. }));
    }

    #[test]
    fn test_explain_story_search() {
        let registries = ArtRegistries::new().unwrap();
        let params = ListParams {
            search: Some("title:dragon isPublished:true".to_string()),
            sort: Some("title:DESC".to_string()),
            ..Default::default()
        };

        let explained = registries
            .explain(Resource::Story, &params, &ctx(), Page { limit: 5, offset: 10 })
            .unwrap();

        assert!(explained.select_sql.starts_with("SELECT stories.uuid, stories.title"));
        assert!(explained.select_sql.contains("stories.title LIKE ? ESCAPE"));
        assert!(explained
            .select_sql
            .contains("stories.uuid IN (SELECT chapters.story_uuid FROM chapters WHERE NOT (chapters.published_at IS NULL))"));
        assert!(explained
            .select_sql
            .ends_with("ORDER BY stories.title COLLATE NOCASE DESC, stories.uuid ASC LIMIT ? OFFSET ?"));
        assert_eq!(
            explained.select_params,
            vec![
                SqlParam::Text("%dragon%".to_string()),
                SqlParam::Integer(5),
                SqlParam::Integer(10),
            ]
        );
        assert_eq!(explained.count_params.len(), 1);
    }

    #[test]
    fn test_list_counts_beyond_page() {
        let db = db::open_in_memory().unwrap();
        for pretty in ["One", "Two", "Three"] {
            db::ensure_tag(db.conn(), &Tag::from_pretty_name(pretty)).unwrap();
        }
        let registries = ArtRegistries::new().unwrap();

        let listing = registries
            .list(
                db.conn(),
                Resource::Tag,
                &ListParams::default(),
                &ctx(),
                Page { limit: 2, offset: 0 },
            )
            .unwrap();

        assert_eq!(listing.total, 3);
        assert_eq!(listing.rows.len(), 2);
        let Rows::Tags(tags) = &listing.rows else {
            panic!("expected tags");
        };
        assert_eq!(tags[0].name, "one");
        assert_eq!(tags[1].name, "three");
    }

    #[test]
    fn test_listing_serializes_rows_untagged() {
        let db = db::open_in_memory().unwrap();
        db::insert_user(
            db.conn(),
            &User::new("writer", "writer@example.com", ctx().now),
        )
        .unwrap();
        db::ensure_tag(db.conn(), &Tag::from_pretty_name("Disney")).unwrap();

        let registries = ArtRegistries::new().unwrap();
        let listing = registries
            .list(
                db.conn(),
                Resource::Tag,
                &ListParams::default(),
                &ctx(),
                Page { limit: 10, offset: 0 },
            )
            .unwrap();

        let json = serde_json::to_value(&listing).unwrap();
        assert_eq!(json["total"], 1);
        assert_eq!(json["rows"][0]["name"], "disney");
    }
}
