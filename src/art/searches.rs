//! Search fields of the art resources.

use crate::query::convert::{
    Bool, ConvertTo, DateTime, DateTimeDeltaRange, DateTimeRange, StrList, UuidList,
};
use crate::query::{ConversionError, Predicate, RegistryError, SearchRegistry, Subquery, TimeRange};

use super::RequestContext;

type SearchResult = Result<Predicate, ConversionError>;

/// Stories having a chapter that matches all of `filter`.
fn story_has_chapter(filter: Vec<Predicate>) -> Predicate {
    Predicate::in_subquery(
        "stories.uuid",
        Subquery::new("chapters.story_uuid", "chapters", filter),
    )
}

fn story_published_within(range: TimeRange) -> Predicate {
    story_has_chapter(vec![Predicate::within("chapters.published_at", range)])
}

fn story_uuid(_: &RequestContext, raw: &str) -> SearchResult {
    Ok(Predicate::is_in("stories.uuid", UuidList::convertto(raw)?))
}

fn story_title(_: &RequestContext, raw: &str) -> SearchResult {
    Ok(Predicate::contains("stories.title", raw))
}

fn story_title_exact(_: &RequestContext, raw: &str) -> SearchResult {
    Ok(Predicate::iexact("stories.title", raw))
}

/// Text of any published chapter.
fn story_text(_: &RequestContext, raw: &str) -> SearchResult {
    Ok(story_has_chapter(vec![
        Predicate::is_not_null("chapters.published_at"),
        Predicate::contains("chapters.markdown", raw),
    ]))
}

fn story_synopsis(_: &RequestContext, raw: &str) -> SearchResult {
    Ok(Predicate::contains("stories.synopsis", raw))
}

fn story_author(_: &RequestContext, raw: &str) -> SearchResult {
    Ok(Predicate::is_in("stories.creator_uuid", UuidList::convertto(raw)?))
}

fn story_category(_: &RequestContext, raw: &str) -> SearchResult {
    Ok(Predicate::is_in("stories.category_name", StrList::convertto(raw)?))
}

fn story_created_at(_: &RequestContext, raw: &str) -> SearchResult {
    Ok(Predicate::within("stories.created_at", DateTimeRange::convertto(raw)?))
}

fn story_created_at_exact(_: &RequestContext, raw: &str) -> SearchResult {
    Ok(Predicate::eq("stories.created_at", DateTime::convertto(raw)?))
}

fn story_created_at_delta(ctx: &RequestContext, raw: &str) -> SearchResult {
    Ok(Predicate::within(
        "stories.created_at",
        DateTimeDeltaRange::convertto_at(raw, ctx.now)?,
    ))
}

fn story_published_at(_: &RequestContext, raw: &str) -> SearchResult {
    Ok(story_published_within(DateTimeRange::convertto(raw)?))
}

fn story_published_at_exact(_: &RequestContext, raw: &str) -> SearchResult {
    Ok(story_has_chapter(vec![Predicate::eq(
        "chapters.published_at",
        DateTime::convertto(raw)?,
    )]))
}

fn story_published_at_delta(ctx: &RequestContext, raw: &str) -> SearchResult {
    Ok(story_published_within(DateTimeDeltaRange::convertto_at(raw, ctx.now)?))
}

/// Published means at least one chapter is published.
fn story_is_published(_: &RequestContext, raw: &str) -> SearchResult {
    let published = story_has_chapter(vec![Predicate::is_not_null("chapters.published_at")]);
    if Bool::convertto(raw)? {
        Ok(published)
    } else {
        Ok(published.negate())
    }
}

/// Any of the given tag names.
fn story_tags(_: &RequestContext, raw: &str) -> SearchResult {
    Ok(Predicate::in_subquery(
        "stories.uuid",
        Subquery::new(
            "story_tags.story_uuid",
            "story_tags",
            vec![Predicate::is_in("story_tags.tag_name", StrList::convertto(raw)?)],
        ),
    ))
}

fn story_author_name(_: &RequestContext, raw: &str) -> SearchResult {
    Ok(Predicate::in_subquery(
        "stories.creator_uuid",
        Subquery::new(
            "users.uuid",
            "users",
            vec![Predicate::contains("users.username", raw)],
        ),
    ))
}

pub fn story_searches() -> Result<SearchRegistry<RequestContext>, RegistryError> {
    let mut registry: SearchRegistry<RequestContext> = SearchRegistry::new("story");
    registry
        .register("uuid", story_uuid)?
        .register("title", story_title)?
        .register("title_exact", story_title_exact)?
        .register("storyText", story_text)?
        .register("synopsis", story_synopsis)?
        .register("author", story_author)?
        .register("category", story_category)?
        .register("createdAt", story_created_at)?
        .register("createdAt_exact", story_created_at_exact)?
        .register("createdAt_delta", story_created_at_delta)?
        .register("publishedAt", story_published_at)?
        .register("publishedAt_exact", story_published_at_exact)?
        .register("publishedAt_delta", story_published_at_delta)?
        .register("isPublished", story_is_published)?
        .register("tags", story_tags)?
        .register("authorName", story_author_name)?;
    Ok(registry)
}

fn chapter_uuid(_: &RequestContext, raw: &str) -> SearchResult {
    Ok(Predicate::is_in("chapters.uuid", UuidList::convertto(raw)?))
}

fn chapter_story(_: &RequestContext, raw: &str) -> SearchResult {
    Ok(Predicate::is_in("chapters.story_uuid", UuidList::convertto(raw)?))
}

fn chapter_name(_: &RequestContext, raw: &str) -> SearchResult {
    Ok(Predicate::contains("chapters.name", raw))
}

fn chapter_name_exact(_: &RequestContext, raw: &str) -> SearchResult {
    Ok(Predicate::iexact("chapters.name", raw))
}

fn chapter_text(_: &RequestContext, raw: &str) -> SearchResult {
    Ok(Predicate::contains("chapters.markdown", raw))
}

fn chapter_synopsis(_: &RequestContext, raw: &str) -> SearchResult {
    Ok(Predicate::contains("chapters.synopsis", raw))
}

fn chapter_created_at(_: &RequestContext, raw: &str) -> SearchResult {
    Ok(Predicate::within("chapters.created_at", DateTimeRange::convertto(raw)?))
}

fn chapter_created_at_exact(_: &RequestContext, raw: &str) -> SearchResult {
    Ok(Predicate::eq("chapters.created_at", DateTime::convertto(raw)?))
}

fn chapter_created_at_delta(ctx: &RequestContext, raw: &str) -> SearchResult {
    Ok(Predicate::within(
        "chapters.created_at",
        DateTimeDeltaRange::convertto_at(raw, ctx.now)?,
    ))
}

fn chapter_published_at(_: &RequestContext, raw: &str) -> SearchResult {
    Ok(Predicate::within("chapters.published_at", DateTimeRange::convertto(raw)?))
}

fn chapter_published_at_exact(_: &RequestContext, raw: &str) -> SearchResult {
    Ok(Predicate::eq("chapters.published_at", DateTime::convertto(raw)?))
}

fn chapter_published_at_delta(ctx: &RequestContext, raw: &str) -> SearchResult {
    Ok(Predicate::within(
        "chapters.published_at",
        DateTimeDeltaRange::convertto_at(raw, ctx.now)?,
    ))
}

fn chapter_is_published(_: &RequestContext, raw: &str) -> SearchResult {
    if Bool::convertto(raw)? {
        Ok(Predicate::is_not_null("chapters.published_at"))
    } else {
        Ok(Predicate::is_null("chapters.published_at"))
    }
}

pub fn chapter_searches() -> Result<SearchRegistry<RequestContext>, RegistryError> {
    let mut registry: SearchRegistry<RequestContext> = SearchRegistry::new("chapter");
    registry
        .register("uuid", chapter_uuid)?
        .register("story", chapter_story)?
        .register("name", chapter_name)?
        .register("name_exact", chapter_name_exact)?
        .register("text", chapter_text)?
        .register("synopsis", chapter_synopsis)?
        .register("createdAt", chapter_created_at)?
        .register("createdAt_exact", chapter_created_at_exact)?
        .register("createdAt_delta", chapter_created_at_delta)?
        .register("publishedAt", chapter_published_at)?
        .register("publishedAt_exact", chapter_published_at_exact)?
        .register("publishedAt_delta", chapter_published_at_delta)?
        .register("isPublished", chapter_is_published)?;
    Ok(registry)
}

/// `name` and `prettyName`, each as substring and exact match.
fn named_searches(
    resource: &'static str,
    name: &'static str,
    pretty_name: &'static str,
) -> Result<SearchRegistry<RequestContext>, RegistryError> {
    let mut registry: SearchRegistry<RequestContext> = SearchRegistry::new(resource);
    registry
        .register("name", move |_, raw| Ok(Predicate::contains(name, raw)))?
        .register("name_exact", move |_, raw| Ok(Predicate::iexact(name, raw)))?
        .register("prettyName", move |_, raw| {
            Ok(Predicate::contains(pretty_name, raw))
        })?
        .register("prettyName_exact", move |_, raw| {
            Ok(Predicate::iexact(pretty_name, raw))
        })?;
    Ok(registry)
}

pub fn category_searches() -> Result<SearchRegistry<RequestContext>, RegistryError> {
    named_searches("category", "categories.name", "categories.pretty_name")
}

pub fn tag_searches() -> Result<SearchRegistry<RequestContext>, RegistryError> {
    named_searches("tag", "tags.name", "tags.pretty_name")
}
