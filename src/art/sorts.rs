//! Sort fields of the art resources.

use crate::query::expr::{nocase_sort, related_sort, standard_sort};
use crate::query::{DefaultDescriptor, Direction, RegistryError, SortConfig, SortRegistry};

fn plain(column: &'static str) -> SortConfig {
    SortConfig::new(vec![standard_sort(column)], None)
}

fn nocase(column: &'static str) -> SortConfig {
    SortConfig::new(vec![nocase_sort(column)], None)
}

fn default_asc(column: &'static str, priority: i32) -> SortConfig {
    SortConfig::new(
        vec![standard_sort(column)],
        Some(DefaultDescriptor::new(priority, Direction::Asc)),
    )
}

pub fn story_sorts() -> Result<SortRegistry, RegistryError> {
    let mut registry = SortRegistry::new("story");
    registry
        .register("uuid", default_asc("stories.uuid", 0))?
        .register("title", nocase("stories.title"))?
        .register("createdAt", plain("stories.created_at"))?
        .register(
            "authorName",
            SortConfig::new(
                vec![related_sort("users", "username", "uuid", "stories.creator_uuid")],
                None,
            ),
        )?
        .register(
            "category",
            SortConfig::new(
                vec![
                    related_sort("categories", "sort_key", "name", "stories.category_name"),
                    standard_sort("stories.category_name"),
                ],
                None,
            ),
        )?;
    Ok(registry)
}

/// Index is only unique within a story, so uuid follows it.
pub fn chapter_sorts() -> Result<SortRegistry, RegistryError> {
    let mut registry = SortRegistry::new("chapter");
    registry
        .register("index", default_asc("chapters.idx", 0))?
        .register("uuid", default_asc("chapters.uuid", 1))?
        .register("story", plain("chapters.story_uuid"))?
        .register("name", nocase("chapters.name"))?
        .register("createdAt", plain("chapters.created_at"))?
        .register("publishedAt", plain("chapters.published_at"))?;
    Ok(registry)
}

pub fn tag_sorts() -> Result<SortRegistry, RegistryError> {
    let mut registry = SortRegistry::new("tag");
    registry
        .register("name", default_asc("tags.name", 0))?
        .register("prettyName", nocase("tags.pretty_name"))?;
    Ok(registry)
}

pub fn category_sorts() -> Result<SortRegistry, RegistryError> {
    let mut registry = SortRegistry::new("category");
    registry
        .register("sortKey", default_asc("categories.sort_key", 0))?
        .register("name", default_asc("categories.name", 1))?
        .register("prettyName", nocase("categories.pretty_name"))?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::art::models::{Category, Story, Tag, User};
    use crate::art::{ArtRegistries, Resource, Rows};
    use crate::db;
    use crate::query::{get_order_by_args, ListParams, Page, Timestamp};
    use uuid::Uuid;

    fn at(secs: i64) -> Timestamp {
        Timestamp::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn test_every_registry_has_a_default() {
        let registries = ArtRegistries::new().unwrap();
        for resource in Resource::ALL {
            let ordering = get_order_by_args(registries.sort(resource), None, true).unwrap();
            assert!(!ordering.is_empty(), "{resource} has no default sort");
        }
    }

    #[test]
    fn test_registry_fields() {
        let expected: [(Resource, &[&str]); 4] = [
            (
                Resource::Story,
                &["uuid", "title", "createdAt", "authorName", "category"],
            ),
            (
                Resource::Chapter,
                &["index", "uuid", "story", "name", "createdAt", "publishedAt"],
            ),
            (Resource::Tag, &["name", "prettyName"]),
            (Resource::Category, &["sortKey", "name", "prettyName"]),
        ];

        let registries = ArtRegistries::new().unwrap();
        for (resource, fields) in expected {
            let registry = registries.sort(resource);
            assert_eq!(registry.len(), fields.len(), "{resource}");
            for field in fields {
                assert!(registry.get(field).is_some(), "{resource} is missing {field}");
            }
        }
    }

    #[test]
    fn test_chapter_default_order() {
        let registry = chapter_sorts().unwrap();
        let ordering = get_order_by_args(&registry, None, true).unwrap();
        assert_eq!(ordering.len(), 2);
        assert_eq!(ordering[0].expr, standard_sort("chapters.idx"));
        assert_eq!(ordering[1].expr, standard_sort("chapters.uuid"));
    }

    #[test]
    fn test_all_sorts_run() {
        let db = db::open_in_memory().unwrap();
        let registries = ArtRegistries::new().unwrap();
        let ctx = crate::art::RequestContext {
            user: None,
            now: at(0),
        };

        for resource in Resource::ALL {
            let fields: Vec<&str> = registries.sort(resource).fields().collect();
            for field in fields {
                for dir in ["ASC", "DESC"] {
                    let params = ListParams {
                        sort: Some(format!("{field}:{dir}")),
                        ..Default::default()
                    };
                    let result = registries.list(
                        db.conn(),
                        resource,
                        &params,
                        &ctx,
                        Page { limit: 10, offset: 0 },
                    );
                    assert!(result.is_ok(), "{resource} {field}:{dir} failed: {result:?}");
                }
            }
        }
    }

    #[test]
    fn test_story_sort_by_category_then_uuid() {
        let db = db::open_in_memory().unwrap();
        let conn = db.conn();
        let registries = ArtRegistries::new().unwrap();

        let user = User::new("writer", "writer@example.com", at(0));
        db::insert_user(conn, &user).unwrap();
        for (name, sort_key) in [("zeta", 0), ("alpha", 1)] {
            db::insert_category(
                conn,
                &Category {
                    name: name.to_string(),
                    pretty_name: name.to_uppercase(),
                    description: String::new(),
                    sort_key,
                },
            )
            .unwrap();
        }
        for (title, category) in [("A", "alpha"), ("Z", "zeta"), ("Y", "zeta")] {
            db::insert_story(
                conn,
                &Story {
                    uuid: Uuid::new_v4(),
                    title: title.to_string(),
                    synopsis: String::new(),
                    creator_uuid: user.uuid,
                    category_name: Some(category.to_string()),
                    created_at: at(0),
                    is_nsfw: false,
                },
            )
            .unwrap();
        }

        let params = ListParams {
            sort: Some("category".to_string()),
            ..Default::default()
        };
        let ctx = crate::art::RequestContext {
            user: None,
            now: at(0),
        };
        let listing = registries
            .list(conn, Resource::Story, &params, &ctx, Page { limit: 10, offset: 0 })
            .unwrap();

        let Rows::Stories(stories) = listing.rows else {
            panic!("expected stories");
        };
        let categories: Vec<_> = stories
            .iter()
            .map(|s| s.category_name.as_deref().unwrap())
            .collect();
        assert_eq!(categories, vec!["zeta", "zeta", "alpha"]);
        assert!(stories[0].uuid < stories[1].uuid);
    }

    #[test]
    fn test_tag_sort_pretty_name_desc() {
        let db = db::open_in_memory().unwrap();
        let registries = ArtRegistries::new().unwrap();
        for pretty in ["Apple", "banana", "Cherry"] {
            db::ensure_tag(db.conn(), &Tag::from_pretty_name(pretty)).unwrap();
        }

        let params = ListParams {
            sort: Some("prettyName:DESC".to_string()),
            ..Default::default()
        };
        let ctx = crate::art::RequestContext {
            user: None,
            now: at(0),
        };
        let listing = registries
            .list(db.conn(), Resource::Tag, &params, &ctx, Page { limit: 10, offset: 0 })
            .unwrap();

        let Rows::Tags(tags) = listing.rows else {
            panic!("expected tags");
        };
        let names: Vec<_> = tags.iter().map(|t| t.pretty_name.as_str()).collect();
        assert_eq!(names, vec!["Cherry", "banana", "Apple"]);
    }
}
